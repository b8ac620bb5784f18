//! OpenAPI documentation, served at `/openapi.json` with a Scalar UI at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "upload-relay",
        description = "Relays multipart file uploads to the Shopify Admin files API."
    ),
    paths(
        api::handlers::uploads::upload_to_shopify,
        api::handlers::health::healthz,
    ),
    components(schemas(api::models::uploads::UploadResponse, crate::shopify::UploadedUrl)),
    tags(
        (name = "uploads", description = "File relay to Shopify"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

use crate::AppState;
use crate::api::models::uploads::UploadResponse;
use crate::errors::{Error, Result};
use crate::form::FormFiles;
use crate::relay::relay_files;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::{debug, info, instrument};

#[utoipa::path(
    post,
    path = "/api/upload-to-shopify",
    tag = "uploads",
    summary = "Relay files to Shopify",
    description = "Uploads every file part of the form to the Shopify files API, one after another, \
                   and returns the public URLs in form order. The first Shopify failure aborts the \
                   whole request.",
    request_body(content_type = "multipart/form-data", description = "One or more fields holding one or more files"),
    responses(
        (status = 200, description = "All files uploaded", body = UploadResponse),
        (status = 405, description = "Only POST allowed"),
        (status = 500, description = "Form parse error, missing Shopify configuration, or upload failure"),
        (status = 502, description = "Shopify rejected a file; details carry Shopify's response")
    )
)]
#[instrument(skip_all)]
pub async fn upload_to_shopify(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    // Checked before the body is touched so that nothing is read or sent without credentials
    let store = state.file_store.as_deref().ok_or(Error::MissingCredentials)?;

    let mut multipart = multipart.map_err(|e| Error::FormParse { message: e.to_string() })?;
    let form = FormFiles::read(&mut multipart).await?;

    info!(files = form.len(), "Upload form parsed");
    if form.is_empty() {
        debug!("Form carried no files, nothing to relay");
    }

    let entries = form.into_entries();

    let urls = relay_files(store, &entries, state.config.upload.concurrency).await?;

    Ok(Json(UploadResponse::new(urls)))
}

/// Fallback for every method the upload route does not serve.
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

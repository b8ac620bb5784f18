//! # upload-relay: multipart uploads to Shopify Files
//!
//! `upload-relay` is a small HTTP service for storefront front-ends that need to put
//! user-provided files (images, attachments) on the Shopify CDN without holding an Admin API
//! token in the browser. The browser posts a `multipart/form-data` form; the service
//! base64-encodes each file, creates it through the Admin REST `files.json` endpoint, and
//! answers with the public URLs.
//!
//! ## Request Flow
//!
//! 1. `OPTIONS` preflights are answered by the CORS layer (when enabled)
//! 2. Any method other than `POST` is rejected with 405
//! 3. Missing Shopify credentials are reported before the body is read
//! 4. The whole form is buffered ([`form`]); a malformed body aborts with no remote calls
//! 5. Files are relayed in form order ([`relay`]) through a [`shopify::FileStore`]; the
//!    first rejection aborts the request with 502 and no URLs
//! 6. `{ "success": true, "urls": [...] }`
//!
//! Every failure is turned into a JSON body by [`errors::Error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use upload_relay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = upload_relay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     upload_relay::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod form;
pub mod openapi;
pub mod relay;
pub mod shopify;
pub mod telemetry;

#[cfg(test)]
mod test;

use crate::{
    api::handlers::{health::healthz, uploads},
    config::CorsOrigin,
    openapi::ApiDoc,
    shopify::{FileStore, ShopifyFiles},
};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Path of the upload relay endpoint
pub const UPLOAD_PATH: &str = "/api/upload-to-shopify";

/// Application state shared across all request handlers.
///
/// `file_store` is `None` when the Shopify credentials are not configured; the upload
/// handler then answers with a configuration error instead of attempting any call.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub file_store: Option<Arc<dyn FileStore>>,
}

/// Install the process-wide rustls crypto provider. `reqwest` is built without one, so this
/// must run before the first client is constructed. Safe to call repeatedly.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: the upload route, health, API docs, CORS and tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_route = post(uploads::upload_to_shopify)
        .fallback(uploads::method_not_allowed)
        .layer(DefaultBodyLimit::max(state.config.upload.max_body_size));

    let cors = if state.config.cors.enabled {
        Some(create_cors_layer(&state.config)?)
    } else {
        None
    };

    let mut router: Router = Router::new()
        .route(UPLOAD_PATH, upload_route)
        .route("/healthz", get(healthz))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP server.
///
/// 1. **Create**: [`Application::new`] builds the Shopify client and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting upload relay with configuration: {:#?}", config);

        let file_store: Option<Arc<dyn FileStore>> = match config.shopify.credentials() {
            Some(credentials) => Some(Arc::new(ShopifyFiles::new(credentials, &config.shopify)?) as Arc<dyn FileStore>),
            None => {
                warn!("SHOPIFY_STORE or SHOPIFY_ACCESS_TOKEN is not set; uploads will be rejected");
                None
            }
        };

        let state = AppState::builder()
            .config(config.clone())
            .maybe_file_store(file_store)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Upload relay listening on http://{}, uploads at http://localhost:{}{}",
            bind_addr, self.config.port, UPLOAD_PATH
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response data structures
//!
//! # Routes
//!
//! - `POST /api/upload-to-shopify`: relay a multipart upload to Shopify
//! - `GET /healthz`: liveness
//! - `GET /openapi.json`, `/docs`: API documentation

pub mod handlers;
pub mod models;

//! Shopify Admin API integration.
//!
//! Only the REST `files.json` creation endpoint is used. The [`FileStore`] trait is the seam
//! between the relay and the remote API; [`ShopifyFiles`] is the `reqwest` implementation.

mod files;

pub use files::ShopifyFiles;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /admin/api/{version}/files.json`.
#[derive(Debug, Serialize)]
pub struct CreateFileRequest<'a> {
    pub file: CreateFileAttachment<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateFileAttachment<'a> {
    /// Base64 (standard alphabet, padded) file content
    pub attachment: String,
    pub filename: &'a str,
}

/// The part of the `files.json` success body we read.
#[derive(Debug, Deserialize)]
struct CreateFileResponse {
    file: Option<RemoteFileResource>,
}

#[derive(Debug, Deserialize)]
struct RemoteFileResource {
    public_url: Option<String>,
}

/// What a successful upload yields for one file: the public URL string, or Shopify's whole
/// response object when it carried none.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum UploadedUrl {
    /// `file.public_url` from the response
    Url(String),
    /// The whole response body, when it carried no `file.public_url`
    Raw(serde_json::Value),
}

impl UploadedUrl {
    /// Picks `file.public_url` out of a success body, falling back to the body itself.
    pub fn from_response_body(body: serde_json::Value) -> Self {
        match serde_json::from_value::<CreateFileResponse>(body.clone()) {
            Ok(CreateFileResponse {
                file: Some(RemoteFileResource { public_url: Some(url) }),
            }) => UploadedUrl::Url(url),
            _ => {
                tracing::warn!("Shopify response has no file.public_url, returning raw body");
                UploadedUrl::Raw(body)
            }
        }
    }
}

/// Creates one remote file and returns where it can be fetched from.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_file(&self, filename: &str, content: &[u8]) -> Result<UploadedUrl>;
}

use crate::shopify::UploadedUrl;
use serde::Serialize;
use utoipa::ToSchema;

/// Successful relay of every file in the request.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool, // Always true; failures use the error body
    /// One entry per uploaded file, in the order the files appeared in the form. Normally
    /// the public URL; the raw Shopify response when it carried none.
    pub urls: Vec<UploadedUrl>,
}

impl UploadResponse {
    pub fn new(urls: Vec<UploadedUrl>) -> Self {
        Self { success: true, urls }
    }
}

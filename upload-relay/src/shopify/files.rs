use super::{CreateFileAttachment, CreateFileRequest, FileStore, UploadedUrl};
use crate::config::{ShopifyConfig, ShopifyCredentials};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// `FileStore` backed by the Shopify Admin REST API.
pub struct ShopifyFiles {
    client: Client,
    endpoint: Url,
    access_token: String,
}

impl ShopifyFiles {
    pub fn new(credentials: ShopifyCredentials, config: &ShopifyConfig) -> anyhow::Result<Self> {
        crate::install_crypto_provider();

        let endpoint = files_endpoint(&credentials.store, config)?;
        let client = build_client(config.request_timeout)?;
        debug!(endpoint = %endpoint, "Shopify files endpoint configured");

        Ok(Self {
            client,
            endpoint,
            access_token: credentials.access_token,
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

/// `https://{store}/admin/api/{version}/files.json`, or the same path under `base_url`.
fn files_endpoint(store: &str, config: &ShopifyConfig) -> anyhow::Result<Url> {
    let base = match &config.base_url {
        Some(url) => ensure_slash(url),
        None => Url::parse(&format!("https://{}/", store.trim_end_matches('/')))
            .map_err(|e| anyhow::anyhow!("Invalid Shopify store domain '{}': {}", store, e))?,
    };

    base.join(&format!("admin/api/{}/files.json", config.api_version.trim()))
        .map_err(|e| anyhow::anyhow!("Failed to construct files URL: {}", e))
}

/// Makes sure a url has a trailing slash, so that `join` appends rather than replaces the
/// last path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[async_trait]
impl FileStore for ShopifyFiles {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn create_file(&self, filename: &str, content: &[u8]) -> Result<UploadedUrl> {
        let body = CreateFileRequest {
            file: CreateFileAttachment {
                attachment: general_purpose::STANDARD.encode(content),
                filename,
            },
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UploadFailed { message: e.to_string() })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::UploadFailed { message: e.to_string() })?;

        if !status.is_success() {
            let details = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            return Err(Error::RemoteApi { status, details });
        }

        let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| Error::UploadFailed {
            message: format!("Shopify returned a non-JSON success body: {}", e),
        })?;

        debug!(status = %status, "Shopify file created");
        Ok(UploadedUrl::from_response_body(body))
    }
}

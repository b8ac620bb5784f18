//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `UPLOAD_RELAY_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, optional)
//! 2. **Environment variables** - Variables prefixed with `UPLOAD_RELAY_` override YAML values
//! 3. **SHOPIFY_STORE / SHOPIFY_ACCESS_TOKEN** - Special case: override `shopify.store` and
//!    `shopify.access_token` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `UPLOAD_RELAY_SHOPIFY__API_VERSION=2025-01` sets the `shopify.api_version` field.
//!
//! ## Example
//!
//! ```yaml
//! port: 3000
//! shopify:
//!   store: your-store.myshopify.com
//!   request_timeout: 30s
//! upload:
//!   max_body_size: 209715200
//! cors:
//!   enabled: true
//! ```
//!
//! ```bash
//! SHOPIFY_ACCESS_TOKEN="shpat_..." upload-relay -f config.yaml
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

use crate::errors::Error;

/// Shopify Admin REST API version used for `files.json`
pub const DEFAULT_API_VERSION: &str = "2024-10";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "UPLOAD_RELAY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty config file plus the two Shopify environment
/// variables is a complete configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Remote Shopify store and credentials
    pub shopify: ShopifyConfig,
    /// Inbound upload handling
    pub upload: UploadConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Connection settings for the Shopify Admin API.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShopifyConfig {
    /// Store domain, e.g. `your-store.myshopify.com`
    pub store: Option<String>,
    /// Admin API access token, sent as `X-Shopify-Access-Token`
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Admin API version segment of the files endpoint
    pub api_version: String,
    /// Overrides `https://{store}/` as the API origin (reverse proxies, local testing)
    pub base_url: Option<Url>,
    /// Upper bound on a single file upload call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Inbound upload handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Maximum size of the whole multipart request body in bytes
    pub max_body_size: usize,
    /// Number of files uploaded to Shopify at once within one request. 1 means strictly
    /// sequential.
    pub concurrency: usize,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Answer preflight requests and attach CORS headers. When disabled, `OPTIONS` is
    /// rejected like any other non-POST method.
    pub enabled: bool,
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    Wildcard,
    Url(Url),
}

impl Serialize for CorsOrigin {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CorsOrigin::Wildcard => serializer.serialize_str("*"),
            CorsOrigin::Url(url) => serializer.serialize_str(url.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for CorsOrigin {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "*" {
            Ok(CorsOrigin::Wildcard)
        } else {
            Url::parse(&s).map(CorsOrigin::Url).map_err(serde::de::Error::custom)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shopify: ShopifyConfig::default(),
            upload: UploadConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            store: None,
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_size: 200 * 1024 * 1024, // 200 MiB
            concurrency: 1,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: None,
        }
    }
}

// The access token must never end up in logs.
impl fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Store and token, both present and non-blank.
#[derive(Clone)]
pub struct ShopifyCredentials {
    pub store: String,
    pub access_token: String,
}

impl ShopifyConfig {
    /// Returns the credentials, or `None` when either is missing or blank.
    pub fn credentials(&self) -> Option<ShopifyCredentials> {
        let store = self.store.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let access_token = self.access_token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(ShopifyCredentials {
            store: store.to_string(),
            access_token: access_token.to_string(),
        })
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.shopify.credentials().is_none() {
            return Err(Error::MissingCredentials);
        }

        if self.shopify.api_version.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "shopify.api_version must not be empty".to_string(),
            });
        }

        if self.upload.concurrency == 0 {
            return Err(Error::InvalidConfig {
                message: "upload.concurrency must be at least 1".to_string(),
            });
        }

        if self.upload.max_body_size == 0 {
            return Err(Error::InvalidConfig {
                message: "upload.max_body_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("UPLOAD_RELAY_").split("__").ignore(&["config"]))
            // The conventional Shopify variables
            .merge(Env::raw().only(&["SHOPIFY_STORE"]).map(|_| "shopify.store".into()))
            .merge(Env::raw().only(&["SHOPIFY_ACCESS_TOKEN"]).map(|_| "shopify.access_token".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

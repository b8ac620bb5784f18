use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Anything but POST (and OPTIONS while CORS is enabled)
    #[error("Only POST allowed")]
    MethodNotAllowed,

    /// Store domain or access token not configured
    #[error("Missing SHOPIFY_STORE or SHOPIFY_ACCESS_TOKEN")]
    MissingCredentials,

    /// Configuration is present but inconsistent. Raised by `Config::validate` at startup, so
    /// it never reaches a response.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The multipart body could not be decoded
    #[error("Form parse error: {message}")]
    FormParse { message: String },

    /// Shopify answered a file upload with a non-success status
    #[error("Shopify API error ({status}): {details}")]
    RemoteApi {
        status: StatusCode,
        details: serde_json::Value,
    },

    /// Upload could not be completed for a local or transport reason
    #[error("Upload failed: {message}")]
    UploadFailed { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::RemoteApi { .. } => StatusCode::BAD_GATEWAY,
            Error::MissingCredentials
            | Error::InvalidConfig { .. }
            | Error::FormParse { .. }
            | Error::UploadFailed { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response body. Parse failures and missing credentials keep their details in the
    /// logs only.
    pub fn body(&self) -> ErrorBody {
        match self {
            Error::MethodNotAllowed => ErrorBody {
                error: "Only POST allowed",
                details: None,
            },
            Error::MissingCredentials => ErrorBody {
                error: "Missing SHOPIFY_STORE or SHOPIFY_ACCESS_TOKEN",
                details: None,
            },
            Error::FormParse { .. } => ErrorBody {
                error: "Form parse error",
                details: None,
            },
            Error::RemoteApi { details, .. } => ErrorBody {
                error: "Shopify API error",
                details: Some(details.clone()),
            },
            Error::UploadFailed { message } | Error::InvalidConfig { message } => ErrorBody {
                error: "Upload failed",
                details: Some(serde_json::Value::String(message.clone())),
            },
            Error::Other(e) => ErrorBody {
                error: "Upload failed",
                details: Some(serde_json::Value::String(format!("{e:#}"))),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::MissingCredentials | Error::InvalidConfig { .. } | Error::UploadFailed { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::FormParse { .. } => {
                tracing::error!("Form parse error: {}", self);
            }
            Error::RemoteApi { status, details } => {
                tracing::warn!(status = %status, details = %details, "Shopify API error");
            }
            Error::MethodNotAllowed => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let mut response = (status, Json(self.body())).into_response();
        if let Error::MethodNotAllowed = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

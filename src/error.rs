//! Request-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Errors surfaced to HTTP clients.
///
/// User-visible messages stay generic ("Failed to ..."); only generation
/// failures carry the upstream reason in `details`.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Missing or malformed client input (empty message, bad file type).
    #[error("{0}")]
    InvalidInput(String),

    /// Upload body exceeded the configured size limit.
    #[error("{0}")]
    TooLarge(String),

    /// Requested stored file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Uploaded document could not be turned into text.
    #[error("{0}")]
    Extraction(String),

    /// Uploaded bytes could not be persisted.
    #[error("{0}")]
    Upload(String),

    /// Upload directories could not be listed.
    #[error("{0}")]
    Listing(String),

    /// The answer generator failed; `details` is the upstream reason.
    #[error("{message}: {details}")]
    Generation { message: String, details: String },
}

impl PortalError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Extraction(_) | Self::Upload(_) | Self::Listing(_) | Self::Generation { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Generation { message, details } => {
                serde_json::json!({ "error": message, "details": details })
            }
            Self::InvalidInput(msg)
            | Self::NotFound(msg)
            | Self::TooLarge(msg)
            | Self::Extraction(msg)
            | Self::Upload(msg)
            | Self::Listing(msg) => serde_json::json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(PortalError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(PortalError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            PortalError::TooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PortalError::Extraction("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generation_error_keeps_reason() {
        let err = PortalError::Generation {
            message: "Failed to process chat request".into(),
            details: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Failed to process chat request: quota exceeded");
    }
}

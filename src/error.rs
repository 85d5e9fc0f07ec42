/// Unified error types for Meeting Mirror
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid session credential
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// No usable refresh token, the user has to re-authorize with the provider
    #[error("Provider credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// Provider identity conflicts with the identity already linked to the account
    #[error("Provider identity mismatch: account is linked to {linked}, provider returned {received}")]
    IdentityMismatch { linked: String, received: String },

    /// Network failure or timeout talking to the provider
    #[error("Provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Provider answered with an unexpected status
    #[error("Provider rejected request ({status}): {body}")]
    UpstreamRejected { status: u16, body: String },

    /// Provider payload is missing expected fields
    #[error("Provider payload schema mismatch: {0}")]
    UpstreamSchemaMismatch(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => "InternalServerError",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::CredentialsUnavailable(_) => "CredentialsUnavailable",
            AppError::IdentityMismatch { .. } => "IdentityMismatch",
            AppError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            AppError::UpstreamRejected { .. } => "UpstreamRejected",
            AppError::UpstreamSchemaMismatch(_) => "UpstreamSchemaMismatch",
            AppError::Validation(_) => "InvalidRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::RateLimitExceeded { .. } => "RateLimitExceeded",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::CredentialsUnavailable(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::IdentityMismatch { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamRejected { status: 404, .. } => StatusCode::NOT_FOUND,
            AppError::UpstreamRejected { .. } | AppError::UpstreamSchemaMismatch(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string() // Don't leak details
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "Internal server error".to_string()
            }
            // The raw provider body is what the caller needs to act on
            AppError::UpstreamRejected { body, .. } => body.clone(),
            other => other.to_string(),
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.code().to_string(),
                message,
            }),
        )
            .into_response();

        if let AppError::RateLimitExceeded { retry_after } = self {
            if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

/// Result type alias for server operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_not_found_maps_to_404() {
        let err = AppError::UpstreamRejected {
            status: 404,
            body: r#"{"code":3001}"#.to_string(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::UpstreamRejected {
            status: 400,
            body: String::new(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_identity_mismatch_is_conflict() {
        let err = AppError::IdentityMismatch {
            linked: "R1".to_string(),
            received: "R2".to_string(),
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "IdentityMismatch");
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = AppError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(2),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "2");
    }
}

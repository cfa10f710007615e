//! Error types for saargate
//!
//! All errors implement `IntoResponse` for Axum handlers. Provider errors
//! never reach the client directly - the router absorbs them into the
//! fallback chain (see `router`).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed for '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid authentication")]
    InvalidAuthentication,

    #[error("CSRF token invalid")]
    CsrfRejected,

    #[error("Too Many Requests")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Provider {provider} is not available")]
    ProviderUnavailable { provider: String },

    #[error("Provider {provider} request failed: {reason}")]
    ProviderRequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout_seconds} seconds")]
    ProviderTimeout {
        provider: String,
        timeout_seconds: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Deliberately generic - no user enumeration via error detail
            Self::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            Self::InvalidAuthentication => (
                StatusCode::UNAUTHORIZED,
                "Invalid authentication".to_string(),
            ),
            Self::CsrfRejected => (StatusCode::FORBIDDEN, "CSRF token invalid".to_string()),
            Self::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too Many Requests".to_string(),
            ),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            // Provider errors are absorbed by the router's fallback chain in
            // normal operation; reaching here means a handler bypassed it.
            Self::ProviderUnavailable { .. }
            | Self::ProviderRequestFailed { .. }
            | Self::ProviderTimeout { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Service temporarily unavailable".to_string(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        let mut response = (status, body).into_response();

        if let Self::RateLimited {
            retry_after_seconds,
        } = self
        {
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authentication_required_response_status() {
        let err = AppError::AuthenticationRequired;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_authentication_response_status() {
        let err = AppError::InvalidAuthentication;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_csrf_rejected_response_status() {
        let err = AppError::CsrfRejected;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_rate_limited_response_has_retry_after_header() {
        let err = AppError::RateLimited {
            retry_after_seconds: 42,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get("Retry-After")
                .expect("Retry-After header should be set"),
            "42"
        );
    }

    #[test]
    fn test_provider_errors_do_not_leak_detail() {
        let err = AppError::ProviderRequestFailed {
            provider: "openai".to_string(),
            reason: "connection refused to internal host".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_response_status() {
        let err = AppError::Internal("unexpected state".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_provider_timeout_display() {
        let err = AppError::ProviderTimeout {
            provider: "gemini".to_string(),
            timeout_seconds: 30,
        };
        assert_eq!(err.to_string(), "Provider gemini timed out after 30 seconds");
    }
}

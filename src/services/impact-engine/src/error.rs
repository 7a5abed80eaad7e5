use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),

    #[error("Business context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request_id: Option<String>,
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::RateLimited(_) => "RATE_LIMITED",
            AppError::TimeoutError(_) => "TIMEOUT_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            AppError::ContextUnavailable(_) => "CONTEXT_UNAVAILABLE",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::TimeoutError(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::ContextUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transient failures an opt-in retry policy may re-attempt. Validation
    /// and authorization failures are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited(_)
                | AppError::TimeoutError(_)
                | AppError::ServiceUnavailable(_)
        )
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let error_response = ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
            code: format!("{}", status_code.as_u16()),
            timestamp: chrono::Utc::now(),
            request_id: None,
        };

        // Log errors based on severity
        match &self {
            AppError::InternalServerError(_)
            | AppError::ConfigurationError(_)
            | AppError::ContextUnavailable(_) => {
                tracing::error!("Server error: {:?}", self);
            }
            AppError::MalformedResponse(_)
            | AppError::ExternalServiceError(_)
            | AppError::ServiceUnavailable(_)
            | AppError::TimeoutError(_)
            | AppError::RateLimited(_) => {
                tracing::warn!("External service error: {:?}", self);
            }
            AppError::ValidationError(_) | AppError::NotFound(_) => {
                tracing::info!("Client error: {:?}", self);
            }
            _ => {
                tracing::debug!("Error: {:?}", self);
            }
        }

        (status_code, Json(error_response)).into_response()
    }
}

// From implementations for common error types

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::TimeoutError(format!("HTTP request timeout: {}", err))
        } else if err.is_connect() {
            AppError::ServiceUnavailable(format!("Connection failed: {}", err))
        } else {
            AppError::ExternalServiceError(format!("Request failed: {}", err))
        }
    }
}

// Utility functions for error handling

pub fn validation_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(AppError::ValidationError(msg.into()))
}

pub fn not_found<T>(msg: impl Into<String>) -> Result<T> {
    Err(AppError::NotFound(msg.into()))
}

pub fn unauthorized<T>(msg: impl Into<String>) -> Result<T> {
    Err(AppError::Unauthorized(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::ValidationError("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::MalformedResponse("test".to_string()).error_code(),
            "MALFORMED_RESPONSE"
        );
        assert_eq!(
            AppError::PermissionDenied("test".to_string()).error_code(),
            "PERMISSION_DENIED"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ValidationError("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("test".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::MalformedResponse("test".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::RateLimited("test".to_string()).is_retryable());
        assert!(AppError::TimeoutError("test".to_string()).is_retryable());
        assert!(AppError::ServiceUnavailable("test".to_string()).is_retryable());
        assert!(!AppError::ValidationError("test".to_string()).is_retryable());
        assert!(!AppError::MalformedResponse("test".to_string()).is_retryable());
        assert!(!AppError::NotFound("test".to_string()).is_retryable());
    }

    #[test]
    fn test_error_classification() {
        let client_error = AppError::ValidationError("test".to_string());
        let server_error = AppError::ServiceUnavailable("test".to_string());

        assert!(client_error.is_client_error());
        assert!(!client_error.is_server_error());
        assert!(server_error.is_server_error());
        assert!(!server_error.is_client_error());
    }
}

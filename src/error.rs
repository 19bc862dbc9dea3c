use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Main error type for the Siskin rate limiting service
#[derive(Debug)]
pub enum SiskinError {
    /// Configuration or CLI argument errors, including unknown algorithm names
    Config(String),

    /// Counter store unavailable or misbehaving (network loss, timeout,
    /// wrong-typed key). Decisions fail closed on this variant.
    Store(String),

    /// API/HTTP related errors
    Api(String),

    /// System I/O errors
    Io(std::io::Error),
}

impl fmt::Display for SiskinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiskinError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SiskinError::Store(msg) => write!(f, "Counter store error: {}", msg),
            SiskinError::Api(msg) => write!(f, "API error: {}", msg),
            SiskinError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SiskinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SiskinError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, SiskinError>;

// Axum IntoResponse implementation for HTTP error responses
impl IntoResponse for SiskinError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl SiskinError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiskinError::Config(_) => StatusCode::BAD_REQUEST,
            // Fail closed: a broken store is a 5xx, never a silent allow or deny
            SiskinError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            SiskinError::Api(_) => StatusCode::BAD_REQUEST,
            SiskinError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            SiskinError::Config(_) => "configuration_error",
            SiskinError::Store(_) => "store_unavailable",
            SiskinError::Api(_) => "api_error",
            SiskinError::Io(_) => "io_error",
        }
    }
}

// Conversions from common error types
impl From<std::io::Error> for SiskinError {
    fn from(err: std::io::Error) -> Self {
        SiskinError::Io(err)
    }
}

impl From<redis::RedisError> for SiskinError {
    fn from(err: redis::RedisError) -> Self {
        SiskinError::Store(err.to_string())
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::SiskinError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SiskinError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! store_error {
    ($msg:expr) => {
        $crate::error::SiskinError::Store($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SiskinError::Store(format!($fmt, $($arg)*))
    };
}

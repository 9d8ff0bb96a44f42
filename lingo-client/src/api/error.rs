use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not signed in")]
    AuthMissing,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// User-facing error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No token, or the server rejected it; the user has to sign in
    AuthMissing,
    Network,
    Validation,
    Permission,
    Server,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::BadRequest(_) => Some(400),
            ApiError::Serialization(_) | ApiError::AuthMissing => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::AuthMissing | ApiError::Unauthorized(_) => ErrorCategory::AuthMissing,
            ApiError::Forbidden(_) => ErrorCategory::Permission,
            ApiError::BadRequest(_) => ErrorCategory::Validation,
            ApiError::Network(e) if e.is_decode() => ErrorCategory::Server,
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::NotFound(_) | ApiError::Serialization(_) => ErrorCategory::Server,
            ApiError::Api { status, .. } if *status == 422 => ErrorCategory::Validation,
            ApiError::Api { .. } => ErrorCategory::Server,
        }
    }

    /// Message suitable for an inline error or a transient notification.
    /// Nothing is retried automatically, so recoverable errors say so.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::AuthMissing => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ErrorCategory::Network => {
                "Connection failed. Check your network and try again.".to_string()
            }
            ErrorCategory::Validation => format!("Please check your input: {}", self.detail()),
            ErrorCategory::Permission => "You don't have permission to do that.".to_string(),
            ErrorCategory::Server => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

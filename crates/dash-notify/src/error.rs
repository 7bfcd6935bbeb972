//! Notification Error Types

use thiserror::Error;

/// Reasons a webhook registration is rejected before anything is persisted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid event '{value}', expected one of REGISTER, CHANGE, DELETE, INVOKE")]
    InvalidEvent { value: String },

    #[error("Localhost url '{url}' is not valid, expected http://localhost:<4-digit port>/<path>")]
    InvalidLocalUrl { url: String },

    #[error("Url '{url}' is not reachable: {reason}")]
    UnreachableUrl { url: String, reason: String },
}

impl ValidationError {
    /// Stable machine-readable kind, used in error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidEvent { .. } => "INVALID_EVENT",
            Self::InvalidLocalUrl { .. } => "INVALID_LOCAL_URL",
            Self::UnreachableUrl { .. } => "UNREACHABLE_URL",
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Subscription not found: {id}")]
    NotFound { id: String },

    #[error("No free id found after {attempts} attempts")]
    ExhaustedAttempts { attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl NotifyError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

impl From<mongodb::error::Error> for NotifyError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds() {
        assert_eq!(ValidationError::MissingField { field: "url" }.kind(), "MISSING_FIELD");
        assert_eq!(
            ValidationError::InvalidEvent { value: "UPDATE".into() }.kind(),
            "INVALID_EVENT"
        );
        assert_eq!(
            ValidationError::InvalidLocalUrl { url: "http://localhost:80".into() }.kind(),
            "INVALID_LOCAL_URL"
        );
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: NotifyError = ValidationError::MissingField { field: "event" }.into();
        assert_eq!(err.to_string(), "Missing required field: event");
    }
}

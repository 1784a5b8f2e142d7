/// Core error types for the Matteline engine.

/// A specialized Result type for Matteline operations.
pub type MattelineResult<T> = Result<T, MattelineError>;

/// Top-level error type encompassing all Matteline subsystems.
#[derive(Debug, thiserror::Error)]
pub enum MattelineError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("decode error: {message} ({origin})")]
    Decode { message: String, origin: String },

    #[error("custom mask error: {0}")]
    Mask(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MattelineError {
    /// Create a decode error naming where the payload came from.
    pub fn decode(message: impl Into<String>, origin: impl Into<String>) -> Self {
        MattelineError::Decode {
            message: message.into(),
            origin: origin.into(),
        }
    }

    /// Create a custom mask error.
    pub fn mask(message: impl Into<String>) -> Self {
        MattelineError::Mask(message.into())
    }
}

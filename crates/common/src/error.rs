//! Error types shared across Asipuc crates.

use std::path::PathBuf;

/// Top-level error type for Asipuc operations.
#[derive(Debug, thiserror::Error)]
pub enum AsipucError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using AsipucError.
pub type AsipucResult<T> = Result<T, AsipucError>;

impl AsipucError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error reports a missing entity rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::FileNotFound { .. })
    }
}

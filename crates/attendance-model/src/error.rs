//! Errors raised by ledger edits and model files.

use std::path::PathBuf;

use asipuc_common::error::AsipucError;

use crate::ledger::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid data: {message}")]
    ValidationError { message: String },

    #[error("Reporting unit {id} not found")]
    UnitNotFound { id: UnitId },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Unknown {kind}: {value}")]
    UnknownKey { kind: &'static str, value: String },
}

impl ModelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError {
            message: msg.into(),
        }
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: msg.into(),
        }
    }

    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownKey {
            kind,
            value: value.into(),
        }
    }
}

impl From<ModelError> for AsipucError {
    fn from(err: ModelError) -> Self {
        match err {
            err @ (ModelError::IoError { .. } | ModelError::ParseError { .. }) => {
                AsipucError::persistence(err.to_string())
            }
            ModelError::UnitNotFound { id } => AsipucError::not_found(format!("reporting unit {id}")),
            other => AsipucError::validation(other.to_string()),
        }
    }
}

//! On-disk snapshot of the working day (`ledger.json`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ledger::Ledger;

/// Current snapshot schema version.
pub const LEDGER_FILE_VERSION: &str = "1.0";

/// The ledger together with file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFile {
    /// Schema version.
    pub version: String,

    /// Last save timestamp (ISO 8601), empty before the first save.
    #[serde(default)]
    pub saved_at: String,

    pub ledger: Ledger,
}

impl LedgerFile {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            version: LEDGER_FILE_VERSION.to_string(),
            saved_at: String::new(),
            ledger,
        }
    }

    /// Load and validate a snapshot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load a snapshot, or start a default day when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No ledger snapshot, starting a new day");
            Ok(Self::new(Ledger::new()))
        }
    }

    /// Write the snapshot, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

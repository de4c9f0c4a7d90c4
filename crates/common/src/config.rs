//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database and the working ledger.
    pub data_dir: PathBuf,

    /// SQLite database with the attendance table.
    pub database_path: PathBuf,

    /// JSON snapshot of the working day (units and tallies).
    pub ledger_path: PathBuf,

    /// Directory where exported slides are written.
    pub exports_dir: PathBuf,

    /// Font, background and logo folders.
    pub resources: ResourceDirs,

    /// Default export parameters.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Bundled and user-uploaded resource roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDirs {
    /// Read-only assets shipped with the application.
    pub system_dir: PathBuf,

    /// Uploads made by the operator.
    pub user_dir: PathBuf,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Template id (`modern`, `classic`, `minimal`, `elegant`).
    pub template: String,

    /// Theme preset name or path to a theme JSON file.
    pub theme: String,

    /// Output format (`png` or `jpeg`).
    pub format: String,

    /// JPEG quality factor in `[0.1, 1.0]`.
    pub quality: f32,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Pause between consecutive captures of a batch.
    pub inter_capture_delay_ms: u64,

    /// Frames the staged slide must paint before it is rasterized.
    pub settle_frames: u32,

    /// Load system fonts into the rasterizer's font database.
    pub system_fonts: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "asipuc=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs_default_data();
        Self {
            database_path: data_dir.join("attendance.db"),
            ledger_path: data_dir.join("ledger.json"),
            exports_dir: data_dir.join("exports"),
            resources: ResourceDirs {
                system_dir: data_dir.join("assets"),
                user_dir: data_dir.join("uploads"),
            },
            data_dir,
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            template: "modern".to_string(),
            theme: "modern".to_string(),
            format: "png".to_string(),
            quality: 0.95,
            width: 1920,
            height: 1080,
            inter_capture_delay_ms: 300,
            settle_frames: 2,
            system_fonts: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults when missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("asipuc").join("config.json")
}

/// Default data directory.
fn dirs_default_data() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("asipuc")
}

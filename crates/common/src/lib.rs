//! Asipuc Common Utilities
//!
//! Shared infrastructure for all Asipuc crates:
//! - Error types and result aliases
//! - Wall clock abstraction for timestamps and export filenames
//! - Tracing/logging initialization
//! - Configuration loading
//! - `file://` URL helpers

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use clock::*;
pub use config::*;
pub use error::*;

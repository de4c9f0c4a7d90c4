//! Asipuc Storage
//!
//! Local collaborators of the slide pipeline:
//! - [`SqliteStore`]: the append-only attendance table
//! - [`ResourceLibrary`]: fonts, backgrounds and logos on disk

pub mod resources;
pub mod sqlite;

pub use resources::*;
pub use sqlite::*;

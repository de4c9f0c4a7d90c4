//! Asipuc Attendance Model
//!
//! Defines the core data contracts for attendance slides:
//! - **Tally:** Per-category head counts with a derived total
//! - **Ledger:** The reporting units of one day, with an active selection
//! - **Store:** The append-only persistence contract
//! - **Theme / Settings:** Visual styling and export parameters
//!
//! Totals are never stored alongside counts; they are recomputed from the
//! counts every time they are read.

pub mod error;
pub mod ledger;
pub mod session;
pub mod settings;
pub mod store;
pub mod tally;
pub mod template;
pub mod theme;

pub use error::*;
pub use ledger::*;
pub use session::*;
pub use settings::*;
pub use store::*;
pub use tally::*;
pub use template::*;
pub use theme::*;

//! Persistence contract for attendance records.
//!
//! Storage is append-only: every save produces a new row, nothing is ever
//! updated in place.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use asipuc_common::clock::iso_timestamp;
use asipuc_common::error::AsipucResult;

use crate::ledger::ReportingUnit;
use crate::tally::{Category, Tally};

/// One record to append to the attendance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceRequest {
    /// ISO 8601 timestamp of the save.
    pub date: String,

    /// Count per category.
    pub counts: BTreeMap<Category, u32>,

    /// Sum of `counts`.
    pub total: u64,

    /// Reporting unit name, when the record belongs to a unit.
    pub unit_name: Option<String>,

    /// Reporting unit scheduled time.
    pub unit_time: Option<String>,
}

impl PersistenceRequest {
    /// Build a request for a bare tally.
    pub fn from_tally(tally: &Tally, at: &DateTime<Utc>) -> Self {
        Self {
            date: iso_timestamp(at),
            counts: (*tally).into(),
            total: tally.total(),
            unit_name: None,
            unit_time: None,
        }
    }

    /// Build a request for a reporting unit's current tally.
    pub fn for_unit(unit: &ReportingUnit, at: &DateTime<Utc>) -> Self {
        Self {
            unit_name: Some(unit.name.clone()),
            unit_time: Some(unit.scheduled_time.clone()),
            ..Self::from_tally(&unit.data, at)
        }
    }

    /// Counts as a tally.
    pub fn tally(&self) -> Tally {
        Tally::from_counts(self.counts.iter().map(|(&c, &v)| (c, v)))
    }
}

/// A row read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttendance {
    pub id: i64,
    pub date: String,
    pub counts: Tally,
    pub total: u64,
    pub unit_name: Option<String>,
    pub unit_time: Option<String>,
}

/// Append-only attendance storage.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Append one record, returning its assigned id.
    async fn append(&self, request: PersistenceRequest) -> AsipucResult<i64>;

    /// Most recent records, newest first.
    async fn recent(&self, limit: usize) -> AsipucResult<Vec<StoredAttendance>>;

    /// Store name for logs.
    fn name(&self) -> &str;
}

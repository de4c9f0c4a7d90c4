//! The day's reporting units and their tallies.
//!
//! A ledger always holds at least one unit and always has exactly one
//! active unit, which receives edits made through [`Ledger::record`].

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::store::{AttendanceStore, PersistenceRequest};
use crate::tally::{Category, Tally};

/// Default name of a unit added without one.
pub const DEFAULT_UNIT_NAME: &str = "New Service";

/// Default scheduled time of a unit added without one.
pub const DEFAULT_UNIT_TIME: &str = "12:00";

/// Stable identifier of a reporting unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One service, session or shift with its own tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingUnit {
    pub id: UnitId,
    pub name: String,
    pub scheduled_time: String,
    pub enabled: bool,
    #[serde(default)]
    pub data: Tally,
}

impl ReportingUnit {
    pub fn new(id: UnitId, name: impl Into<String>, scheduled_time: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scheduled_time: scheduled_time.into(),
            enabled: true,
            data: Tally::default(),
        }
    }

    pub fn total(&self) -> u64 {
        self.data.total()
    }
}

/// Partial edit applied by [`Ledger::update_unit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub scheduled_time: Option<String>,
    pub enabled: Option<bool>,
}

/// Result of persisting every enabled unit.
#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    /// Units that were stored, with the row id the store assigned.
    pub stored: Vec<(UnitId, i64)>,

    /// Units whose record was rejected, with the reason.
    pub failed: Vec<(UnitId, String)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Serialized form; converted through [`Ledger::from_parts`] so invariants
/// hold for anything read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerRepr {
    units: Vec<ReportingUnit>,
    active: UnitId,
}

/// Ordered collection of reporting units with an active selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LedgerRepr", into = "LedgerRepr")]
pub struct Ledger {
    units: Vec<ReportingUnit>,
    active: UnitId,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// The default day: a morning and an afternoon service.
    pub fn new() -> Self {
        Self {
            units: vec![
                ReportingUnit::new(UnitId(1), "Morning Service", "09:00"),
                ReportingUnit::new(UnitId(2), "Afternoon Service", "16:00"),
            ],
            active: UnitId(1),
        }
    }

    /// Build a ledger from explicit units; the first becomes active.
    pub fn with_units(units: impl IntoIterator<Item = ReportingUnit>) -> Result<Self, ModelError> {
        let units: Vec<_> = units.into_iter().collect();
        let active = units
            .first()
            .map(|u| u.id)
            .ok_or_else(|| ModelError::validation("a ledger needs at least one reporting unit"))?;
        Self::from_parts(units, active)
    }

    /// Build a ledger from units and an active id, validating both.
    pub fn from_parts(units: Vec<ReportingUnit>, active: UnitId) -> Result<Self, ModelError> {
        if units.is_empty() {
            return Err(ModelError::validation(
                "a ledger needs at least one reporting unit",
            ));
        }
        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.id) {
                return Err(ModelError::validation(format!(
                    "duplicate reporting unit id {}",
                    unit.id
                )));
            }
        }
        if !seen.contains(&active) {
            return Err(ModelError::validation(format!(
                "active unit {active} is not in the ledger"
            )));
        }
        Ok(Self { units, active })
    }

    pub fn units(&self) -> &[ReportingUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&ReportingUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut ReportingUnit, ModelError> {
        self.units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ModelError::UnitNotFound { id })
    }

    /// Id of the unit that receives edits.
    pub fn active_id(&self) -> UnitId {
        self.active
    }

    pub fn active_unit(&self) -> &ReportingUnit {
        // `active` always names a member of `units`.
        self.unit(self.active).unwrap_or(&self.units[0])
    }

    /// Enabled units in collection order.
    pub fn enabled_units(&self) -> impl Iterator<Item = &ReportingUnit> {
        self.units.iter().filter(|u| u.enabled)
    }

    /// Append a new enabled unit with an empty tally.
    ///
    /// The new id is one past the largest id in the ledger.
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        scheduled_time: impl Into<String>,
    ) -> Result<UnitId, ModelError> {
        let name = validated_name(name.into())?;
        let id = self.next_id()?;
        self.units
            .push(ReportingUnit::new(id, name, scheduled_time.into().trim()));
        tracing::debug!(unit = %id, "Added reporting unit");
        Ok(id)
    }

    /// Append a unit with the default name and time.
    pub fn add_default_unit(&mut self) -> Result<UnitId, ModelError> {
        self.add_unit(DEFAULT_UNIT_NAME, DEFAULT_UNIT_TIME)
    }

    fn next_id(&self) -> Result<UnitId, ModelError> {
        let max = self.units.iter().map(|u| u.id.0).max().unwrap_or(0);
        max.checked_add(1).map(UnitId).ok_or_else(|| {
            ModelError::invalid_operation(format!("no reporting unit id left after {max}"))
        })
    }

    /// Remove a unit. The last remaining unit cannot be removed.
    ///
    /// When the active unit is removed, the first remaining unit becomes
    /// active.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<ReportingUnit, ModelError> {
        let pos = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or(ModelError::UnitNotFound { id })?;
        if self.units.len() == 1 {
            return Err(ModelError::invalid_operation(
                "cannot remove the last reporting unit",
            ));
        }
        let removed = self.units.remove(pos);
        if self.active == id {
            self.active = self.units[0].id;
        }
        tracing::debug!(unit = %id, active = %self.active, "Removed reporting unit");
        Ok(removed)
    }

    /// Apply a partial edit to a unit's metadata.
    pub fn update_unit(&mut self, id: UnitId, patch: UnitPatch) -> Result<(), ModelError> {
        let name = patch.name.map(validated_name).transpose()?;
        let unit = self.unit_mut(id)?;
        if let Some(name) = name {
            unit.name = name;
        }
        if let Some(time) = patch.scheduled_time {
            unit.scheduled_time = time.trim().to_string();
        }
        if let Some(enabled) = patch.enabled {
            unit.enabled = enabled;
        }
        Ok(())
    }

    /// Flip a unit's enabled flag, returning the new value.
    pub fn toggle_enabled(&mut self, id: UnitId) -> Result<bool, ModelError> {
        let unit = self.unit_mut(id)?;
        unit.enabled = !unit.enabled;
        Ok(unit.enabled)
    }

    pub fn set_active(&mut self, id: UnitId) -> Result<(), ModelError> {
        if self.unit(id).is_none() {
            return Err(ModelError::UnitNotFound { id });
        }
        self.active = id;
        Ok(())
    }

    /// Update one category of the active unit from raw input.
    pub fn record(&mut self, category: Category, raw: &str) -> Tally {
        let active = self.active;
        let idx = self
            .units
            .iter()
            .position(|u| u.id == active)
            .unwrap_or(0);
        let unit = &mut self.units[idx];
        unit.data = unit.data.update(category, raw);
        unit.data
    }

    /// Update one category of a specific unit from raw input.
    pub fn record_for(
        &mut self,
        id: UnitId,
        category: Category,
        raw: &str,
    ) -> Result<Tally, ModelError> {
        let unit = self.unit_mut(id)?;
        unit.data = unit.data.update(category, raw);
        Ok(unit.data)
    }

    /// Zero one unit's tally.
    pub fn reset_unit(&mut self, id: UnitId) -> Result<(), ModelError> {
        self.unit_mut(id)?.data = Tally::default();
        Ok(())
    }

    /// Zero every unit's tally.
    pub fn reset_all(&mut self) {
        for unit in &mut self.units {
            unit.data = Tally::default();
        }
    }

    pub fn unit_total(&self, id: UnitId) -> Result<u64, ModelError> {
        self.unit(id)
            .map(ReportingUnit::total)
            .ok_or(ModelError::UnitNotFound { id })
    }

    /// Per-category sum over enabled units.
    pub fn accumulate(&self) -> Tally {
        self.enabled_units().map(|u| &u.data).sum()
    }

    pub fn accumulated_total(&self) -> u64 {
        self.accumulate().total()
    }

    /// Append one record per enabled unit, in collection order.
    ///
    /// Each append is independent: a rejected record is reported and the
    /// remaining units are still stored.
    pub async fn persist_all(
        &self,
        store: &dyn AttendanceStore,
        at: DateTime<Utc>,
    ) -> PersistReport {
        let mut report = PersistReport::default();
        for unit in self.enabled_units() {
            let request = PersistenceRequest::for_unit(unit, &at);
            match store.append(request).await {
                Ok(row_id) => {
                    tracing::info!(
                        unit = %unit.id,
                        name = %unit.name,
                        total = unit.total(),
                        row_id,
                        store = store.name(),
                        "Stored attendance"
                    );
                    report.stored.push((unit.id, row_id));
                }
                Err(e) => {
                    tracing::warn!(unit = %unit.id, name = %unit.name, error = %e, "Failed to store attendance");
                    report.failed.push((unit.id, e.to_string()));
                }
            }
        }
        report
    }
}

impl TryFrom<LedgerRepr> for Ledger {
    type Error = ModelError;

    fn try_from(repr: LedgerRepr) -> Result<Self, Self::Error> {
        Ledger::from_parts(repr.units, repr.active)
    }
}

impl From<Ledger> for LedgerRepr {
    fn from(ledger: Ledger) -> Self {
        LedgerRepr {
            units: ledger.units,
            active: ledger.active,
        }
    }
}

fn validated_name(name: String) -> Result<String, ModelError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ModelError::validation("reporting unit name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use asipuc_common::error::{AsipucError, AsipucResult};
    use proptest::prelude::*;

    use crate::store::StoredAttendance;

    #[derive(Default)]
    struct RecordingStore {
        rows: Mutex<Vec<PersistenceRequest>>,
        reject_unit: Option<String>,
    }

    #[async_trait]
    impl AttendanceStore for RecordingStore {
        async fn append(&self, request: PersistenceRequest) -> AsipucResult<i64> {
            if request.unit_name.is_some() && request.unit_name == self.reject_unit {
                return Err(AsipucError::persistence("constraint violated"));
            }
            let mut rows = self.rows.lock().unwrap();
            rows.push(request);
            Ok(rows.len() as i64)
        }

        async fn recent(&self, _limit: usize) -> AsipucResult<Vec<StoredAttendance>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_default_ledger() {
        let ledger = Ledger::new();
        assert_eq!(ledger.units().len(), 2);
        assert_eq!(ledger.active_id(), UnitId(1));
        assert_eq!(ledger.units()[0].scheduled_time, "09:00");
        assert_eq!(ledger.units()[1].scheduled_time, "16:00");
        assert!(ledger.units().iter().all(|u| u.enabled));
    }

    #[test]
    fn test_add_unit_uses_max_plus_one() {
        let mut ledger = Ledger::new();
        ledger.remove_unit(UnitId(1)).unwrap();
        let id = ledger.add_unit("Evening", "19:00").unwrap();
        assert_eq!(id, UnitId(3));
        let id = ledger.add_default_unit().unwrap();
        assert_eq!(id, UnitId(4));
        assert_eq!(ledger.unit(id).unwrap().name, DEFAULT_UNIT_NAME);
        assert_eq!(ledger.unit(id).unwrap().scheduled_time, DEFAULT_UNIT_TIME);
    }

    #[test]
    fn test_add_unit_rejects_blank_name() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.add_unit("   ", "10:00"),
            Err(ModelError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_cannot_remove_last_unit() {
        let mut ledger = Ledger::with_units([ReportingUnit::new(UnitId(1), "Only", "10:00")]).unwrap();
        let err = ledger.remove_unit(UnitId(1)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidOperation { .. }));
        assert_eq!(ledger.units().len(), 1);
    }

    #[test]
    fn test_removing_active_reassigns_to_first() {
        let mut ledger = Ledger::new();
        let third = ledger.add_unit("Evening", "19:00").unwrap();
        ledger.set_active(third).unwrap();
        ledger.remove_unit(third).unwrap();
        assert_eq!(ledger.active_id(), UnitId(1));

        ledger.set_active(UnitId(2)).unwrap();
        ledger.remove_unit(UnitId(1)).unwrap();
        assert_eq!(ledger.active_id(), UnitId(2));
    }

    #[test]
    fn test_unknown_unit_is_not_found() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.set_active(UnitId(9)),
            Err(ModelError::UnitNotFound { id: UnitId(9) })
        ));
        assert!(ledger.toggle_enabled(UnitId(9)).is_err());
        assert!(ledger.remove_unit(UnitId(9)).is_err());
        assert!(ledger
            .update_unit(UnitId(9), UnitPatch::default())
            .is_err());
    }

    #[test]
    fn test_record_targets_active_unit() {
        let mut ledger = Ledger::new();
        ledger.set_active(UnitId(2)).unwrap();
        ledger.record(Category::Adults, "15");
        assert_eq!(ledger.unit_total(UnitId(2)).unwrap(), 15);
        assert_eq!(ledger.unit_total(UnitId(1)).unwrap(), 0);
    }

    #[test]
    fn test_update_unit_patch() {
        let mut ledger = Ledger::new();
        ledger
            .update_unit(
                UnitId(2),
                UnitPatch {
                    name: Some("Evening Service".into()),
                    scheduled_time: Some(" 19:00 ".into()),
                    enabled: Some(false),
                },
            )
            .unwrap();
        let unit = ledger.unit(UnitId(2)).unwrap();
        assert_eq!(unit.name, "Evening Service");
        assert_eq!(unit.scheduled_time, "19:00");
        assert!(!unit.enabled);
    }

    #[test]
    fn test_accumulate_skips_disabled_units() {
        let mut ledger = Ledger::new();
        ledger.record_for(UnitId(1), Category::Adults, "20").unwrap();
        ledger.record_for(UnitId(2), Category::Adults, "7").unwrap();
        ledger.record_for(UnitId(2), Category::Visitors, "1").unwrap();
        assert_eq!(ledger.accumulated_total(), 28);

        let evening = ledger.unit(UnitId(2)).unwrap().data;
        assert!(!ledger.toggle_enabled(UnitId(2)).unwrap());
        assert_eq!(ledger.accumulate().get(Category::Adults), 20);
        assert_eq!(ledger.accumulate().get(Category::Visitors), 0);
        assert_eq!(ledger.accumulated_total(), 20);
        assert_eq!(ledger.unit(UnitId(2)).unwrap().data, evening);
        assert_eq!(ledger.unit_total(UnitId(2)).unwrap(), 8);
    }

    #[test]
    fn test_add_unit_after_max_id_is_rejected() {
        let json = r#"{"units": [{"id": 4294967295, "name": "A", "scheduled_time": "09:00", "enabled": true, "data": {}}], "active": 4294967295}"#;
        let mut ledger: Ledger = serde_json::from_str(json).unwrap();
        assert!(matches!(
            ledger.add_unit("B", "10:00"),
            Err(ModelError::InvalidOperation { .. })
        ));
        assert!(matches!(
            ledger.add_default_unit(),
            Err(ModelError::InvalidOperation { .. })
        ));
        assert_eq!(ledger.units().len(), 1);
    }

    #[test]
    fn test_reset_operations() {
        let mut ledger = Ledger::new();
        ledger.record_for(UnitId(1), Category::Teens, "5").unwrap();
        ledger.record_for(UnitId(2), Category::Teens, "6").unwrap();
        ledger.reset_unit(UnitId(1)).unwrap();
        assert_eq!(ledger.unit_total(UnitId(1)).unwrap(), 0);
        assert_eq!(ledger.unit_total(UnitId(2)).unwrap(), 6);
        ledger.reset_all();
        assert_eq!(ledger.accumulated_total(), 0);
    }

    #[test]
    fn test_deserialize_rejects_broken_invariants() {
        let empty = r#"{"units": [], "active": 1}"#;
        assert!(serde_json::from_str::<Ledger>(empty).is_err());

        let dangling = r#"{"units": [{"id": 1, "name": "A", "scheduled_time": "09:00", "enabled": true}], "active": 4}"#;
        assert!(serde_json::from_str::<Ledger>(dangling).is_err());

        let duplicate = r#"{"units": [
            {"id": 1, "name": "A", "scheduled_time": "09:00", "enabled": true},
            {"id": 1, "name": "B", "scheduled_time": "10:00", "enabled": true}
        ], "active": 1}"#;
        assert!(serde_json::from_str::<Ledger>(duplicate).is_err());
    }

    #[tokio::test]
    async fn test_persist_all_stores_enabled_units_in_order() {
        let mut ledger = Ledger::new();
        ledger.add_unit("Evening", "19:00").unwrap();
        ledger.toggle_enabled(UnitId(2)).unwrap();
        ledger.record_for(UnitId(1), Category::Adults, "20").unwrap();
        ledger.record_for(UnitId(3), Category::Children, "4").unwrap();

        let store = RecordingStore::default();
        let report = ledger.persist_all(&store, at()).await;
        assert!(report.is_complete());
        assert_eq!(report.stored, vec![(UnitId(1), 1), (UnitId(3), 2)]);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows[0].unit_name.as_deref(), Some("Morning Service"));
        assert_eq!(rows[0].total, 20);
        assert_eq!(rows[0].date, "2024-03-10T12:00:00.000Z");
        assert_eq!(rows[1].unit_time.as_deref(), Some("19:00"));
        assert_eq!(rows[1].counts[&Category::Children], 4);
    }

    #[tokio::test]
    async fn test_persist_all_continues_after_failure() {
        let ledger = Ledger::new();
        let store = RecordingStore {
            reject_unit: Some("Morning Service".into()),
            ..Default::default()
        };
        let report = ledger.persist_all(&store, at()).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, UnitId(1));
        assert_eq!(report.stored, vec![(UnitId(2), 1)]);
    }

    proptest! {
        #[test]
        fn prop_ledger_never_empties(ops in proptest::collection::vec((0u8..3, 1u32..6), 0..40)) {
            let mut ledger = Ledger::new();
            for (op, id) in ops {
                match op {
                    0 => { let _ = ledger.add_default_unit(); }
                    1 => { let _ = ledger.remove_unit(UnitId(id)); }
                    _ => { let _ = ledger.set_active(UnitId(id)); }
                }
                prop_assert!(!ledger.units().is_empty());
                prop_assert!(ledger.unit(ledger.active_id()).is_some());
            }
        }

        #[test]
        fn prop_accumulate_matches_enabled_sum(
            counts in proptest::collection::vec((0usize..6, 0u32..500, any::<bool>()), 1..6)
        ) {
            let units: Vec<_> = counts
                .iter()
                .enumerate()
                .map(|(i, &(cat, value, enabled))| {
                    let mut unit = ReportingUnit::new(UnitId(i as u32 + 1), format!("U{i}"), "10:00");
                    unit.enabled = enabled;
                    unit.data.set(Category::ALL[cat], value);
                    unit
                })
                .collect();
            let mut ledger = Ledger::with_units(units).unwrap();
            let accumulated = ledger.accumulate();
            for category in Category::ALL {
                let expected: u32 = counts
                    .iter()
                    .filter(|&&(cat, _, enabled)| enabled && Category::ALL[cat] == category)
                    .map(|&(_, value, _)| value)
                    .sum();
                prop_assert_eq!(accumulated.get(category), expected);
            }
            let expected_total: u64 = counts
                .iter()
                .filter(|&&(_, _, enabled)| enabled)
                .map(|&(_, value, _)| u64::from(value))
                .sum();
            prop_assert_eq!(ledger.accumulated_total(), expected_total);

            let first = ledger.enabled_units().next().map(|u| (u.id, u.data));
            if let Some(first) = first {
                let (id, before) = first;
                ledger.toggle_enabled(id).unwrap();
                prop_assert_eq!(ledger.unit(id).unwrap().data, before);
                prop_assert_eq!(ledger.accumulated_total(), expected_total - before.total());
            }
        }
    }
}

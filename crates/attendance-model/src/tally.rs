//! Attendance categories and per-unit head counts.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Index};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Population group counted on every slide, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Seniors,
    Adults,
    YoungAdults,
    Teens,
    Children,
    Visitors,
}

impl Category {
    /// Every category in fixed display order.
    pub const ALL: [Category; 6] = [
        Category::Seniors,
        Category::Adults,
        Category::YoungAdults,
        Category::Teens,
        Category::Children,
        Category::Visitors,
    ];

    /// Stable storage key (also the database column name).
    pub fn key(self) -> &'static str {
        match self {
            Category::Seniors => "seniors",
            Category::Adults => "adults",
            Category::YoungAdults => "young_adults",
            Category::Teens => "teens",
            Category::Children => "children",
            Category::Visitors => "visitors",
        }
    }

    /// Upper-case label printed on slides.
    pub fn label(self) -> &'static str {
        match self {
            Category::Seniors => "SENIORS",
            Category::Adults => "ADULTS",
            Category::YoungAdults => "YOUNG ADULTS",
            Category::Teens => "TEENS",
            Category::Children => "CHILDREN",
            Category::Visitors => "VISITORS",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.key() == normalized)
            .ok_or_else(|| ModelError::unknown("category", s))
    }
}

/// Parse free-form input into a head count.
///
/// Reads the leading integer of `raw` (after optional whitespace and sign),
/// ignoring anything that follows it. Input without leading digits counts as
/// zero, negative numbers clamp to zero, and values beyond `u32::MAX`
/// saturate.
pub fn parse_count(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: u64 = 0;
    let mut seen_digit = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(b - b'0'))
            .min(u64::from(u32::MAX));
    }

    if !seen_digit || negative {
        return 0;
    }
    value as u32
}

/// Clamp a signed count into the valid range.
pub fn clamp_count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Head counts for one reporting unit.
///
/// The total is derived on demand and is never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Category, u32>",
    into = "BTreeMap<Category, u32>"
)]
pub struct Tally {
    counts: [u32; 6],
}

/// One slide row: a category with its label and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Row {
    pub key: &'static str,
    pub label: &'static str,
    pub value: u32,
}

impl Tally {
    /// An all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tally from explicit counts.
    pub fn from_counts(counts: impl IntoIterator<Item = (Category, u32)>) -> Self {
        let mut tally = Self::default();
        for (category, value) in counts {
            tally.set(category, value);
        }
        tally
    }

    /// Return a copy with `category` replaced by the parsed value of `raw`.
    pub fn update(&self, category: Category, raw: &str) -> Tally {
        self.with_count(category, i64::from(parse_count(raw)))
    }

    /// Return a copy with `category` replaced by the clamped `value`.
    pub fn with_count(&self, category: Category, value: i64) -> Tally {
        let mut next = *self;
        next.set(category, clamp_count(value));
        next
    }

    /// Overwrite one count in place.
    pub fn set(&mut self, category: Category, value: u32) {
        self.counts[category.index()] = value;
    }

    pub fn get(&self, category: Category) -> u32 {
        self.counts[category.index()]
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// True when every count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Rows in display order.
    pub fn to_rows(&self) -> Vec<Row> {
        Category::ALL
            .into_iter()
            .map(|category| Row {
                key: category.key(),
                label: category.label(),
                value: self.get(category),
            })
            .collect()
    }

    /// Iterate `(category, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Index<Category> for Tally {
    type Output = u32;

    fn index(&self, category: Category) -> &u32 {
        &self.counts[category.index()]
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        let mut out = self;
        for (slot, other) in out.counts.iter_mut().zip(rhs.counts) {
            *slot = slot.saturating_add(other);
        }
        out
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), Add::add)
    }
}

impl<'a> std::iter::Sum<&'a Tally> for Tally {
    fn sum<I: Iterator<Item = &'a Tally>>(iter: I) -> Tally {
        iter.copied().sum()
    }
}

impl From<BTreeMap<Category, u32>> for Tally {
    fn from(map: BTreeMap<Category, u32>) -> Self {
        Tally::from_counts(map)
    }
}

impl From<Tally> for BTreeMap<Category, u32> {
    fn from(tally: Tally) -> Self {
        tally.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_count_prefix_rules() {
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count("  7"), 7);
        assert_eq!(parse_count("12abc"), 12);
        assert_eq!(parse_count("3.7"), 3);
        assert_eq!(parse_count("+4"), 4);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-"), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("99999999999999"), u32::MAX);
    }

    #[test]
    fn test_update_clamps_negative_and_garbage() {
        let tally = Tally::new().update(Category::Adults, "20");
        assert_eq!(tally.get(Category::Adults), 20);

        let tally = tally.update(Category::Adults, "-3");
        assert_eq!(tally.get(Category::Adults), 0);

        let tally = tally.update(Category::Teens, "lots");
        assert_eq!(tally.get(Category::Teens), 0);
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn test_update_is_pure() {
        let base = Tally::new().update(Category::Children, "10");
        let next = base.update(Category::Children, "11");
        assert_eq!(base.get(Category::Children), 10);
        assert_eq!(next.get(Category::Children), 11);
    }

    #[test]
    fn test_rows_follow_display_order() {
        let tally = Tally::from_counts([(Category::Visitors, 2), (Category::Seniors, 3)]);
        let rows = tally.to_rows();
        let keys: Vec<_> = rows.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            vec!["seniors", "adults", "young_adults", "teens", "children", "visitors"]
        );
        assert_eq!(rows[0].value, 3);
        assert_eq!(rows[5].value, 2);
        assert_eq!(rows[2].label, "YOUNG ADULTS");
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("young_adults".parse::<Category>().unwrap(), Category::YoungAdults);
        assert_eq!("Young Adults".parse::<Category>().unwrap(), Category::YoungAdults);
        assert_eq!("teens".parse::<Category>().unwrap(), Category::Teens);
        assert!("elders".parse::<Category>().is_err());
    }

    #[test]
    fn test_serde_as_keyed_map() {
        let tally = Tally::from_counts([(Category::Adults, 20), (Category::YoungAdults, 8)]);
        let json = serde_json::to_value(tally).unwrap();
        assert_eq!(json["adults"], 20);
        assert_eq!(json["young_adults"], 8);
        assert_eq!(json["visitors"], 0);

        let parsed: Tally = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, tally);
    }

    #[test]
    fn test_missing_keys_deserialize_as_zero() {
        let parsed: Tally = serde_json::from_str(r#"{"children": 4}"#).unwrap();
        assert_eq!(parsed.get(Category::Children), 4);
        assert_eq!(parsed.total(), 4);
    }

    fn arb_tally() -> impl Strategy<Value = Tally> {
        proptest::array::uniform6(0u32..1_000_000).prop_map(|counts| {
            Tally::from_counts(Category::ALL.into_iter().zip(counts))
        })
    }

    proptest! {
        #[test]
        fn prop_total_equals_sum_after_any_update(
            tally in arb_tally(),
            idx in 0usize..6,
            raw in "[ +-]?[0-9a-z.]{0,12}",
        ) {
            let updated = tally.update(Category::ALL[idx], &raw);
            let expected: u64 = Category::ALL
                .iter()
                .map(|&c| u64::from(updated.get(c)))
                .sum();
            prop_assert_eq!(updated.total(), expected);
        }

        #[test]
        fn prop_sum_is_per_category(a in arb_tally(), b in arb_tally()) {
            let sum = a + b;
            for c in Category::ALL {
                prop_assert_eq!(sum.get(c), a.get(c) + b.get(c));
            }
            prop_assert_eq!(sum.total(), a.total() + b.total());
        }
    }
}

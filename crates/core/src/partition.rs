//! Day partitions: the storage bucket for events, invocations, and run records.
//!
//! The partition key is the UTC calendar date of a record's creation.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A UTC calendar date identifying one storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(NaiveDate);

impl PartitionKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The partition for the current UTC date.
    pub fn today() -> Self {
        Self::of(&Utc::now())
    }

    /// The partition an instant falls into.
    pub fn of(at: &DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Compact `YYYYMMDD` form, used for `%Y%m%d` path substitution.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Every partition overlapping `[from, to]`, oldest first.
    ///
    /// Returns an empty list when `from` is after `to`.
    pub fn covering(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Self> {
        let mut keys = Vec::new();
        let mut day = from.date_naive();
        let last = to.date_naive();
        while day <= last {
            keys.push(Self(day));
            day += Duration::days(1);
        }
        keys
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for PartitionKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn displays_as_iso_date() {
        let key = PartitionKey::of(&at(2026, 3, 7, 23));
        assert_eq!(key.to_string(), "2026-03-07");
        assert_eq!(key.compact(), "20260307");
        assert_eq!("2026-03-07".parse::<PartitionKey>().unwrap(), key);
    }

    #[test]
    fn covering_spans_midnight() {
        let keys = PartitionKey::covering(at(2026, 3, 6, 22), at(2026, 3, 7, 2));
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].to_string(), "2026-03-06");
        assert_eq!(keys[1].to_string(), "2026-03-07");
    }

    #[test]
    fn covering_same_day_is_single_partition() {
        let keys = PartitionKey::covering(at(2026, 3, 7, 1), at(2026, 3, 7, 20));
        assert_eq!(keys, vec![PartitionKey::of(&at(2026, 3, 7, 0))]);
    }

    #[test]
    fn covering_inverted_range_is_empty() {
        assert!(PartitionKey::covering(at(2026, 3, 8, 0), at(2026, 3, 7, 0)).is_empty());
    }
}

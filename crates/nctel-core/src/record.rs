// ── Time-series records ──
//
// `RecordGrouper` collects (measurement, tags, timestamp, field) tuples
// emitted while walking one payload and merges them into one `Record` per
// distinct series point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use nctel_api::Value;

use crate::error::CoreError;

/// One time-series point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub measurement: String,
    /// Always contains `source`.
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    measurement: String,
    tags: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
}

/// Merges fields per (measurement, tag set, timestamp).
///
/// Records come out in the order their series was first seen. Within a
/// series, a later write to the same field key replaces the earlier one.
#[derive(Debug, Default)]
pub struct RecordGrouper {
    series: IndexMap<SeriesKey, BTreeMap<String, Value>>,
}

impl RecordGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one field to the series identified by `measurement`, `tags`
    /// and `timestamp`.
    ///
    /// Fails for values that cannot be stored as a field.
    pub fn add(
        &mut self,
        measurement: &str,
        tags: &BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
        field_key: &str,
        value: Value,
    ) -> Result<(), CoreError> {
        if let Value::Binary(_) = value {
            return Err(CoreError::UnsupportedValue {
                leaf: field_key.to_owned(),
                value_type: value.type_name(),
            });
        }

        let key = SeriesKey {
            measurement: measurement.to_owned(),
            tags: tags.clone(),
            timestamp,
        };
        self.series
            .entry(key)
            .or_default()
            .insert(field_key.to_owned(), value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Finalize into records.
    pub fn records(self) -> Vec<Record> {
        self.series
            .into_iter()
            .map(|(key, fields)| Record {
                measurement: key.measurement,
                tags: key.tags,
                fields,
                timestamp: key.timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn distinct_fields_merge_into_one_record() {
        let mut grouper = RecordGrouper::new();
        let t = tags(&[("source", "r1")]);
        grouper.add("cpu", &t, ts(), "user", Value::Int64(3)).unwrap();
        grouper.add("cpu", &t, ts(), "system", Value::Int64(5)).unwrap();

        let records = grouper.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.len(), 2);
        assert_eq!(records[0].fields["user"], Value::Int64(3));
        assert_eq!(records[0].fields["system"], Value::Int64(5));
    }

    #[test]
    fn later_write_wins() {
        let mut grouper = RecordGrouper::new();
        let t = tags(&[("source", "r1")]);
        grouper.add("cpu", &t, ts(), "user", Value::Int64(3)).unwrap();
        grouper.add("cpu", &t, ts(), "user", Value::Int64(9)).unwrap();

        let records = grouper.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["user"], Value::Int64(9));
    }

    #[test]
    fn different_tags_split_records() {
        let mut grouper = RecordGrouper::new();
        grouper
            .add("if", &tags(&[("name", "a")]), ts(), "mtu", Value::Int64(1500))
            .unwrap();
        grouper
            .add("if", &tags(&[("name", "b")]), ts(), "mtu", Value::Int64(9000))
            .unwrap();

        let records = grouper.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tags["name"], "a");
        assert_eq!(records[1].tags["name"], "b");
    }

    #[test]
    fn binary_values_are_rejected() {
        let mut grouper = RecordGrouper::new();
        let err = grouper
            .add("if", &BTreeMap::new(), ts(), "blob", Value::Binary(vec![0xde, 0xad]))
            .unwrap_err();
        assert!(err.to_string().contains("blob"));
        assert!(grouper.is_empty());
    }
}

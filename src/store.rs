use crate::model::EventRecord;
use std::collections::HashMap;

/// Result of a bulk upsert: how many ids were new and how many replaced
/// an existing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub replaced: usize,
}

/// Canonical, deduplicated set of events. Single source of truth: both the
/// snapshot poller and the live feed write here, and every view derives
/// from here. Later arrival under the same id wins, whichever transport it
/// came from.
#[derive(Debug, Default)]
pub struct EventStore {
    events: HashMap<String, EventRecord>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one record. Returns true when the id was not
    /// present before.
    pub fn upsert_one(&mut self, record: EventRecord) -> bool {
        self.events.insert(record.id.clone(), record).is_none()
    }

    /// Apply a snapshot batch. Additive: records absent from the batch are
    /// kept untouched.
    pub fn upsert_many(&mut self, records: impl IntoIterator<Item = EventRecord>) -> UpsertSummary {
        let mut summary = UpsertSummary::default();
        for record in records {
            if self.upsert_one(record) {
                summary.inserted += 1;
            } else {
                summary.replaced += 1;
            }
        }
        summary
    }

    pub fn get(&self, id: &str) -> Option<&EventRecord> {
        self.events.get(id)
    }

    /// Iteration order is not meaningful; consumers sort by time.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStatus;
    use chrono::{TimeZone, Utc};

    fn make_event(id: &str, magnitude: f64) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            place: "Test Region".to_string(),
            latitude: 10.0,
            longitude: 20.0,
            magnitude,
            depth: 12.0,
            time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            status: EventStatus::Safe,
        }
    }

    #[test]
    fn test_upsert_one_reports_new_vs_replace() {
        let mut store = EventStore::new();
        assert!(store.upsert_one(make_event("a", 1.0)));
        assert!(!store.upsert_one(make_event("a", 2.0)));
        assert_eq!(store.len(), 1);
        // Later arrival wins
        assert_eq!(store.get("a").unwrap().magnitude, 2.0);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        // Applying the same record twice leaves a single copy with identical state
        let mut store = EventStore::new();
        store.upsert_one(make_event("a", 3.0));
        let before = store.get("a").cloned();
        store.upsert_one(make_event("a", 3.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").cloned(), before);
    }

    #[test]
    fn test_upsert_many_is_additive() {
        let mut store = EventStore::new();
        store.upsert_many(vec![make_event("a", 1.0), make_event("b", 2.0)]);
        // A later snapshot that no longer contains "a" must not remove it
        let summary = store.upsert_many(vec![make_event("b", 2.5), make_event("c", 3.0)]);
        assert_eq!(summary, UpsertSummary { inserted: 1, replaced: 1 });
        assert_eq!(store.len(), 3);
        assert!(store.get("a").is_some());
        assert_eq!(store.get("b").unwrap().magnitude, 2.5);
    }

    #[test]
    fn test_snapshot_and_live_converge_in_either_order() {
        // Same final state whether the live event lands before or after the snapshot
        let snapshot = vec![make_event("a", 1.0), make_event("b", 2.0)];
        let live = make_event("c", 4.0);

        let mut first = EventStore::new();
        first.upsert_many(snapshot.clone());
        first.upsert_one(live.clone());

        let mut second = EventStore::new();
        second.upsert_one(live);
        second.upsert_many(snapshot);

        let mut left: Vec<_> = first.iter().cloned().collect();
        let mut right: Vec<_> = second.iter().cloned().collect();
        left.sort_by(|a, b| a.id.cmp(&b.id));
        right.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(left, right);
    }
}

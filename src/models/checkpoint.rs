//! Checkpoint state persisted between crawl runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DateRange;

/// Major schema version written by this build.
///
/// Minor additions are new `#[serde(default)]` fields and keep this number.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// Stable identity of an article, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pagination progress for one query term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryCursor {
    /// Window the cursor was recorded against
    pub window: DateRange,
    /// Next page to request when resuming this window
    pub next_page: u32,
    /// Source reported no further results for this window
    #[serde(default)]
    pub exhausted: bool,
}

/// Durable record of crawl progress and seen-article identities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointState {
    pub schema_version: u32,

    /// Seen fingerprints mapped to the article's publication time
    #[serde(default)]
    seen: HashMap<Fingerprint, DateTime<Utc>>,

    /// Window of the last committed run
    #[serde(default)]
    pub last_window: Option<DateRange>,

    /// Per query term pagination cursors
    #[serde(default)]
    pub cursors: BTreeMap<String, QueryCursor>,

    /// Completion time of the last committed run
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,

    /// Articles ever accepted, including those since pruned
    #[serde(default)]
    pub total_seen: u64,
}

impl Default for CheckpointState {
    fn default() -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            seen: HashMap::new(),
            last_window: None,
            cursors: BTreeMap::new(),
            last_run: None,
            total_seen: 0,
        }
    }
}

impl CheckpointState {
    /// Empty state for a first run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a fingerprint has been seen.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains_key(fingerprint)
    }

    /// Mark a fingerprint as seen. Returns `false` if it already was.
    pub fn insert(&mut self, fingerprint: Fingerprint, published_at: DateTime<Utc>) -> bool {
        use std::collections::hash_map::Entry;

        match self.seen.entry(fingerprint) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(published_at);
                self.total_seen += 1;
                true
            }
        }
    }

    /// Number of seen fingerprints.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Drop fingerprints of articles published before `cutoff`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, published| *published >= cutoff);
        before - self.seen.len()
    }

    /// Cursor for a query term, if one was recorded.
    pub fn cursor(&self, term: &str) -> Option<&QueryCursor> {
        self.cursors.get(term)
    }

    /// Record pagination progress for a query term.
    pub fn set_cursor(&mut self, term: impl Into<String>, cursor: QueryCursor) {
        self.cursors.insert(term.into(), cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut state = CheckpointState::new();
        let fp = Fingerprint::new("abc");
        assert!(!state.contains(&fp));
        assert!(state.insert(fp.clone(), ts(10)));
        assert!(state.contains(&fp));
        assert!(!state.insert(fp, ts(11)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_prune_before_cutoff() {
        let mut state = CheckpointState::new();
        state.insert(Fingerprint::new("old"), ts(1));
        state.insert(Fingerprint::new("new"), ts(15));

        let removed = state.prune_before(ts(10));
        assert_eq!(removed, 1);
        assert_eq!(state.total_seen, 2);
        assert!(!state.contains(&Fingerprint::new("old")));
        assert!(state.contains(&Fingerprint::new("new")));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "schema_version": 1,
            "seen": {"abc": "2026-10-18T09:30:00Z"},
            "future_field": {"anything": true}
        }"#;
        let state: CheckpointState = serde_json::from_str(json).unwrap();
        assert!(state.contains(&Fingerprint::new("abc")));
        assert!(state.cursors.is_empty());
    }

    #[test]
    fn test_cursor_roundtrip_through_state() {
        let mut state = CheckpointState::new();
        let window = DateRange {
            from: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };
        state.set_cursor(
            "finance",
            QueryCursor {
                window,
                next_page: 3,
                exhausted: false,
            },
        );

        let json = serde_json::to_string(&state).unwrap();
        let back: CheckpointState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cursor("finance").map(|c| c.next_page), Some(3));
    }
}

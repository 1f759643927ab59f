//! Shared types for logscan
//!
//! This crate contains the value types passed between the ingest engine and
//! the reporting side: parsed records, the frozen counter snapshot and the
//! ranked top-K lists derived from it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

// ============================================================================
// Record
// ============================================================================

/// One structurally and semantically valid log line.
///
/// Fields borrow from the line they were parsed from. A record lives only
/// long enough for its counters to be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record<'a> {
    /// Parsed instant (always UTC)
    pub timestamp: DateTime<Utc>,

    /// Level token, case preserved
    pub level: &'a str,

    /// Emitting component
    pub source: &'a str,

    /// Free-text remainder of the line
    pub message: &'a str,
}

impl<'a> Record<'a> {
    pub fn new(timestamp: DateTime<Utc>, level: &'a str, source: &'a str, message: &'a str) -> Self {
        Self {
            timestamp,
            level,
            source,
            message,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable read of every aggregation counter, taken after ingestion
/// has fully completed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Every line read, parsed or not
    pub total_lines: u64,

    /// Level token -> count
    pub level_counts: BTreeMap<String, u64>,

    /// Source token -> count
    pub source_counts: BTreeMap<String, u64>,

    /// Normalized message template -> count
    pub message_counts: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Lines that produced a record
    pub fn parsed_lines(&self) -> u64 {
        self.level_counts.values().sum()
    }

    /// Lines counted in `total_lines` that did not parse
    pub fn unparsed_lines(&self) -> u64 {
        self.total_lines.saturating_sub(self.parsed_lines())
    }

    pub fn top_sources(&self, k: usize) -> Vec<RankedEntry> {
        top_k(&self.source_counts, k)
    }

    pub fn top_messages(&self, k: usize) -> Vec<RankedEntry> {
        top_k(&self.message_counts, k)
    }

    /// All levels, highest count first
    pub fn levels_ranked(&self) -> Vec<RankedEntry> {
        top_k(&self.level_counts, self.level_counts.len())
    }
}

// ============================================================================
// Top-K
// ============================================================================

/// A key with its count, as returned by [`top_k`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Heap candidate; "greater" means ranked higher.
#[derive(PartialEq, Eq)]
struct Candidate<'a> {
    count: u64,
    key: &'a str,
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal counts: the smaller key wins
        self.count
            .cmp(&other.count)
            .then_with(|| other.key.cmp(self.key))
    }
}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Return the `min(k, counts.len())` highest counts, count descending.
///
/// Equal counts are ordered by key ascending (byte order), so the result is
/// fully deterministic.
pub fn top_k(counts: &BTreeMap<String, u64>, k: usize) -> Vec<RankedEntry> {
    if k == 0 {
        return Vec::new();
    }

    // Min-heap of the best k seen so far; the root is the weakest candidate
    let mut heap = BinaryHeap::with_capacity(k.min(counts.len()) + 1);
    for (key, &count) in counts {
        heap.push(Reverse(Candidate { count, key }));
        if heap.len() > k {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(c)| RankedEntry::new(c.key, c.count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_top_k_orders_by_count_then_key() {
        let map = counts(&[("gamma", 3), ("beta", 5), ("alpha", 3)]);
        let top = top_k(&map, 2);
        assert_eq!(
            top,
            vec![RankedEntry::new("beta", 5), RankedEntry::new("alpha", 3)]
        );
    }

    #[test]
    fn test_top_k_shorter_than_k() {
        let map = counts(&[("a", 1), ("b", 2)]);
        let top = top_k(&map, 10);
        assert_eq!(top, vec![RankedEntry::new("b", 2), RankedEntry::new("a", 1)]);
    }

    #[test]
    fn test_top_k_zero_and_empty() {
        let map = counts(&[("a", 1)]);
        assert!(top_k(&map, 0).is_empty());
        assert!(top_k(&BTreeMap::new(), 3).is_empty());
    }

    #[test]
    fn test_top_k_matches_full_sort() {
        let map: BTreeMap<String, u64> = (0..200u64)
            .map(|i| (format!("key-{i:03}"), (i * 7919) % 13))
            .collect();

        let mut expected: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        expected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        expected.truncate(25);

        let actual: Vec<_> = top_k(&map, 25).into_iter().map(|e| (e.key, e.count)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_snapshot_derived_counts() {
        let snapshot = Snapshot {
            total_lines: 10,
            level_counts: counts(&[("INFO", 4), ("ERROR", 3)]),
            source_counts: counts(&[("auth", 7)]),
            message_counts: counts(&[("ok", 7)]),
        };
        assert_eq!(snapshot.parsed_lines(), 7);
        assert_eq!(snapshot.unparsed_lines(), 3);
        assert_eq!(snapshot.levels_ranked()[0], RankedEntry::new("INFO", 4));
    }

    #[test]
    fn test_snapshot_serializes_sorted_maps() {
        let snapshot = Snapshot {
            total_lines: 2,
            level_counts: counts(&[("WARN", 1), ("INFO", 1)]),
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""level_counts":{"INFO":1,"WARN":1}"#));
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use logscan_types::Snapshot;

/// Counters keyed by string, created lazily on first use.
///
/// Existing keys are bumped under the shared read lock with an atomic add;
/// only a first-seen key takes the write lock.
#[derive(Default)]
struct KeyedCounts {
    counts: RwLock<HashMap<String, AtomicU64>>,
}

impl KeyedCounts {
    fn increment(&self, key: &str) {
        // Fast path: key already present
        {
            let counts = self.counts.read();
            if let Some(counter) = counts.get(key) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        // Another writer may have inserted the key between the two locks,
        // so go through entry() rather than insert()
        let mut counts = self.counts.write();
        counts
            .entry(key.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    fn to_map(&self) -> BTreeMap<String, u64> {
        self.counts
            .read()
            .iter()
            .map(|(key, counter)| (key.clone(), counter.load(Ordering::Relaxed)))
            .collect()
    }

    fn len(&self) -> usize {
        self.counts.read().len()
    }
}

/// Shared counters for one ingest run.
///
/// Written concurrently by file workers during ingestion; read through
/// [`AggregationStore::snapshot`] once every worker has been joined.
#[derive(Default)]
pub struct AggregationStore {
    total_lines: AtomicU64,
    levels: KeyedCounts,
    sources: KeyedCounts,
    messages: KeyedCounts,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one line read, parsed or not
    pub fn record_line(&self) {
        self.total_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one parsed record under its level, source and message template
    pub fn record_parsed(&self, level: &str, source: &str, normalized_message: &str) {
        self.levels.increment(level);
        self.sources.increment(source);
        self.messages.increment(normalized_message);
    }

    /// Lines counted so far (lock-free, for progress diagnostics)
    pub fn total_lines(&self) -> u64 {
        self.total_lines.load(Ordering::Relaxed)
    }

    /// Immutable copy of every counter.
    ///
    /// Only meaningful once no writers are in flight; the coordinator calls
    /// this after joining every worker task.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total_lines: self.total_lines.load(Ordering::Relaxed),
            level_counts: self.levels.to_map(),
            source_counts: self.sources.to_map(),
            message_counts: self.messages.to_map(),
        }
    }
}

impl std::fmt::Debug for AggregationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationStore")
            .field("total_lines", &self.total_lines())
            .field("levels", &self.levels.len())
            .field("sources", &self.sources.len())
            .field("messages", &self.messages.len())
            .finish()
    }
}

use super::compact::{compact, CompactionStats, DeltaMerge};
use super::entry::{LogEntry, SnapshotBatch};
use crate::config::SnapshotConfig;

/// In-memory history of plaintext log entries
///
/// Once `threshold` entries have arrived since the last snapshot, the whole
/// history is compacted into a new snapshot and every surviving entry is
/// marked as a snapshot member.
#[derive(Debug, Clone)]
pub struct History {
    threshold: usize,
    entries: Vec<LogEntry>,
    pending: usize,
}

impl History {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            threshold: config.threshold.max(1),
            entries: Vec::new(),
            pending: 0,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended since the last snapshot
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Append an entry, snapshotting if the threshold is reached
    pub fn push<M: DeltaMerge + ?Sized>(
        &mut self,
        entry: LogEntry,
        merger: &mut M,
    ) -> Option<CompactionStats> {
        self.entries.push(entry);
        self.pending += 1;
        if self.pending < self.threshold {
            return None;
        }
        Some(self.snapshot(merger))
    }

    /// Compact the whole history now
    pub fn snapshot<M: DeltaMerge + ?Sized>(&mut self, merger: &mut M) -> CompactionStats {
        let mut batch = SnapshotBatch::new(std::mem::take(&mut self.entries));
        let stats = compact(&mut batch, merger);
        self.entries = batch.into_entries();
        for entry in &mut self.entries {
            entry.is_snapshot = true;
        }
        self.pending = 0;
        tracing::info!(
            entries = self.entries.len(),
            removed = stats.removed,
            "took history snapshot"
        );
        stats
    }
}

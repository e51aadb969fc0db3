use crate::wire::Name;

/// One element of the replicated publication log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub producer: Name,
    pub boot_time: u64,
    pub seq: u64,
    /// `None` marks an entry removed by compaction
    pub content: Option<Vec<u8>>,
    pub is_snapshot: bool,
}

impl LogEntry {
    pub fn new(producer: Name, boot_time: u64, seq: u64, content: Vec<u8>) -> Self {
        Self {
            producer,
            boot_time,
            seq,
            content: Some(content),
            is_snapshot: false,
        }
    }
}

/// Ordered entries handed to compaction when the log checkpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotBatch {
    entries: Vec<LogEntry>,
}

impl SnapshotBatch {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<LogEntry> {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl From<Vec<LogEntry>> for SnapshotBatch {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self::new(entries)
    }
}

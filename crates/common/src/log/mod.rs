//! Publication log entries: sealing, opening and snapshot compaction

mod compact;
mod entry;
mod history;
mod publisher;

pub use compact::{compact, CompactionStats, DeltaMerge};
pub use entry::{LogEntry, SnapshotBatch};
pub use history::History;
pub use publisher::{open_entry, LogError, LogPublisher};

//! Snapshot compaction
//!
//! Every delta for a document collapses into a single entry holding the
//! merged delta, placed where that document's *last* delta was. Entries that
//! are not deltas keep their content and relative order.

use std::collections::HashMap;

use super::entry::SnapshotBatch;
use crate::wire::{Delta, Message};

/// Document-specific reduction of an ordered list of deltas
///
/// Replay equivalence depends on the merge being associative over ordered
/// delta sequences.
pub trait DeltaMerge {
    fn merge(&mut self, uuid: &str, deltas: Vec<Vec<u8>>) -> Vec<u8>;
}

impl<F> DeltaMerge for F
where
    F: FnMut(&str, Vec<Vec<u8>>) -> Vec<u8>,
{
    fn merge(&mut self, uuid: &str, deltas: Vec<Vec<u8>>) -> Vec<u8> {
        self(uuid, deltas)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Entries whose content could not be parsed
    pub skipped: usize,
    /// Documents whose deltas were merged
    pub documents: usize,
    /// Entries dropped from the batch
    pub removed: usize,
}

struct Document {
    deltas: Vec<Vec<u8>>,
    last: usize,
}

/// Merge same-document deltas in `batch` in place
pub fn compact<M: DeltaMerge + ?Sized>(batch: &mut SnapshotBatch, merger: &mut M) -> CompactionStats {
    let entries = batch.entries_mut();
    let before = entries.len();
    let mut stats = CompactionStats::default();

    // first-seen order, so merges run deterministically
    let mut order: Vec<String> = Vec::new();
    let mut documents: HashMap<String, Document> = HashMap::new();

    for (index, entry) in entries.iter_mut().enumerate() {
        let Some(content) = entry.content.as_deref() else {
            continue;
        };
        let message = match Message::decode(content, true) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    producer = %entry.producer,
                    seq = entry.seq,
                    "failed to parse snapshot entry: {}",
                    e
                );
                stats.skipped += 1;
                continue;
            }
        };
        let Message::Delta(Delta { uuid, binary }) = message else {
            continue;
        };

        let document = documents.entry(uuid.clone()).or_insert_with(|| {
            order.push(uuid);
            Document {
                deltas: Vec::new(),
                last: index,
            }
        });
        document.deltas.push(binary);
        document.last = index;
        entry.content = None;
    }

    for uuid in order {
        let Some(document) = documents.remove(&uuid) else {
            continue;
        };
        let merged = merger.merge(&uuid, document.deltas);
        let message = Message::Delta(Delta {
            uuid,
            binary: merged,
        });
        entries[document.last].content = Some(message.encode());
        stats.documents += 1;
    }

    entries.retain(|entry| entry.content.is_some());
    stats.removed = before - entries.len();
    tracing::debug!(
        before,
        after = entries.len(),
        documents = stats.documents,
        skipped = stats.skipped,
        "compacted snapshot"
    );
    stats
}

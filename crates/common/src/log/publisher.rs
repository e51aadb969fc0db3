use tokio::sync::Mutex;

use super::entry::LogEntry;
use crate::crypto::{CipherError, ContentCipher};
use crate::wire::{Message, Name, WireError};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("malformed entry: {0}")]
    Wire(#[from] WireError),
}

/// Publishes sealed messages for one producer
///
/// The sequence counter is held across sealing, so concurrent publishers
/// sharing this handle never seal two entries under the same nonce.
#[derive(Debug)]
pub struct LogPublisher {
    producer: Name,
    boot_time: u64,
    cipher: ContentCipher,
    seq: Mutex<u64>,
}

impl LogPublisher {
    pub fn new(producer: Name, boot_time: u64, cipher: ContentCipher) -> Self {
        Self::resume(producer, boot_time, cipher, 0)
    }

    /// Continue a producer's log after `last_seq`
    pub fn resume(producer: Name, boot_time: u64, cipher: ContentCipher, last_seq: u64) -> Self {
        Self {
            producer,
            boot_time,
            cipher,
            seq: Mutex::new(last_seq),
        }
    }

    pub fn producer(&self) -> &Name {
        &self.producer
    }

    pub async fn last_seq(&self) -> u64 {
        *self.seq.lock().await
    }

    /// Seal `message` as the producer's next entry
    ///
    /// A sequence number is consumed only when sealing succeeds.
    pub async fn publish(&self, message: &Message) -> Result<LogEntry, LogError> {
        let plaintext = message.encode();
        let mut seq = self.seq.lock().await;
        let next = *seq + 1;
        let sealed = self.cipher.seal(next, &plaintext)?;
        *seq = next;
        drop(seq);

        tracing::debug!(producer = %self.producer, seq = next, "published entry");
        Ok(LogEntry::new(self.producer.clone(), self.boot_time, next, sealed))
    }
}

/// Decrypt and parse a received entry
///
/// Returns `None` for entries removed by compaction.
pub fn open_entry(cipher: &ContentCipher, entry: &LogEntry) -> Result<Option<Message>, LogError> {
    let Some(content) = entry.content.as_deref() else {
        return Ok(None);
    };
    let plaintext = cipher.open(content)?;
    Ok(Some(Message::decode(&plaintext, true)?))
}

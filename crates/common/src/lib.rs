/**
 * Cryptographic types and operations.
 *  - Identity keys and signatures
 *  - X25519 key agreement and content key wrapping
 *  - AEAD sealing of log entries
 */
pub mod crypto;
/**
 * Settings for key distribution and log snapshots,
 *  loadable from TOML.
 */
pub mod config;
/**
 * Content key (DSK) request/response exchange
 *  between workspace members.
 */
pub mod dsk;
/**
 * Publication log entries, sequence-disciplined
 *  publishing and snapshot compaction.
 */
pub mod log;
/**
 * Request/reply faces, interest routing and
 *  the iroh transport that carries them.
 */
pub mod net;
/**
 * In-process multi-member harness for tests.
 */
pub mod testkit;
/**
 * Binary TLV encodings shared with deployed peers.
 */
pub mod wire;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crypto::{ContentCipher, ContentKey, ContentKeySlot, PublicKey, SecretKey};
    pub use crate::dsk::{DistributionError, DskDistributor, ResponderOutcome};
    pub use crate::log::{compact, History, LogEntry, LogPublisher, SnapshotBatch};
    pub use crate::net::{Face, InterestRouter};
    pub use crate::wire::{Message, Name};
}

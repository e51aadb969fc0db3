//! Cryptographic primitives for Ownly workspaces
//!
//! - **Identity**: Ed25519 keypairs (`SecretKey`/`PublicKey`) identify members
//!   and sign DSK responses
//! - **Content encryption**: every log entry is sealed with AES-256-GCM under
//!   the shared workspace [`ContentKey`], using a deterministic per-entry nonce
//! - **Key distribution**: the content key travels between members wrapped
//!   under a key derived from an ephemeral X25519 exchange
//!
//! # Key distribution
//!
//! A member that lacks the content key:
//! 1. Generates an [`EphemeralKeyPair`] and publishes its public half in a request
//! 2. A member holding the key generates its own ephemeral pair
//! 3. Both sides run X25519 + HKDF-SHA256 ([`derive_shared_key`])
//! 4. The responder enciphers the content key block by block ([`wrap`])
//! 5. The requester reverses it with the same derived key ([`unwrap`])
//!
//! The wrapped key carries no integrity tag of its own; the response entry is
//! signed by the responder's identity key.

mod agreement;
mod cipher;
mod content_key;
mod keys;
mod wrap;

pub use agreement::{
    derive_shared_key, EphemeralKeyPair, KeyAgreementError, KeySize, SharedKey, X25519_KEY_SIZE,
};
pub use cipher::{nonce, open, seal, CipherError, ContentCipher, NONCE_SIZE};
pub use content_key::{ContentKey, ContentKeyError, ContentKeySlot, CONTENT_KEY_SIZE};
pub use ed25519_dalek::Signature;
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use wrap::{unwrap, wrap, KeyWrapError, BLOCK_SIZE};

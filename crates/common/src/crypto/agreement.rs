//! X25519 key agreement
//!
//! Both sides of a DSK exchange generate a fresh [`EphemeralKeyPair`], swap
//! public keys, and run [`derive_shared_key`]:
//!
//! ```text
//! ss  = X25519(local_private, peer_public)
//! key = HKDF-SHA256(ikm = ss, salt = none, info = none)[..key_size]
//! ```
//!
//! so that `derive(a.private, b.public) == derive(b.private, a.public)`.

use std::fmt;

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// Size of an X25519 public or private key in bytes
pub const X25519_KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyAgreementError {
    #[error("invalid {what} size, expected {expected}, got {actual}")]
    InvalidKeySize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("key agreement produced an all-zero shared secret")]
    NonContributory,
    #[error("hkdf expand failed: {0}")]
    Hkdf(String),
    #[error("failed to generate ephemeral key: {0}")]
    Random(String),
}

/// Length of the symmetric key read out of HKDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum KeySize {
    /// AES-128, used by deployed DSK exchanges
    #[default]
    Aes128,
    Aes256,
}

impl KeySize {
    pub fn byte_len(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes256 => 32,
        }
    }
}

impl TryFrom<usize> for KeySize {
    type Error = String;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            16 => Ok(KeySize::Aes128),
            32 => Ok(KeySize::Aes256),
            other => Err(format!("unsupported key size {other}, expected 16 or 32")),
        }
    }
}

impl From<KeySize> for usize {
    fn from(size: KeySize) -> Self {
        size.byte_len()
    }
}

/// Symmetric key derived from a key agreement
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey(pub(crate) Vec<u8>);

impl SharedKey {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedKey({} bytes)", self.0.len())
    }
}

/// Single-use X25519 key pair for one distribution attempt
pub struct EphemeralKeyPair {
    private: StaticSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Result<Self, KeyAgreementError> {
        let mut seed = [0u8; X25519_KEY_SIZE];
        getrandom::getrandom(&mut seed).map_err(|e| KeyAgreementError::Random(e.to_string()))?;
        Ok(Self::from_private_bytes(seed))
    }

    /// Rebuild a key pair from a stored private key
    pub fn from_private(private: &[u8]) -> Result<Self, KeyAgreementError> {
        Ok(Self::from_private_bytes(key_bytes(private, "private key")?))
    }

    fn from_private_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        let private = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&private);
        Self { private, public }
    }

    pub fn public_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        self.public.to_bytes()
    }

    pub fn private_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        self.private.to_bytes()
    }

    /// Derive the key shared with the holder of `peer_public`
    pub fn derive(&self, peer_public: &[u8], size: KeySize) -> Result<SharedKey, KeyAgreementError> {
        derive_with(&self.private, peer_public, size)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Derive a symmetric key from raw X25519 key material
pub fn derive_shared_key(
    local_private: &[u8],
    peer_public: &[u8],
    size: KeySize,
) -> Result<SharedKey, KeyAgreementError> {
    let private = StaticSecret::from(key_bytes(local_private, "private key")?);
    derive_with(&private, peer_public, size)
}

fn derive_with(
    private: &StaticSecret,
    peer_public: &[u8],
    size: KeySize,
) -> Result<SharedKey, KeyAgreementError> {
    let peer = X25519PublicKey::from(key_bytes(peer_public, "public key")?);
    let shared = private.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(KeyAgreementError::NonContributory);
    }

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = vec![0u8; size.byte_len()];
    hkdf.expand(&[], &mut okm)
        .map_err(|e| KeyAgreementError::Hkdf(e.to_string()))?;
    Ok(SharedKey(okm))
}

fn key_bytes(bytes: &[u8], what: &'static str) -> Result<[u8; X25519_KEY_SIZE], KeyAgreementError> {
    bytes
        .try_into()
        .map_err(|_| KeyAgreementError::InvalidKeySize {
            what,
            expected: X25519_KEY_SIZE,
            actual: bytes.len(),
        })
}

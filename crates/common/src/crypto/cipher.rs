//! Log entry encryption using AES-256-GCM
//!
//! Each published message is sealed under the workspace content key and
//! carried as a [`Message::AeadBlock`]. The nonce is not random: it is built
//! from a per-producer base value and the entry's sequence number,
//!
//! ```text
//! nonce[0..4)  = (base as u32).to_be_bytes()
//! nonce[4..12) = (base + seq).to_be_bytes()
//! ```
//!
//! so a (base, seq) pair must never be sealed twice under the same key.
//! [`crate::log::LogPublisher`] owns the counter that guarantees this.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::content_key::{ContentKey, ContentKeySlot};
use crate::wire::{read_var_number, AeadBlock, Message, TlvReader, WireError, TYPE_AEAD_BLOCK};

/// Size of the AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("content key not set")]
    KeyNotSet,
    #[error("entry failed authentication")]
    Authentication,
    #[error("invalid nonce length {0}, expected {NONCE_SIZE}")]
    InvalidNonce(usize),
    #[error("encryption failed")]
    Encryption,
    #[error("malformed sealed entry: {0}")]
    Malformed(WireError),
}

/// Build the deterministic nonce for entry `seq` of a producer with `base`
pub fn nonce(base: u64, seq: u64) -> [u8; NONCE_SIZE] {
    let mut out = [0u8; NONCE_SIZE];
    out[..4].copy_from_slice(&(base as u32).to_be_bytes());
    out[4..].copy_from_slice(&base.wrapping_add(seq).to_be_bytes());
    out
}

fn aead(key: &ContentKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()))
}

/// Seal `plaintext` as entry `seq`
pub fn seal(
    key: &ContentKey,
    base: u64,
    seq: u64,
    plaintext: &[u8],
) -> Result<AeadBlock, CipherError> {
    let iv = nonce(base, seq);
    let ciphertext = aead(key)
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CipherError::Encryption)?;
    Ok(AeadBlock {
        iv: iv.to_vec(),
        ciphertext,
    })
}

/// Open a sealed block; any tampering is an [`CipherError::Authentication`] error
pub fn open(key: &ContentKey, block: &AeadBlock) -> Result<Vec<u8>, CipherError> {
    if block.iv.len() != NONCE_SIZE {
        return Err(CipherError::InvalidNonce(block.iv.len()));
    }
    aead(key)
        .decrypt(Nonce::from_slice(&block.iv), block.ciphertext.as_slice())
        .map_err(|_| CipherError::Authentication)
}

/// Seals outgoing and opens incoming log payloads for one producer
#[derive(Debug, Clone)]
pub struct ContentCipher {
    slot: ContentKeySlot,
    base: u64,
}

impl ContentCipher {
    pub fn new(slot: ContentKeySlot, base: u64) -> Self {
        Self { slot, base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn slot(&self) -> &ContentKeySlot {
        &self.slot
    }

    /// Seal an encoded message, returning the encoded `AeadBlock` payload
    pub fn seal(&self, seq: u64, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = self.slot.get().ok_or(CipherError::KeyNotSet)?;
        let block = seal(&key, self.base, seq, plaintext)?;
        Ok(Message::AeadBlock(block).encode())
    }

    /// Open a received payload
    ///
    /// Payloads without an `AeadBlock` are plaintext and come back as-is. A
    /// payload carrying a block that does not parse is rejected.
    pub fn open(&self, payload: &[u8]) -> Result<Vec<u8>, CipherError> {
        let block = match Message::decode(payload, true) {
            Ok(Message::AeadBlock(block)) => block,
            Ok(_) => return Ok(payload.to_vec()),
            Err(e) if carries_seal(payload) => {
                tracing::warn!("rejecting malformed sealed entry: {}", e);
                return Err(CipherError::Malformed(e));
            }
            Err(_) => return Ok(payload.to_vec()),
        };
        let key = self.slot.get().ok_or(CipherError::KeyNotSet)?;
        open(&key, &block)
    }
}

/// Whether `payload` starts with, or contains at its top level, an `AeadBlock`
fn carries_seal(payload: &[u8]) -> bool {
    let mut first = payload;
    if read_var_number(&mut first, "type") == Ok(TYPE_AEAD_BLOCK) {
        return true;
    }
    let mut reader = TlvReader::new(payload);
    while let Ok(Some((typ, _))) = reader.next_field() {
        if typ == TYPE_AEAD_BLOCK {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::Delta;

    fn key() -> ContentKey {
        ContentKey::from([0x11; 32])
    }

    #[test]
    fn test_nonce_layout() {
        let n = nonce(0x0102_0304_0506_0708, 2);
        assert_eq!(&n[..4], &[0x05, 0x06, 0x07, 0x08]);
        assert_eq!(&n[4..], &0x0102_0304_0506_070Au64.to_be_bytes());
    }

    #[test]
    fn test_nonce_wraps() {
        let n = nonce(u64::MAX, 1);
        assert_eq!(&n[..4], &[0xFF; 4]);
        assert_eq!(&n[4..], &[0; 8]);
    }

    #[test]
    fn test_nonces_distinct_per_seq() {
        let base = 0xDEAD_BEEF;
        let nonces: std::collections::HashSet<_> = (0..1000).map(|seq| nonce(base, seq)).collect();
        assert_eq!(nonces.len(), 1000);
    }

    #[test]
    fn test_seal_open() {
        let block = seal(&key(), 7, 1, b"hello").unwrap();
        assert_eq!(block.iv, nonce(7, 1).to_vec());
        assert_eq!(open(&key(), &block).unwrap(), b"hello");
    }

    #[test]
    fn test_tampering_fails_authentication() {
        let mut block = seal(&key(), 7, 1, b"hello").unwrap();
        block.ciphertext[0] ^= 1;
        assert_eq!(open(&key(), &block), Err(CipherError::Authentication));

        let block = seal(&key(), 7, 1, b"hello").unwrap();
        let other = ContentKey::from([0x22; 32]);
        assert_eq!(open(&other, &block), Err(CipherError::Authentication));
    }

    #[test]
    fn test_bad_nonce_length() {
        let block = AeadBlock {
            iv: vec![0; 8],
            ciphertext: vec![0; 32],
        };
        assert_eq!(open(&key(), &block), Err(CipherError::InvalidNonce(8)));
    }

    #[test]
    fn test_cipher_requires_key() {
        let cipher = ContentCipher::new(ContentKeySlot::new(), 1);
        assert_eq!(cipher.seal(0, b"x"), Err(CipherError::KeyNotSet));

        let sealed = ContentCipher::new(ContentKeySlot::with_key(key()), 1)
            .seal(0, b"x")
            .unwrap();
        assert_eq!(cipher.open(&sealed), Err(CipherError::KeyNotSet));
    }

    #[test]
    fn test_cipher_roundtrip_and_passthrough() {
        let cipher = ContentCipher::new(ContentKeySlot::with_key(key()), 42);
        let plaintext = Message::Delta(Delta {
            uuid: "doc".into(),
            binary: vec![1, 2, 3],
        })
        .encode();

        let sealed = cipher.seal(5, &plaintext).unwrap();
        assert!(matches!(
            Message::decode(&sealed, false),
            Ok(Message::AeadBlock(_))
        ));
        assert_eq!(cipher.open(&sealed).unwrap(), plaintext);

        // unsealed payloads pass through untouched
        assert_eq!(cipher.open(&plaintext).unwrap(), plaintext);
        assert_eq!(cipher.open(b"not tlv").unwrap(), b"not tlv");
    }

    #[test]
    fn test_malformed_seal_is_rejected() {
        use crate::wire::write_tlv;

        let cipher = ContentCipher::new(ContentKeySlot::with_key(key()), 42);

        // sealed block with its ciphertext field stripped
        let mut value = Vec::new();
        write_tlv(&mut value, 0xC8, &nonce(42, 1));
        let mut stripped = Vec::new();
        write_tlv(&mut stripped, TYPE_AEAD_BLOCK, &value);
        assert!(matches!(
            cipher.open(&stripped),
            Err(CipherError::Malformed(WireError::MissingField(0xCA)))
        ));

        // block whose inner field overruns its length
        let mut truncated = Vec::new();
        write_tlv(&mut truncated, TYPE_AEAD_BLOCK, &[0xC8, 0x0C, 0x00]);
        assert!(matches!(
            cipher.open(&truncated),
            Err(CipherError::Malformed(_))
        ));

        // a sealed block sharing the union with a second arm
        let mut ambiguous = cipher.seal(1, b"x").unwrap();
        let delta = Message::Delta(Delta {
            uuid: "doc".into(),
            binary: vec![],
        })
        .encode();
        ambiguous.extend(delta);
        assert!(matches!(
            cipher.open(&ambiguous),
            Err(CipherError::Malformed(WireError::AmbiguousMessage))
        ));

        // outer length that overruns the payload
        let mut short = cipher.seal(1, b"x").unwrap();
        short.truncate(short.len() - 4);
        assert!(matches!(cipher.open(&short), Err(CipherError::Malformed(_))));
    }
}

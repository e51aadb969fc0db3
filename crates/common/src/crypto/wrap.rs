//! Raw block-wise key wrapping
//!
//! The content key is enciphered one AES block at a time under the key
//! derived from the DSK exchange. There is no chaining and no tag: each
//! 16-byte block is encrypted independently, so the wrapped key is exactly as
//! long as the content key. This matches what deployed peers put on the wire.
//!
//! The codec provides confidentiality only. Integrity of the exchange comes
//! from the signature on the response entry that carries the wrapped key.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};

use super::agreement::SharedKey;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyWrapError {
    #[error("wrap key must be 16 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("input length {0} is not a multiple of the {BLOCK_SIZE}-byte block size")]
    NotBlockAligned(usize),
}

enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl BlockCipher {
    fn new(key: &[u8]) -> Result<Self, KeyWrapError> {
        match key.len() {
            16 => Ok(BlockCipher::Aes128(Aes128::new(GenericArray::from_slice(key)))),
            32 => Ok(BlockCipher::Aes256(Aes256::new(GenericArray::from_slice(key)))),
            other => Err(KeyWrapError::InvalidKeyLength(other)),
        }
    }

    fn encrypt(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(cipher) => cipher.encrypt_block(block),
            BlockCipher::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(cipher) => cipher.decrypt_block(block),
            BlockCipher::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}

fn check_aligned(data: &[u8]) -> Result<(), KeyWrapError> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(KeyWrapError::NotBlockAligned(data.len()));
    }
    Ok(())
}

/// Encipher `secret` block by block under `key`
pub fn wrap(key: &SharedKey, secret: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
    check_aligned(secret)?;
    let cipher = BlockCipher::new(key.bytes())?;
    let mut out = secret.to_vec();
    for block in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt(block);
    }
    Ok(out)
}

/// Reverse [`wrap`]
pub fn unwrap(key: &SharedKey, wrapped: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
    check_aligned(wrapped)?;
    let cipher = BlockCipher::new(key.bytes())?;
    let mut out = wrapped.to_vec();
    for block in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt(block);
    }
    Ok(out)
}

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Size of the workspace content key in bytes
pub const CONTENT_KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ContentKeyError {
    #[error("invalid content key size, expected {CONTENT_KEY_SIZE}, got {0}")]
    InvalidSize(usize),
    #[error("failed to generate content key: {0}")]
    Random(String),
}

/// The symmetric key (DSK) shared by every member of a workspace
///
/// Held in memory only. Members obtain it either by creating it as the
/// first writer or by fetching it from a peer through the DSK exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

impl ContentKey {
    pub fn generate() -> Result<Self, ContentKeyError> {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        getrandom::getrandom(&mut bytes).map_err(|e| ContentKeyError::Random(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, ContentKeyError> {
        let bytes: [u8; CONTENT_KEY_SIZE] = data
            .try_into()
            .map_err(|_| ContentKeyError::InvalidSize(data.len()))?;
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; CONTENT_KEY_SIZE]> for ContentKey {
    fn from(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Shared, possibly-empty holder of the workspace content key
///
/// Cloning the slot shares the underlying key; the distributor installs the
/// key here and the cipher reads it on every seal/open.
#[derive(Debug, Clone, Default)]
pub struct ContentKeySlot(Arc<RwLock<Option<ContentKey>>>);

impl ContentKeySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: ContentKey) -> Self {
        Self(Arc::new(RwLock::new(Some(key))))
    }

    pub fn get(&self) -> Option<ContentKey> {
        self.0.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }

    pub fn set(&self, key: ContentKey) {
        *self.0.write() = Some(key);
    }

    /// Return the current key, creating one if no member has set it yet
    ///
    /// A key that is already present is never replaced.
    pub fn get_or_generate(&self) -> Result<ContentKey, ContentKeyError> {
        let mut guard = self.0.write();
        if let Some(key) = guard.as_ref() {
            return Ok(key.clone());
        }
        let key = ContentKey::generate()?;
        tracing::info!("created new workspace content key");
        *guard = Some(key.clone());
        Ok(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_slice_size() {
        assert!(ContentKey::from_slice(&[1; 32]).is_ok());
        assert!(matches!(
            ContentKey::from_slice(&[1; 16]),
            Err(ContentKeyError::InvalidSize(16))
        ));
    }

    #[test]
    fn test_get_or_generate_is_stable() {
        let slot = ContentKeySlot::new();
        assert!(!slot.is_set());

        let first = slot.get_or_generate().unwrap();
        let second = slot.get_or_generate().unwrap();
        assert_eq!(first, second);

        // clones share the key
        let shared = slot.clone();
        assert_eq!(shared.get(), Some(first));
    }

    #[test]
    fn test_existing_key_not_replaced() {
        let key = ContentKey::from([3; CONTENT_KEY_SIZE]);
        let slot = ContentKeySlot::with_key(key.clone());
        assert_eq!(slot.get_or_generate().unwrap(), key);
    }

    #[test]
    fn test_debug_redacts() {
        let key = ContentKey::from([0xAB; CONTENT_KEY_SIZE]);
        assert!(!format!("{key:?}").contains("ab"));
    }
}

use crate::crypto::{unwrap, ContentKey, EphemeralKeyPair};
use crate::net::express_with_retries;
use crate::wire::{DskResponse, Interest};

use super::{request_name, DistributionError, DskDistributor, KeyDerivationError};

impl DskDistributor {
    /// Fetch the content key from a peer using a fresh ephemeral key
    pub async fn fetch(&self) -> Result<ContentKey, DistributionError> {
        let pair = EphemeralKeyPair::generate().map_err(KeyDerivationError::from)?;
        self.fetch_with_pair(&pair).await
    }

    /// Fetch the content key using a stored X25519 private key
    pub async fn fetch_with_key(&self, private: &[u8]) -> Result<ContentKey, DistributionError> {
        let pair = EphemeralKeyPair::from_private(private).map_err(KeyDerivationError::from)?;
        self.fetch_with_pair(&pair).await
    }

    /// Fetch the content key and install it in the slot
    ///
    /// Returns the installed key without touching the network if the slot
    /// already holds one.
    pub async fn fetch_and_install(&self) -> Result<ContentKey, DistributionError> {
        if let Some(key) = self.slot.get() {
            return Ok(key);
        }
        let key = self.fetch().await?;
        self.slot.set(key.clone());
        tracing::info!(group = %self.group_root, "installed workspace content key");
        Ok(key)
    }

    async fn fetch_with_pair(
        &self,
        pair: &EphemeralKeyPair,
    ) -> Result<ContentKey, DistributionError> {
        let name = request_name(&self.group_root, &pair.public_bytes());
        let interest = Interest::new(name, self.config.interest_lifetime())
            .can_be_prefix(true)
            .must_be_fresh(true);
        tracing::info!(name = %interest.name, "expressing DSK request");

        let data = express_with_retries(self.face.as_ref(), &interest, self.config.attempts)
            .await
            .map_err(|e| {
                tracing::warn!(name = %interest.name, "DSK request failed: {}", e);
                DistributionError::from(e)
            })?;

        if data.verify().is_err() {
            tracing::warn!(name = %data.name, "DSK response signature does not verify");
            return Err(DistributionError::InvalidSignature);
        }

        let response = DskResponse::decode(&data.content, false)?;
        let shared = pair
            .derive(&response.x25519_peer, self.config.wrap_key_size)
            .map_err(KeyDerivationError::from)?;
        let secret = unwrap(&shared, &response.ciphertext).map_err(KeyDerivationError::from)?;
        let key = ContentKey::from_slice(&secret).map_err(KeyDerivationError::from)?;

        tracing::debug!(name = %data.name, signer = %data.signer.to_hex(), "received content key");
        Ok(key)
    }
}

use std::fmt;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::crypto::{wrap, EphemeralKeyPair};
use crate::net::InterestHandler;
use crate::wire::{BlobCommand, Component, DskRequest, DskResponse, Interest, Message, SignedData};

use super::{request_name, DskDistributor};

/// Why a responder produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// This member does not hold the content key
    NoContentKey,
    /// The requester's public key exceeds the accepted length
    PeerKeyTooLong(usize),
    /// A published request whose expiry has passed
    Expired,
    /// The responder's own ephemeral key pair could not be generated
    KeyGeneration,
    /// X25519 agreement or HKDF derivation of the wrap key failed
    KeyAgreement,
    /// The content key could not be wrapped under the derived key
    KeyWrap,
    /// No identity key is available to sign under the response name
    NoSigner,
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclineReason::NoContentKey => f.write_str("no content key"),
            DeclineReason::PeerKeyTooLong(len) => write!(f, "peer key too long ({len} bytes)"),
            DeclineReason::Expired => f.write_str("request expired"),
            DeclineReason::KeyGeneration => f.write_str("ephemeral key generation failed"),
            DeclineReason::KeyAgreement => f.write_str("key agreement failed"),
            DeclineReason::KeyWrap => f.write_str("key wrap failed"),
            DeclineReason::NoSigner => f.write_str("no signer"),
        }
    }
}

/// Result of answering a DSK request
///
/// Declining is silent on the network: the requester sees no reply at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    Responded(SignedData),
    Declined(DeclineReason),
}

impl ResponderOutcome {
    pub fn into_data(self) -> Option<SignedData> {
        match self {
            ResponderOutcome::Responded(data) => Some(data),
            ResponderOutcome::Declined(_) => None,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, ResponderOutcome::Declined(_))
    }
}

impl DskDistributor {
    /// Answer a request from the holder of `peer_public`
    ///
    /// Waits for connectivity first. Failures are logged, never returned.
    pub async fn respond(&self, peer_public: &[u8]) -> ResponderOutcome {
        self.connectivity.wait().await;

        let Some(content_key) = self.slot.get() else {
            tracing::debug!(group = %self.group_root, "declining DSK request without a content key");
            return ResponderOutcome::Declined(DeclineReason::NoContentKey);
        };
        if peer_public.len() > self.config.max_peer_key_len {
            tracing::warn!(len = peer_public.len(), "declining DSK request with oversized key");
            return ResponderOutcome::Declined(DeclineReason::PeerKeyTooLong(peer_public.len()));
        }

        let pair = match EphemeralKeyPair::generate() {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("failed to generate DSK response key: {}", e);
                return ResponderOutcome::Declined(DeclineReason::KeyGeneration);
            }
        };
        let shared = match pair.derive(peer_public, self.config.wrap_key_size) {
            Ok(shared) => shared,
            Err(e) => {
                tracing::error!("failed to compute DSK response key: {}", e);
                return ResponderOutcome::Declined(DeclineReason::KeyAgreement);
            }
        };
        let ciphertext = match wrap(&shared, content_key.bytes()) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                tracing::error!("failed to wrap content key: {}", e);
                return ResponderOutcome::Declined(DeclineReason::KeyWrap);
            }
        };

        let response = DskResponse {
            x25519_peer: pair.public_bytes().to_vec(),
            ciphertext,
        };
        let name = request_name(&self.group_root, peer_public).with_version(self.next_version());

        let Some(signer) = self.signer.suggest_signer(&name) else {
            tracing::error!(name = %name, "no signer for DSK response");
            return ResponderOutcome::Declined(DeclineReason::NoSigner);
        };
        let data = SignedData::sign(
            name,
            Some(self.config.freshness()),
            response.encode(),
            &signer,
        );
        tracing::info!(name = %data.name, "created DSK response");

        if let Some(relay) = &self.relay {
            let command = BlobCommand::new(vec![data.encode()]);
            if let Err(e) = relay.submit(command).await {
                tracing::warn!(name = %data.name, "failed to hand DSK response to relay: {}", e);
            }
        }

        ResponderOutcome::Responded(data)
    }

    /// Answer a request published through the log, unless it has expired
    pub async fn respond_to_request(&self, request: &DskRequest, now_secs: u64) -> ResponderOutcome {
        if request.expiry < now_secs {
            tracing::debug!(expiry = request.expiry, now_secs, "ignoring expired DSK request");
            return ResponderOutcome::Declined(DeclineReason::Expired);
        }
        self.respond(&request.x25519_pub).await
    }

    /// Handle a log message, answering it if it is a DSK request
    pub async fn on_message(&self, message: &Message) -> Option<ResponderOutcome> {
        let Message::DskRequest(request) = message else {
            return None;
        };
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        Some(self.respond_to_request(request, now).await)
    }

    /// Microsecond timestamp, strictly increasing across calls
    fn next_version(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_micros().max(0) as u64;
        let mut last = self.last_version.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_version.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// The requester public key carried by a DSK request name
    fn requested_key<'a>(&self, interest: &'a Interest) -> Option<&'a [u8]> {
        let prefix = self.dsk_prefix();
        if !prefix.is_prefix_of(&interest.name) || interest.name.len() != prefix.len() + 1 {
            return None;
        }
        match interest.name.get(prefix.len()) {
            Some(Component::Generic(public)) => Some(public.as_slice()),
            _ => None,
        }
    }
}

#[async_trait]
impl InterestHandler for DskDistributor {
    async fn handle(&self, interest: &Interest) -> Option<SignedData> {
        let Some(public) = self.requested_key(interest) else {
            tracing::debug!(name = %interest.name, "not a DSK request");
            return None;
        };
        match self.respond(public).await {
            ResponderOutcome::Responded(data) => Some(data),
            ResponderOutcome::Declined(reason) => {
                tracing::debug!(name = %interest.name, %reason, "DSK request declined");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::crypto::{
        derive_shared_key, unwrap, ContentKey, ContentKeySlot, SecretKey,
    };
    use crate::net::{Face, FaceError};
    use crate::wire::Name;

    #[derive(Debug)]
    struct NoFace;

    #[async_trait]
    impl Face for NoFace {
        async fn express(&self, _interest: &Interest) -> Result<SignedData, FaceError> {
            Err(FaceError::NoRoute)
        }
    }

    fn distributor(slot: ContentKeySlot) -> DskDistributor {
        let signer = SecretKey::generate().unwrap();
        DskDistributor::new(
            &Name::from_path("/ownly/team"),
            slot,
            Arc::new(NoFace),
            Arc::new(signer),
        )
    }

    #[tokio::test]
    async fn test_response_unwraps_to_content_key() {
        let key = ContentKey::from([0x5A; 32]);
        let dist = distributor(ContentKeySlot::with_key(key.clone()));
        let requester = EphemeralKeyPair::generate().unwrap();

        let data = dist
            .respond(&requester.public_bytes())
            .await
            .into_data()
            .unwrap();
        assert!(data.verify().is_ok());
        assert_eq!(data.freshness, Some(Duration::from_secs(60)));
        assert!(data.name.version().is_some());
        assert!(request_name(dist.group_root(), &requester.public_bytes()).is_prefix_of(&data.name));

        let response = DskResponse::decode(&data.content, false).unwrap();
        let shared = derive_shared_key(
            &requester.private_bytes(),
            &response.x25519_peer,
            dist.config().wrap_key_size,
        )
        .unwrap();
        assert_eq!(unwrap(&shared, &response.ciphertext).unwrap(), key.bytes());
    }

    #[tokio::test]
    async fn test_declines_without_key_or_with_long_peer_key() {
        let dist = distributor(ContentKeySlot::new());
        assert_eq!(
            dist.respond(&[1; 32]).await,
            ResponderOutcome::Declined(DeclineReason::NoContentKey)
        );

        let dist = distributor(ContentKeySlot::with_key(ContentKey::from([1; 32])));
        assert_eq!(
            dist.respond(&[1; 65]).await,
            ResponderOutcome::Declined(DeclineReason::PeerKeyTooLong(65))
        );
        // within the bound but not an X25519 key
        assert_eq!(
            dist.respond(&[1; 64]).await,
            ResponderOutcome::Declined(DeclineReason::KeyAgreement)
        );
    }

    #[tokio::test]
    async fn test_declines_without_signer() {
        let dist = DskDistributor::new(
            &Name::from_path("/ownly/team"),
            ContentKeySlot::with_key(ContentKey::from([1; 32])),
            Arc::new(NoFace),
            Arc::new(None::<SecretKey>),
        );
        let requester = EphemeralKeyPair::generate().unwrap();
        assert_eq!(
            dist.respond(&requester.public_bytes()).await,
            ResponderOutcome::Declined(DeclineReason::NoSigner)
        );
    }

    #[tokio::test]
    async fn test_expired_published_request() {
        let dist = distributor(ContentKeySlot::with_key(ContentKey::from([1; 32])));
        let requester = EphemeralKeyPair::generate().unwrap();
        let request = DskRequest {
            x25519_pub: requester.public_bytes().to_vec(),
            expiry: 1_000,
        };
        assert_eq!(
            dist.respond_to_request(&request, 1_001).await,
            ResponderOutcome::Declined(DeclineReason::Expired)
        );
        assert!(!dist.respond_to_request(&request, 1_000).await.is_declined());

        // only DSK requests are answered from the log
        let message = Message::Delta(crate::wire::Delta {
            uuid: "doc".into(),
            binary: vec![],
        });
        assert!(dist.on_message(&message).await.is_none());
    }

    #[tokio::test]
    async fn test_versions_increase() {
        let dist = distributor(ContentKeySlot::new());
        let a = dist.next_version();
        let b = dist.next_version();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_handler_only_answers_dsk_names() {
        let dist = distributor(ContentKeySlot::with_key(ContentKey::from([1; 32])));
        let requester = EphemeralKeyPair::generate().unwrap();

        let interest = Interest::new(
            request_name(dist.group_root(), &requester.public_bytes()),
            Duration::from_secs(2),
        )
        .can_be_prefix(true);
        assert!(dist.handle(&interest).await.is_some());

        let stray = Interest::new(dist.dsk_prefix(), Duration::from_secs(2));
        assert!(dist.handle(&stray).await.is_none());
    }
}

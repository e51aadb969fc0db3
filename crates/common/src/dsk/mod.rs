//! Content key (DSK) distribution
//!
//! A member without the workspace content key expresses a request named
//!
//! ```text
//! <workspace>/root/<keyword "DSK">/<requester x25519 public key>
//! ```
//!
//! Any member holding the key answers with a signed entry under that name,
//! versioned by a microsecond timestamp, whose content is a [`DskResponse`]:
//! the responder's ephemeral public key and the content key wrapped under the
//! X25519/HKDF key both sides derive. See [`crate::crypto`] for the exchange.
//!
//! [`DskResponse`]: crate::wire::DskResponse

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::config::DskConfig;
use crate::crypto::{ContentKeyError, ContentKeySlot, KeyAgreementError, KeyWrapError};
use crate::net::{BlobRelay, Connectivity, Face, FaceError, InterestResult};
use crate::wire::{Component, Name, WireError};

mod requester;
mod responder;
mod signer;

pub use responder::{DeclineReason, ResponderOutcome};
pub use signer::{Keychain, SignerProvider};

/// Keyword component that marks DSK requests
pub const DSK_KEYWORD: &[u8] = b"DSK";

#[derive(Debug, thiserror::Error)]
pub enum KeyDerivationError {
    #[error(transparent)]
    Agreement(#[from] KeyAgreementError),
    #[error(transparent)]
    Unwrap(#[from] KeyWrapError),
    #[error(transparent)]
    ContentKey(#[from] ContentKeyError),
}

#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("distribution failed: {result}")]
    Network {
        result: InterestResult,
        #[source]
        source: FaceError,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] WireError),
    #[error("response signature does not verify")]
    InvalidSignature,
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyDerivationError),
}

impl From<FaceError> for DistributionError {
    fn from(source: FaceError) -> Self {
        DistributionError::Network {
            result: source.result(),
            source,
        }
    }
}

impl DistributionError {
    /// The network result code, for failures that reached the network
    pub fn result(&self) -> Option<InterestResult> {
        match self {
            DistributionError::Network { result, .. } => Some(*result),
            _ => None,
        }
    }
}

/// The sync-group root of a workspace
pub fn group_root(workspace: &Name) -> Name {
    workspace.clone().append(Component::generic("root"))
}

/// Name under which `public` asks `group_root` for the content key
pub fn request_name(group_root: &Name, public: &[u8]) -> Name {
    dsk_prefix(group_root).append(Component::generic(public))
}

fn dsk_prefix(group_root: &Name) -> Name {
    group_root.clone().append(Component::keyword(DSK_KEYWORD))
}

/// Fetches the content key from peers and answers peers that ask for it
pub struct DskDistributor {
    config: DskConfig,
    group_root: Name,
    slot: ContentKeySlot,
    face: Arc<dyn Face>,
    signer: Arc<dyn SignerProvider>,
    relay: Option<Arc<dyn BlobRelay>>,
    connectivity: Connectivity,
    last_version: AtomicU64,
}

impl std::fmt::Debug for DskDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DskDistributor")
            .field("group_root", &self.group_root.to_string())
            .field("has_key", &self.slot.is_set())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DskDistributor {
    pub fn new(
        workspace: &Name,
        slot: ContentKeySlot,
        face: Arc<dyn Face>,
        signer: Arc<dyn SignerProvider>,
    ) -> Self {
        Self {
            config: DskConfig::default(),
            group_root: group_root(workspace),
            slot,
            face,
            signer,
            relay: None,
            connectivity: Connectivity::connected(),
            last_version: AtomicU64::new(0),
        }
    }

    pub fn with_config(mut self, config: DskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn BlobRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn config(&self) -> &DskConfig {
        &self.config
    }

    pub fn group_root(&self) -> &Name {
        &self.group_root
    }

    /// Prefix this distributor answers requests under
    pub fn dsk_prefix(&self) -> Name {
        dsk_prefix(&self.group_root)
    }

    pub fn slot(&self) -> &ContentKeySlot {
        &self.slot
    }
}

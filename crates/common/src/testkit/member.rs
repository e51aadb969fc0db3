use std::sync::Arc;

use anyhow::Result;

use super::network::{MemoryFace, MemoryRelay};
use crate::config::DskConfig;
use crate::crypto::{ContentKeySlot, SecretKey};
use crate::dsk::DskDistributor;
use crate::net::{Connectivity, InterestRouter};
use crate::wire::Name;

/// A group member living on a [`super::TestNetwork`]
#[derive(Debug, Clone)]
pub struct TestMember {
    pub name: String,
    pub key: SecretKey,
    pub router: InterestRouter,
    pub face: Arc<MemoryFace>,
    relay: Arc<MemoryRelay>,
}

impl TestMember {
    pub(super) fn new(
        name: String,
        router: InterestRouter,
        face: Arc<MemoryFace>,
        relay: Arc<MemoryRelay>,
    ) -> Result<Self> {
        Ok(Self {
            name,
            key: SecretKey::generate()?,
            router,
            face,
            relay,
        })
    }

    /// Build a distributor for `workspace` and serve its DSK requests
    pub fn distributor(
        &self,
        workspace: &Name,
        slot: ContentKeySlot,
        config: DskConfig,
    ) -> Arc<DskDistributor> {
        self.distributor_with_connectivity(workspace, slot, config, Connectivity::connected())
    }

    pub fn distributor_with_connectivity(
        &self,
        workspace: &Name,
        slot: ContentKeySlot,
        config: DskConfig,
        connectivity: Connectivity,
    ) -> Arc<DskDistributor> {
        let distributor = Arc::new(
            DskDistributor::new(workspace, slot, self.face.clone(), Arc::new(self.key.clone()))
                .with_config(config)
                .with_relay(self.relay.clone())
                .with_connectivity(connectivity),
        );
        self.router
            .register(distributor.dsk_prefix(), distributor.clone());
        distributor
    }
}

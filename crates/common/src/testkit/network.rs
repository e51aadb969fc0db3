use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use super::member::TestMember;
use crate::net::{BlobRelay, Face, FaceError, InterestRouter};
use crate::wire::{BlobCommand, Interest, SignedData};

#[derive(Debug)]
struct Node {
    router: InterestRouter,
    online: bool,
}

#[derive(Debug, Default)]
pub(super) struct Shared {
    nodes: RwLock<HashMap<String, Node>>,
    relay: Arc<MemoryRelay>,
}

/// A coordinator for in-process group members
///
/// Interests expressed by one member are offered to every other online
/// member's router, then to the shared relay. When nobody answers the
/// interest is left pending, exactly like an unanswered request on a real
/// network, and the caller's lifetime timeout fires.
#[derive(Debug, Clone, Default)]
pub struct TestNetwork {
    shared: Arc<Shared>,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member with a fresh identity key
    pub fn add_member(&self, name: impl Into<String>) -> Result<TestMember> {
        let name = name.into();
        let mut nodes = self.shared.nodes.write();
        if nodes.contains_key(&name) {
            return Err(anyhow!("member '{}' already exists", name));
        }
        let router = InterestRouter::new();
        nodes.insert(
            name.clone(),
            Node {
                router: router.clone(),
                online: true,
            },
        );
        let face = Arc::new(MemoryFace {
            origin: name.clone(),
            shared: self.shared.clone(),
        });
        tracing::debug!(member = %name, "added test member");
        TestMember::new(name, router, face, self.shared.relay.clone())
    }

    /// Take a member off the network; its relayed data stays reachable
    pub fn set_online(&self, name: &str, online: bool) -> Result<()> {
        let mut nodes = self.shared.nodes.write();
        let node = nodes
            .get_mut(name)
            .ok_or_else(|| anyhow!("no member named '{}'", name))?;
        node.online = online;
        Ok(())
    }

    pub fn relay(&self) -> Arc<MemoryRelay> {
        self.shared.relay.clone()
    }
}

/// Face of one member onto a [`TestNetwork`]
#[derive(Debug)]
pub struct MemoryFace {
    origin: String,
    shared: Arc<Shared>,
}

#[async_trait]
impl Face for MemoryFace {
    async fn express(&self, interest: &Interest) -> Result<SignedData, FaceError> {
        let routers: Vec<(String, InterestRouter)> = self
            .shared
            .nodes
            .read()
            .iter()
            .filter(|(name, node)| node.online && **name != self.origin)
            .map(|(name, node)| (name.clone(), node.router.clone()))
            .collect();

        for (name, router) in routers {
            if let Some(data) = router.dispatch(interest).await {
                tracing::trace!(from = %name, name = %data.name, "member answered interest");
                return Ok(data);
            }
        }
        if let Some(data) = self.shared.relay.lookup(interest) {
            tracing::trace!(name = %data.name, "relay answered interest");
            return Ok(data);
        }
        std::future::pending().await
    }
}

/// Relay that keeps every submitted data packet in memory
///
/// Packets remember when they were submitted. An interest that must be fresh
/// is only served packets still inside their freshness period.
#[derive(Debug, Default)]
pub struct MemoryRelay {
    commands: Mutex<Vec<(Instant, BlobCommand)>>,
}

impl MemoryRelay {
    pub fn commands(&self) -> Vec<BlobCommand> {
        self.commands
            .lock()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }

    /// Newest stored packet satisfying `interest`
    pub fn lookup(&self, interest: &Interest) -> Option<SignedData> {
        let now = Instant::now();
        self.commands
            .lock()
            .iter()
            .flat_map(|(stored, command)| command.data.iter().map(move |wire| (*stored, wire)))
            .filter_map(|(stored, wire)| Some((stored, SignedData::decode(wire, true).ok()?)))
            .filter(|(stored, data)| {
                if !interest.must_be_fresh {
                    return true;
                }
                match data.freshness {
                    Some(freshness) => now.duration_since(*stored) < freshness,
                    None => false,
                }
            })
            .map(|(_, data)| data)
            .filter(|data| interest.matches(&data.name))
            .last()
    }
}

#[async_trait]
impl BlobRelay for MemoryRelay {
    async fn submit(&self, command: BlobCommand) -> Result<(), FaceError> {
        self.commands.lock().push((Instant::now(), command));
        Ok(())
    }
}

//! Interest exchange over iroh
//!
//! Each interest travels on its own bidirectional stream: the requester
//! writes one bincode [`Frame`], finishes its side, and reads one [`Reply`].
//! Replies carry the TLV-encoded data packet so signatures survive the hop.
//!
//! A member that has nothing to say answers [`Reply::Silent`]. The requester
//! then moves on to its next peer, and if every peer stays silent the
//! interest runs out its lifetime and times out. [`Reply::Nack`] is reserved
//! for interests the member could not decode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use iroh::discovery::pkarr::dht::DhtDiscovery;
use iroh::endpoint::Connection;
use iroh::protocol::{AcceptError, ProtocolHandler, Router};
use iroh::Endpoint;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::connectivity::Connectivity;
use super::face::{Face, FaceError};
use super::router::InterestRouter;
use crate::crypto::{PublicKey, SecretKey};
use crate::wire::{Interest, SignedData};

/// ALPN identifier for the interest exchange protocol
pub const ALPN: &[u8] = b"/ownly-dsk/1";

// requests stay small; anything large goes through the relay
const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
enum Frame {
    Interest(Vec<u8>),
}

#[derive(Debug, Serialize, Deserialize)]
enum Reply {
    Data(Vec<u8>),
    Nack,
    Silent,
}

/// Face that forwards interests to known group members over iroh
///
/// One attempt offers the interest to every known peer in turn, starting
/// one further along the list each time, and returns the first data packet.
#[derive(Debug)]
pub struct IrohFace {
    endpoint: Endpoint,
    peers: RwLock<Vec<PublicKey>>,
    next: AtomicUsize,
}

impl IrohFace {
    pub fn new(endpoint: Endpoint, peers: Vec<PublicKey>) -> Self {
        Self {
            endpoint,
            peers: RwLock::new(peers),
            next: AtomicUsize::new(0),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn add_peer(&self, peer: PublicKey) {
        let mut peers = self.peers.write();
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }

    /// Known peers, rotated to start at the next peer in turn
    fn rotation(&self) -> Vec<PublicKey> {
        let peers = self.peers.read();
        if peers.is_empty() {
            return Vec::new();
        }
        let start = self.next.fetch_add(1, Ordering::Relaxed) % peers.len();
        peers[start..].iter().chain(&peers[..start]).copied().collect()
    }

    async fn exchange(&self, peer: &PublicKey, interest: &Interest) -> Result<Reply, FaceError> {
        let conn = self.endpoint.connect(**peer, ALPN).await.map_err(|e| {
            tracing::error!("failed to connect to peer {}: {}", peer.to_hex(), e);
            anyhow!("failed to connect to peer: {}", e)
        })?;

        let (mut send, mut recv) = conn
            .open_bi()
            .await
            .map_err(|e| anyhow!("failed to open bidirectional stream: {}", e))?;

        let frame = bincode::serialize(&Frame::Interest(interest.encode()))
            .map_err(|e| anyhow!("failed to serialize interest: {}", e))?;
        send.write_all(&frame)
            .await
            .map_err(|e| anyhow!("failed to write interest: {}", e))?;
        send.finish()
            .map_err(|e| anyhow!("failed to finish sending interest: {}", e))?;

        let reply_bytes = recv
            .read_to_end(MAX_FRAME_SIZE)
            .await
            .map_err(|e| anyhow!("failed to read reply: {}", e))?;
        let reply = bincode::deserialize(&reply_bytes)
            .map_err(|e| anyhow!("failed to deserialize reply: {}", e))?;
        Ok(reply)
    }
}

#[async_trait]
impl Face for IrohFace {
    async fn express(&self, interest: &Interest) -> Result<SignedData, FaceError> {
        let peers = self.rotation();
        if peers.is_empty() {
            return Err(FaceError::NoRoute);
        }
        let deadline = Instant::now() + interest.lifetime;
        let mut silent = false;
        let mut failure = None;

        for peer in peers {
            tracing::debug!(name = %interest.name, peer = %peer.to_hex(), "expressing interest");
            let reply = match tokio::time::timeout_at(deadline, self.exchange(&peer, interest)).await
            {
                Ok(reply) => reply,
                Err(_) => return Err(FaceError::Timeout),
            };
            match reply {
                Ok(Reply::Data(wire)) => match SignedData::decode(&wire, false) {
                    Ok(data) => return Ok(data),
                    Err(e) => {
                        tracing::warn!(peer = %peer.to_hex(), "malformed data packet: {}", e);
                        failure = Some(FaceError::Transport(anyhow!("malformed data packet: {}", e)));
                    }
                },
                Ok(Reply::Silent) => {
                    tracing::debug!(peer = %peer.to_hex(), "peer has no data for interest");
                    silent = true;
                }
                Ok(Reply::Nack) => failure = Some(FaceError::Nack),
                Err(e) => {
                    tracing::warn!(peer = %peer.to_hex(), "interest exchange failed: {}", e);
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) if !silent => Err(e),
            // nobody answered: the interest lapses like an unanswered request
            _ => {
                tokio::time::sleep_until(deadline).await;
                Err(FaceError::Timeout)
            }
        }
    }
}

/// Server side of the exchange, answering interests from the router
#[derive(Debug, Clone)]
pub struct InterestProtocol {
    router: InterestRouter,
}

impl InterestProtocol {
    pub fn new(router: InterestRouter) -> Self {
        Self { router }
    }
}

impl ProtocolHandler for InterestProtocol {
    #[allow(refining_impl_trait)]
    fn accept(&self, conn: Connection) -> BoxFuture<'static, Result<(), AcceptError>> {
        let router = self.router.clone();
        Box::pin(async move {
            tracing::debug!("new connection from {:?}", conn.remote_node_id());
            let (mut send, mut recv) = conn.accept_bi().await.map_err(|e| {
                tracing::error!("failed to accept bidirectional stream: {}", e);
                AcceptError::from(e)
            })?;

            let frame_bytes = recv.read_to_end(MAX_FRAME_SIZE).await.map_err(|e| {
                tracing::error!("failed to read frame: {}", e);
                AcceptError::from(std::io::Error::other(e))
            })?;

            let frame: Frame = bincode::deserialize(&frame_bytes).map_err(|e| {
                tracing::error!("failed to deserialize frame: {}", e);
                let err: Box<dyn std::error::Error + Send + Sync> =
                    anyhow!("failed to deserialize frame: {}", e).into();
                AcceptError::from(err)
            })?;

            let reply = match frame {
                Frame::Interest(wire) => match Interest::decode(&wire, false) {
                    Ok(interest) => match router.dispatch(&interest).await {
                        Some(data) => Reply::Data(data.encode()),
                        None => Reply::Silent,
                    },
                    Err(e) => {
                        tracing::warn!("dropping malformed interest: {}", e);
                        Reply::Nack
                    }
                },
            };

            let reply_bytes = bincode::serialize(&reply).map_err(|e| {
                tracing::error!("failed to serialize reply: {}", e);
                let err: Box<dyn std::error::Error + Send + Sync> =
                    anyhow!("failed to serialize reply: {}", e).into();
                AcceptError::from(err)
            })?;
            send.write_all(&reply_bytes).await.map_err(|e| {
                tracing::error!("failed to send reply: {}", e);
                AcceptError::from(std::io::Error::other(e))
            })?;
            send.finish().map_err(|e| {
                tracing::error!("failed to finish stream: {}", e);
                AcceptError::from(std::io::Error::other(e))
            })?;
            conn.closed().await;
            Ok(())
        })
    }
}

/// A bound iroh node serving interests and forwarding its own
pub struct IrohNode {
    pub face: Arc<IrohFace>,
    pub router: Router,
    pub connectivity: Connectivity,
}

impl IrohNode {
    /// Bind an endpoint for `secret_key` and start serving `interests`
    pub async fn spawn(
        secret_key: &SecretKey,
        peers: Vec<PublicKey>,
        interests: InterestRouter,
    ) -> anyhow::Result<Self> {
        let discovery = DhtDiscovery::builder()
            .secret_key(secret_key.0.clone())
            .build()
            .map_err(|e| anyhow!("failed to build mainline discovery: {}", e))?;
        let endpoint = Endpoint::builder()
            .secret_key(secret_key.0.clone())
            .discovery(discovery)
            .bind()
            .await
            .map_err(|e| anyhow!("failed to bind endpoint: {}", e))?;
        Ok(Self::from_endpoint(endpoint, peers, interests))
    }

    /// Start serving `interests` on an already bound endpoint
    pub fn from_endpoint(endpoint: Endpoint, peers: Vec<PublicKey>, interests: InterestRouter) -> Self {
        let router = Router::builder(endpoint.clone())
            .accept(ALPN, InterestProtocol::new(interests))
            .spawn();
        tracing::info!(
            node = %PublicKey::from(endpoint.node_id()).to_hex(),
            "interest protocol listening"
        );

        Self {
            face: Arc::new(IrohFace::new(endpoint, peers)),
            router,
            connectivity: Connectivity::connected(),
        }
    }

    pub fn node_id(&self) -> PublicKey {
        PublicKey::from(self.face.endpoint().node_id())
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.connectivity.set_connected(false);
        self.router.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::time::Duration;

    use iroh::{NodeAddr, RelayMode};

    use super::*;
    use crate::config::DskConfig;
    use crate::crypto::{ContentKey, ContentKeySlot};
    use crate::dsk::DskDistributor;
    use crate::net::InterestResult;
    use crate::wire::Name;

    fn workspace() -> Name {
        Name::from_path("/ownly/team")
    }

    async fn local_endpoint(key: &SecretKey) -> Endpoint {
        Endpoint::builder()
            .secret_key(key.0.clone())
            .relay_mode(RelayMode::Disabled)
            .bind()
            .await
            .unwrap()
    }

    /// Tell `from` where `to` listens on loopback
    fn introduce(from: &Endpoint, to: &Endpoint) {
        let addrs: Vec<SocketAddr> = to
            .bound_sockets()
            .into_iter()
            .map(|addr| match addr {
                SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
                    SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
                }
                SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
                    SocketAddr::from((Ipv6Addr::LOCALHOST, v6.port()))
                }
                other => other,
            })
            .collect();
        let node_addr = NodeAddr::from_parts(to.node_id(), None, addrs);
        from.add_node_addr_with_source(node_addr, "test").unwrap();
    }

    /// A member serving DSK requests, holding `slot`
    async fn member(slot: ContentKeySlot) -> IrohNode {
        let key = SecretKey::generate().unwrap();
        let interests = InterestRouter::new();
        let node = IrohNode::from_endpoint(local_endpoint(&key).await, vec![], interests.clone());
        let distributor = Arc::new(DskDistributor::new(
            &workspace(),
            slot,
            node.face.clone(),
            Arc::new(key),
        ));
        interests.register(distributor.dsk_prefix(), distributor);
        node
    }

    /// A joiner whose face knows `peers`, in order
    async fn joining_member(peers: &[&IrohNode], config: DskConfig) -> DskDistributor {
        let key = SecretKey::generate().unwrap();
        let endpoint = local_endpoint(&key).await;
        for peer in peers {
            introduce(&endpoint, peer.face.endpoint());
        }
        let ids = peers.iter().map(|peer| peer.node_id()).collect();
        let face = Arc::new(IrohFace::new(endpoint, ids));
        DskDistributor::new(&workspace(), ContentKeySlot::new(), face, Arc::new(key))
            .with_config(config)
    }

    #[tokio::test]
    async fn test_keyed_member_answers_over_iroh() {
        let key = ContentKey::from([0x24; 32]);
        let keyed = member(ContentKeySlot::with_key(key.clone())).await;

        let joiner = joining_member(&[&keyed], DskConfig::default()).await;
        assert_eq!(joiner.fetch().await.unwrap(), key);

        keyed.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_keyless_peer_is_skipped_within_one_attempt() {
        let key = ContentKey::from([0x42; 32]);
        let keyless = member(ContentKeySlot::new()).await;
        let keyed = member(ContentKeySlot::with_key(key.clone())).await;

        let config = DskConfig {
            attempts: 1,
            ..DskConfig::default()
        };
        let joiner = joining_member(&[&keyless, &keyed], config).await;
        assert_eq!(joiner.fetch().await.unwrap(), key);

        keyless.shutdown().await.unwrap();
        keyed.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_all_silent_peers_time_out() {
        let first = member(ContentKeySlot::new()).await;
        let second = member(ContentKeySlot::new()).await;

        let config = DskConfig {
            interest_lifetime_ms: 300,
            attempts: 1,
            ..DskConfig::default()
        };
        let joiner = joining_member(&[&first, &second], config).await;

        let start = std::time::Instant::now();
        let err = joiner.fetch().await.unwrap_err();
        assert_eq!(err.result(), Some(InterestResult::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(300));

        first.shutdown().await.unwrap();
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_interest_is_nacked() {
        let node = member(ContentKeySlot::with_key(ContentKey::from([1; 32]))).await;
        let client = local_endpoint(&SecretKey::generate().unwrap()).await;
        introduce(&client, node.face.endpoint());

        let conn = client.connect(*node.node_id(), ALPN).await.unwrap();
        let (mut send, mut recv) = conn.open_bi().await.unwrap();
        let frame = bincode::serialize(&Frame::Interest(vec![0xFF, 0x00])).unwrap();
        send.write_all(&frame).await.unwrap();
        send.finish().unwrap();

        let reply: Reply = bincode::deserialize(&recv.read_to_end(MAX_FRAME_SIZE).await.unwrap())
            .unwrap();
        assert!(matches!(reply, Reply::Nack));
        drop(conn);

        node.shutdown().await.unwrap();
    }
}

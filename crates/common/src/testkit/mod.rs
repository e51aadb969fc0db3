/// In-process harness for multi-member tests
///
/// Members exchange interests through in-memory faces, so DSK exchanges can
/// be exercised end to end without binding sockets.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::TestNetwork;
///
/// #[tokio::test]
/// async fn test_join() -> anyhow::Result<()> {
///     let net = TestNetwork::new();
///     let alice = net.add_member("alice")?;
///     let bob = net.add_member("bob")?;
///
///     let workspace = Name::from_path("/ownly/team");
///     alice.distributor(&workspace, ContentKeySlot::with_key(key), DskConfig::default());
///     let joiner = bob.distributor(&workspace, ContentKeySlot::new(), DskConfig::default());
///
///     joiner.fetch_and_install().await?;
///     Ok(())
/// }
/// ```
mod member;
mod network;

pub use member::TestMember;
pub use network::{MemoryFace, MemoryRelay, TestNetwork};

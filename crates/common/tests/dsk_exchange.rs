mod common;

use std::sync::Arc;
use std::time::Duration;

use ::common::config::DskConfig;
use ::common::crypto::{ContentKeySlot, EphemeralKeyPair, KeySize};
use ::common::dsk::{request_name, DeclineReason, DistributionError, ResponderOutcome};
use ::common::net::{Connectivity, InterestResult};
use ::common::testkit::TestNetwork;
use ::common::wire::{BlobCommand, SignedData};

#[tokio::test]
async fn test_joining_member_fetches_content_key() -> anyhow::Result<()> {
    common::init_tracing();
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;
    let bob = net.add_member("bob")?;

    let key = common::content_key(0x42);
    alice.distributor(
        &common::workspace(),
        ContentKeySlot::with_key(key.clone()),
        DskConfig::default(),
    );
    let joiner = bob.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());

    let fetched = joiner.fetch_and_install().await?;
    assert_eq!(fetched, key);
    assert_eq!(joiner.slot().get(), Some(key));
    Ok(())
}

#[tokio::test]
async fn test_fetch_with_stored_key_and_wide_wrap_key() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;
    let bob = net.add_member("bob")?;
    let config = DskConfig {
        wrap_key_size: KeySize::Aes256,
        ..DskConfig::default()
    };

    let key = common::content_key(0x07);
    alice.distributor(
        &common::workspace(),
        ContentKeySlot::with_key(key.clone()),
        config.clone(),
    );
    let joiner = bob.distributor(&common::workspace(), ContentKeySlot::new(), config);

    let stored = EphemeralKeyPair::generate()?;
    let fetched = joiner.fetch_with_key(&stored.private_bytes()).await?;
    assert_eq!(fetched, key);
    // fetch_with_key leaves the slot alone
    assert!(!joiner.slot().is_set());
    Ok(())
}

#[tokio::test]
async fn test_response_is_relayed_for_offline_retrieval() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;
    let bob = net.add_member("bob")?;

    let key = common::content_key(0x33);
    let responder = alice.distributor(
        &common::workspace(),
        ContentKeySlot::with_key(key.clone()),
        DskConfig::default(),
    );
    let joiner = bob.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());

    let stored = EphemeralKeyPair::generate()?;
    let data = responder
        .respond(&stored.public_bytes())
        .await
        .into_data()
        .expect("responder holds the key");

    let commands: Vec<BlobCommand> = net.relay().commands();
    assert_eq!(commands.len(), 1);
    let relayed = SignedData::decode(&commands[0].data[0], false)?;
    assert_eq!(relayed, data);

    // alice goes away; the relay still serves her response
    net.set_online("alice", false)?;
    let fetched = joiner.fetch_with_key(&stored.private_bytes()).await?;
    assert_eq!(fetched, key);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_relay_stops_serving_stale_response() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;
    let bob = net.add_member("bob")?;

    let responder = alice.distributor(
        &common::workspace(),
        ContentKeySlot::with_key(common::content_key(0x34)),
        DskConfig::default(),
    );
    let joiner = bob.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());

    let stored = EphemeralKeyPair::generate()?;
    assert!(responder.respond(&stored.public_bytes()).await.into_data().is_some());
    assert_eq!(net.relay().commands().len(), 1);

    net.set_online("alice", false)?;
    tokio::time::advance(DskConfig::default().freshness() + Duration::from_secs(1)).await;

    let err = joiner.fetch_with_key(&stored.private_bytes()).await.unwrap_err();
    assert_eq!(err.result(), Some(InterestResult::Timeout));
    Ok(())
}

#[tokio::test]
async fn test_responder_declines() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;

    let keyless = alice.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());
    let requester = EphemeralKeyPair::generate()?;
    assert_eq!(
        keyless.respond(&requester.public_bytes()).await,
        ResponderOutcome::Declined(DeclineReason::NoContentKey)
    );

    keyless.slot().set(common::content_key(1));
    assert_eq!(
        keyless.respond(&[0u8; 65]).await,
        ResponderOutcome::Declined(DeclineReason::PeerKeyTooLong(65))
    );
    assert!(net.relay().commands().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_times_out_after_three_attempts() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;
    let bob = net.add_member("bob")?;

    // nobody holds the key, so every request goes unanswered
    alice.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());
    let joiner = bob.distributor(&common::workspace(), ContentKeySlot::new(), DskConfig::default());

    let start = tokio::time::Instant::now();
    let err = joiner.fetch().await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, DistributionError::Network { .. }));
    assert_eq!(err.result(), Some(InterestResult::Timeout));
    assert!(elapsed >= Duration::from_secs(6));
    assert!(elapsed < Duration::from_secs(7));
    assert!(!joiner.slot().is_set());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_responder_waits_for_connectivity() -> anyhow::Result<()> {
    let net = TestNetwork::new();
    let alice = net.add_member("alice")?;

    let connectivity = Connectivity::default();
    let responder = alice.distributor_with_connectivity(
        &common::workspace(),
        ContentKeySlot::with_key(common::content_key(9)),
        DskConfig::default(),
        connectivity.clone(),
    );

    let requester = EphemeralKeyPair::generate()?;
    let public = requester.public_bytes();
    let pending = {
        let responder = Arc::clone(&responder);
        tokio::spawn(async move { responder.respond(&public).await })
    };

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!pending.is_finished());

    connectivity.set_connected(true);
    let outcome = pending.await?;
    let data = outcome.into_data().expect("responded once connected");
    assert!(request_name(responder.group_root(), &public).is_prefix_of(&data.name));
    Ok(())
}

//! Shared test utilities for integration tests
#![allow(dead_code)]

use common::crypto::ContentKey;
use common::log::LogEntry;
use common::wire::{Delta, Message, Name};
use tracing_subscriber::EnvFilter;

/// Install a subscriber honoring RUST_LOG; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn workspace() -> Name {
    Name::from_path("/ownly/workspace/team")
}

pub fn content_key(byte: u8) -> ContentKey {
    ContentKey::from([byte; 32])
}

pub fn delta(uuid: &str, binary: &[u8]) -> Vec<u8> {
    Message::Delta(Delta {
        uuid: uuid.to_string(),
        binary: binary.to_vec(),
    })
    .encode()
}

pub fn entry(producer: &str, seq: u64, content: Vec<u8>) -> LogEntry {
    LogEntry::new(Name::from_path(producer), 1, seq, content)
}

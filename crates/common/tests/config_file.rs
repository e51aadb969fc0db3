use std::fs;

use common::config::{Config, ConfigError};
use common::crypto::{KeySize, SecretKey};
use tempfile::TempDir;

#[test]
fn test_load_config_and_identity_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = temp_dir.path().join("key.pem");
    let config_path = temp_dir.path().join("config.toml");

    let key = SecretKey::generate().unwrap();
    fs::write(&key_path, key.to_pem()).unwrap();
    fs::write(
        &config_path,
        format!(
            "[dsk]\ninterest_lifetime_ms = 500\nwrap_key_size = 32\n\n[identity]\nkey_path = {:?}\n",
            key_path.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.dsk.interest_lifetime_ms, 500);
    assert_eq!(config.dsk.wrap_key_size, KeySize::Aes256);
    assert_eq!(config.dsk.attempts, 3);
    assert_eq!(config.load_identity().unwrap().public(), key.public());
}

#[test]
fn test_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.snapshot.threshold = 42;
    config.save(&config_path).unwrap();

    assert_eq!(Config::load(&config_path).unwrap(), config);
}

#[test]
fn test_missing_file_and_bad_key() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        Config::load(temp_dir.path().join("absent.toml")),
        Err(ConfigError::Io(_))
    ));

    let key_path = temp_dir.path().join("key.pem");
    fs::write(&key_path, "not a pem").unwrap();
    let mut config = Config::default();
    config.identity.key_path = Some(key_path);
    assert!(matches!(
        config.load_identity(),
        Err(ConfigError::InvalidKey(_))
    ));
}

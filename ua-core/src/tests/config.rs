// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use tempdir::TempDir;

use crate::{
    comms::TokenPolicy,
    config::{Config, ConfigError},
};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct ChannelConfig {
    name: String,
    #[serde(default)]
    tokens: TokenPolicy,
}

impl Config for ChannelConfig {
    fn validate(&self) -> Result<(), Vec<String>> {
        self.tokens.validate()
    }
}

#[test]
fn save_and_load() {
    let dir = TempDir::new("ua-core-config").unwrap();
    let path = dir.path().join("channel.conf");
    let config = ChannelConfig {
        name: "test".to_owned(),
        tokens: TokenPolicy {
            renew_fraction: 0.5,
            ..Default::default()
        },
    };
    config.save(&path).unwrap();
    let loaded: ChannelConfig = ChannelConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_fields_use_defaults() {
    let dir = TempDir::new("ua-core-config").unwrap();
    let path = dir.path().join("channel.conf");
    std::fs::write(&path, "name: short\ntokens:\n  max_lifetime_ms: 20000\n").unwrap();
    let loaded: ChannelConfig = ChannelConfig::load(&path).unwrap();
    assert_eq!(loaded.tokens.max_lifetime_ms, 20000);
    assert_eq!(loaded.tokens.renew_fraction, 0.75);
    assert_eq!(loaded.tokens.grace_fraction, 0.25);
}

#[test]
fn invalid_config_is_not_saved() {
    let dir = TempDir::new("ua-core-config").unwrap();
    let path = dir.path().join("channel.conf");
    let config = ChannelConfig {
        name: "bad".to_owned(),
        tokens: TokenPolicy {
            min_lifetime_ms: 50_000,
            max_lifetime_ms: 10_000,
            renew_fraction: 1.5,
            ..Default::default()
        },
    };
    match config.save(&path) {
        Err(ConfigError::ConfigInvalid(errors)) => assert_eq!(errors.len(), 2),
        r => panic!("Expected invalid config, got {r:?}"),
    }
    assert!(!path.exists());
}

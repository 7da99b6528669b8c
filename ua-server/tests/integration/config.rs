// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use tempdir::TempDir;
use ua_core::config::{Config, ConfigError};
use ua_server::{constants, Server, ServerConfig};

#[test]
fn save_and_load() {
    let dir = TempDir::new("ua-server").unwrap();
    let path = dir.path().join("server.conf");

    let mut config = ServerConfig::default();
    config.application_name = "Boiler".to_owned();
    config.limits.subscriptions.max_pending_publish_requests = 4;
    config.save(&path).unwrap();

    let loaded: ServerConfig = ServerConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_fields_take_defaults() {
    let config: ServerConfig = serde_yaml::from_str(
        r#"
application_name: Partial
max_token_lifetime_ms: 600000
limits:
  subscriptions:
    max_keep_alive_count: 50
"#,
    )
    .unwrap();
    assert_eq!(config.application_name, "Partial");
    assert_eq!(config.max_token_lifetime_ms, 600_000);
    assert_eq!(config.min_token_lifetime_ms, constants::MIN_TOKEN_LIFETIME_MS);
    assert_eq!(config.renew_fraction, constants::TOKEN_RENEW_FRACTION);
    assert_eq!(config.limits.subscriptions.max_keep_alive_count, 50);
    assert_eq!(
        config.limits.subscriptions.default_keep_alive_count,
        constants::DEFAULT_KEEP_ALIVE_COUNT
    );
    assert_eq!(config.limits.max_channels, constants::MAX_CHANNELS);
    assert!(config.validate().is_ok());
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = ServerConfig::default();
    config.min_token_lifetime_ms = 120_000;
    config.max_token_lifetime_ms = 60_000;
    config.publish_timeout_default_ms = 0;
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2, "{errors:?}");

    assert!(matches!(
        Server::new(config.clone()),
        Err(ConfigError::ConfigInvalid(_))
    ));

    let dir = TempDir::new("ua-server").unwrap();
    let path = dir.path().join("server.conf");
    assert!(matches!(
        config.save(&path),
        Err(ConfigError::ConfigInvalid(_))
    ));
    assert!(!path.exists());
}

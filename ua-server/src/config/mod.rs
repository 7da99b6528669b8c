// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Server configuration.

mod limits;

pub use limits::{ContinuationPointLimits, Limits, SubscriptionLimits};

use serde::{Deserialize, Serialize};
use ua_core::{comms::TokenPolicy, config::Config};

/// Configuration of the server runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name used in log output.
    #[serde(default = "defaults::application_name")]
    pub application_name: String,
    /// Shortest security token lifetime the server grants, in milliseconds.
    #[serde(default = "defaults::min_token_lifetime_ms")]
    pub min_token_lifetime_ms: u32,
    /// Longest security token lifetime the server grants, in milliseconds.
    #[serde(default = "defaults::max_token_lifetime_ms")]
    pub max_token_lifetime_ms: u32,
    /// Fraction of a token lifetime after which clients are expected to renew.
    #[serde(default = "defaults::renew_fraction")]
    pub renew_fraction: f64,
    /// Fraction of a token lifetime the token is still accepted after it
    /// has elapsed.
    #[serde(default = "defaults::grace_fraction")]
    pub grace_fraction: f64,
    /// Timeout of a publish request whose header has no timeout hint, in
    /// milliseconds.
    #[serde(default = "defaults::publish_timeout_default_ms")]
    pub publish_timeout_default_ms: u64,
    /// Server limits.
    #[serde(default)]
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_name: defaults::application_name(),
            min_token_lifetime_ms: defaults::min_token_lifetime_ms(),
            max_token_lifetime_ms: defaults::max_token_lifetime_ms(),
            renew_fraction: defaults::renew_fraction(),
            grace_fraction: defaults::grace_fraction(),
            publish_timeout_default_ms: defaults::publish_timeout_default_ms(),
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    /// Lifetime rules for the security tokens of every channel.
    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            min_lifetime_ms: self.min_token_lifetime_ms,
            max_lifetime_ms: self.max_token_lifetime_ms,
            renew_fraction: self.renew_fraction,
            grace_fraction: self.grace_fraction,
        }
    }
}

impl Config for ServerConfig {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.application_name.is_empty() {
            errors.push("application_name is empty".to_owned());
        }
        if let Err(e) = self.token_policy().validate() {
            errors.extend(e);
        }
        if self.publish_timeout_default_ms == 0 {
            errors.push("publish_timeout_default_ms must be positive".to_owned());
        }
        self.limits.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

mod defaults {
    use crate::constants;

    pub fn application_name() -> String {
        "OPC UA Server".to_owned()
    }
    pub fn min_token_lifetime_ms() -> u32 {
        constants::MIN_TOKEN_LIFETIME_MS
    }
    pub fn max_token_lifetime_ms() -> u32 {
        constants::MAX_TOKEN_LIFETIME_MS
    }
    pub fn renew_fraction() -> f64 {
        constants::TOKEN_RENEW_FRACTION
    }
    pub fn grace_fraction() -> f64 {
        constants::TOKEN_GRACE_FRACTION
    }
    pub fn publish_timeout_default_ms() -> u64 {
        constants::DEFAULT_PUBLISH_TIMEOUT_MS
    }
}

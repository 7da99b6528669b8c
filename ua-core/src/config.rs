// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Common utilities for configuration files in both the server and client.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use thiserror::Error;

/// Error returned from saving or loading config objects.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration is invalid, with a list of validation errors.
    #[error("Configuration is invalid: {}", .0.join(", "))]
    ConfigInvalid(Vec<String>),
    /// Reading or writing file failed.
    #[error("Failed to read or write configuration: {0}")]
    IO(#[from] std::io::Error),
    /// Failed to serialize or deserialize config object.
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A trait that handles the loading / saving and validity of configuration information for a
/// client and/or server.
pub trait Config: serde::Serialize {
    /// Save the configuration object to a file.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate().map_err(ConfigError::ConfigInvalid)?;
        let s = serde_yaml::to_string(&self)?;
        let mut f = File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Load the configuration object from the given path. The loaded object
    /// is validated before it is returned.
    fn load<A>(path: &Path) -> Result<A, ConfigError>
    where
        for<'de> A: Config + serde::Deserialize<'de>,
    {
        let mut f = File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let config: A = serde_yaml::from_str(&s)?;
        config.validate().map_err(ConfigError::ConfigInvalid)?;
        Ok(config)
    }

    /// Validate the config struct, returning a list of validation errors if it fails.
    fn validate(&self) -> Result<(), Vec<String>>;
}

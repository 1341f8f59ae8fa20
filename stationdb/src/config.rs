// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Station configuration.
//!
//! The configuration is an explicitly constructed value handed to
//! [`StationDatabase::new`](crate::database::StationDatabase::new); there is
//! no process-global lookup. It can be deserialized from a TOML file:
//!
//! ```toml
//! [database]
//! cache_expires = 3600
//! cache_refresh = 600
//!
//! [ans]
//! founder = "moky@anywhere"
//! ```

use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default cache-entry lifespan, in seconds
pub const DEFAULT_CACHE_EXPIRES: u64 = 3600;
/// Default refresh margin: an entry becomes refresh-eligible this many
/// seconds before it expires
pub const DEFAULT_CACHE_REFRESH: u64 = 600;

/// Station database configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cache tuning
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Address-name records to seed into the registry at startup,
    /// `name = "identifier"`
    #[serde(default)]
    pub ans: HashMap<String, String>,
}

impl Config {
    /// Load the configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|error| ConfigError::Parse(error.to_string()))
    }
}

/// Cache tuning knobs, all in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Cache-entry lifespan
    #[serde(default = "default_expires")]
    pub cache_expires: u64,
    /// Refresh margin before expiry
    #[serde(default = "default_refresh")]
    pub cache_refresh: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            cache_expires: DEFAULT_CACHE_EXPIRES,
            cache_refresh: DEFAULT_CACHE_REFRESH,
        }
    }
}

impl DatabaseConfig {
    /// Cache-entry lifespan as a [`Duration`]
    pub fn expires(&self) -> Duration {
        Duration::from_secs(self.cache_expires)
    }

    /// Refresh margin as a [`Duration`], clamped below the lifespan
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.cache_refresh.min(self.cache_expires))
    }
}

fn default_expires() -> u64 {
    DEFAULT_CACHE_EXPIRES
}

fn default_refresh() -> u64 {
    DEFAULT_CACHE_REFRESH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(Duration::from_secs(3600), config.database.expires());
        assert_eq!(Duration::from_secs(600), config.database.refresh_margin());
        assert!(config.ans.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [database]
            cache_expires = 60
            cache_refresh = 8

            [ans]
            station = "gsp@everywhere"
            "#,
        )
        .expect("Failed to parse config");
        assert_eq!(Duration::from_secs(60), config.database.expires());
        assert_eq!(Duration::from_secs(8), config.database.refresh_margin());
        assert_eq!(Some(&"gsp@everywhere".to_string()), config.ans.get("station"));
    }

    #[test]
    fn test_refresh_margin_clamped_to_lifespan() {
        let database = DatabaseConfig {
            cache_expires: 10,
            cache_refresh: 600,
        };
        assert_eq!(Duration::from_secs(10), database.refresh_margin());
    }
}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Errors for database construction and startup.
//!
//! The cache/storage cascades themselves never raise: a sink failure is
//! reported as an absent value or a `false` save result, and it is the
//! command processors' job to translate those into protocol responses.

use core::fmt;

/// Top-level error thrown while building or preparing the station database
#[derive(Debug)]
pub enum StationError {
    /// Error propagation
    Config(ConfigError),
    /// A one-shot startup write could not be persisted in any tier
    Startup(String),
}

impl From<ConfigError> for StationError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "Configuration error: {error}"),
            Self::Startup(message) => write!(f, "Startup error: {message}"),
        }
    }
}

impl std::error::Error for StationError {}

/// Errors loading the station configuration file
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io(std::io::Error),
    /// The configuration file is not valid TOML
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(error) => write!(f, "Cannot read config file: {error}"),
            Self::Parse(message) => write!(f, "Cannot parse config file: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! # stationdb
//!
//! Multi-tier entity cache and storage core for a messaging station.
//!
//! Every entity table (contacts, command records, devices, documents,
//! address-name registry, presence) is built on the same engine: an
//! in-process TTL cache pool with a cooperative refresh window, a
//! per-operation task running the cascading read (memory, then the shared
//! cache server, then durable storage, back-filling skipped tiers) and the
//! two-sink write path, and an entity-specific conflict policy on top.
//!
//! Reads are usually served from memory; writes survive restarts as soon
//! as either sink persists them, so a cache-server outage never blocks
//! writes and a storage outage never blocks reads.
//!
//! ```
//! use stationdb::storage::memory::{MemoryCache, MemoryStorage};
//! use stationdb::{Config, StationDatabase, UserId};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let db = StationDatabase::new(
//!     &Config::default(),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(MemoryStorage::new()),
//! );
//! db.prepare().await.expect("Failed to prepare database");
//!
//! let alice = UserId::from("alice@anywhere");
//! db.save_contacts(vec![UserId::from("bob@anywhere")], &alice).await;
//! assert_eq!(1, db.get_contacts(&alice).await.len());
//! # });
//! ```

pub mod config;
pub mod database;
pub mod errors;
pub mod storage;
pub mod tables;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use database::StationDatabase;
pub use errors::{ConfigError, StationError};
pub use types::{Command, DeviceInfo, Document, DocumentType, UserId};

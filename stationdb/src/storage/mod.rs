// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Storage tiers behind the entity tables.
//!
//! Two external sinks sit below the in-memory cache pools: a fast,
//! possibly-unavailable shared cache service (e.g. a Redis server) and a
//! durable local store. Both are opaque get/save capabilities: a getter
//! that cannot reach its backend answers `None`, a saver answers `false`,
//! and the cascades degrade to the next tier. Neither trait ever surfaces
//! a fault for the core to catch.

use crate::types::{Command, DeviceInfo, Document, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

pub mod cache;
pub mod memory;
pub(crate) mod task;

pub use cache::CachePool;

/// The volatile sink: shared cache service visible to every station
/// process, holding mirrors of durable state plus the inherently
/// ephemeral presence data.
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get_contacts(&self, user: &UserId) -> Option<Vec<UserId>>;
    async fn save_contacts(&self, contacts: &[UserId], user: &UserId) -> bool;

    async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_contacts_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_block_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_block_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_mute_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_mute_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>>;
    async fn save_devices(&self, devices: &[DeviceInfo], identifier: &UserId) -> bool;

    async fn load_documents(&self, identifier: &UserId) -> Option<Vec<Document>>;
    async fn save_documents(&self, documents: &[Document], identifier: &UserId) -> bool;

    /// Single-name resolution mirror for the address-name registry
    async fn get_record(&self, name: &str) -> Option<UserId>;
    /// Reverse-index mirror: every name bound to `identifier`
    async fn get_names(&self, identifier: &UserId) -> Option<HashSet<String>>;
    async fn save_record(&self, name: &str, identifier: &UserId) -> bool;

    /// Users with at least one live socket, across all station processes
    async fn get_active_users(&self) -> Option<HashSet<UserId>>;
    /// Mirror a user's full socket set; `None` removes the user's entry
    async fn save_socket_addresses(
        &self,
        identifier: &UserId,
        addresses: Option<&HashSet<SocketAddr>>,
    ) -> bool;
    /// Drop all presence state (called once before the station starts)
    async fn clear_socket_addresses(&self) -> bool;
}

/// The durable sink: persistent local storage, source of truth whenever
/// the volatile sink is empty or unreachable.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn get_contacts(&self, user: &UserId) -> Option<Vec<UserId>>;
    async fn save_contacts(&self, contacts: &[UserId], user: &UserId) -> bool;

    async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_contacts_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_block_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_block_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_mute_command(&self, identifier: &UserId) -> Option<Command>;
    async fn save_mute_command(&self, content: &Command, identifier: &UserId) -> bool;

    async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>>;
    async fn save_devices(&self, devices: &[DeviceInfo], identifier: &UserId) -> bool;

    async fn load_documents(&self, identifier: &UserId) -> Option<Vec<Document>>;
    async fn save_documents(&self, documents: &[Document], identifier: &UserId) -> bool;
    /// Scan every stored document (search-engine feed)
    async fn scan_documents(&self) -> Option<Vec<Document>>;

    /// Load the whole name registry as one blob
    async fn load_records(&self) -> Option<HashMap<String, UserId>>;
    /// Persist the whole name registry as one atomic blob
    async fn save_records(&self, records: &HashMap<String, UserId>) -> bool;
}

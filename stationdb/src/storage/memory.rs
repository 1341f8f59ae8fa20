// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! In-memory sink implementations.
//!
//! These back the test-suite and serve as the reference semantics for real
//! sink adapters: every getter counts as one backend read, and flipping
//! `set_available(false)` makes the sink answer like an unreachable
//! backend (`None`/`false`) without touching its contents.

use crate::storage::{CacheService, StorageService};
use crate::types::{Command, DeviceInfo, Document, UserId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory stand-in for the shared cache service
#[derive(Default, Clone)]
pub struct MemoryCache {
    contacts: Arc<DashMap<UserId, Vec<UserId>>>,
    contacts_command: Arc<DashMap<UserId, Command>>,
    block_command: Arc<DashMap<UserId, Command>>,
    mute_command: Arc<DashMap<UserId, Command>>,
    devices: Arc<DashMap<UserId, Vec<DeviceInfo>>>,
    documents: Arc<DashMap<UserId, Vec<Document>>>,
    records: Arc<DashMap<String, UserId>>,
    sockets: Arc<DashMap<UserId, HashSet<SocketAddr>>>,
    reads: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let cache = Self::default();
        cache.available.store(true, Ordering::Relaxed);
        cache
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Number of backend reads served so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn up(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn read<V>(&self, value: Option<V>) -> Option<V> {
        if !self.up() {
            return None;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        value
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_contacts(&self, user: &UserId) -> Option<Vec<UserId>> {
        self.read(self.contacts.get(user).map(|v| v.clone()))
    }

    async fn save_contacts(&self, contacts: &[UserId], user: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.contacts.insert(user.clone(), contacts.to_vec());
        true
    }

    async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.contacts_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_contacts_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.contacts_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_block_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.block_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_block_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.block_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_mute_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.mute_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_mute_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.mute_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>> {
        self.read(self.devices.get(identifier).map(|v| v.clone()))
    }

    async fn save_devices(&self, devices: &[DeviceInfo], identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.devices.insert(identifier.clone(), devices.to_vec());
        true
    }

    async fn load_documents(&self, identifier: &UserId) -> Option<Vec<Document>> {
        self.read(self.documents.get(identifier).map(|v| v.clone()))
    }

    async fn save_documents(&self, documents: &[Document], identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.documents.insert(identifier.clone(), documents.to_vec());
        true
    }

    async fn get_record(&self, name: &str) -> Option<UserId> {
        self.read(self.records.get(name).map(|v| v.clone()))
    }

    async fn get_names(&self, identifier: &UserId) -> Option<HashSet<String>> {
        let names: HashSet<String> = self
            .records
            .iter()
            .filter(|kv| kv.value() == identifier)
            .map(|kv| kv.key().clone())
            .collect();
        self.read(if names.is_empty() { None } else { Some(names) })
    }

    async fn save_record(&self, name: &str, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.records.insert(name.to_string(), identifier.clone());
        true
    }

    async fn get_active_users(&self) -> Option<HashSet<UserId>> {
        self.read(Some(
            self.sockets.iter().map(|kv| kv.key().clone()).collect(),
        ))
    }

    async fn save_socket_addresses(
        &self,
        identifier: &UserId,
        addresses: Option<&HashSet<SocketAddr>>,
    ) -> bool {
        if !self.up() {
            return false;
        }
        match addresses {
            Some(addresses) => {
                self.sockets.insert(identifier.clone(), addresses.clone());
            }
            None => {
                self.sockets.remove(identifier);
            }
        }
        true
    }

    async fn clear_socket_addresses(&self) -> bool {
        if !self.up() {
            return false;
        }
        self.sockets.clear();
        true
    }
}

/// In-memory stand-in for the durable local store
#[derive(Default, Clone)]
pub struct MemoryStorage {
    contacts: Arc<DashMap<UserId, Vec<UserId>>>,
    contacts_command: Arc<DashMap<UserId, Command>>,
    block_command: Arc<DashMap<UserId, Command>>,
    mute_command: Arc<DashMap<UserId, Command>>,
    devices: Arc<DashMap<UserId, Vec<DeviceInfo>>>,
    documents: Arc<DashMap<UserId, Vec<Document>>>,
    records: Arc<DashMap<String, UserId>>,
    reads: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let storage = Self::default();
        storage.available.store(true, Ordering::Relaxed);
        storage
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Number of backend reads served so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn up(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn read<V>(&self, value: Option<V>) -> Option<V> {
        if !self.up() {
            return None;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        value
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn get_contacts(&self, user: &UserId) -> Option<Vec<UserId>> {
        self.read(self.contacts.get(user).map(|v| v.clone()))
    }

    async fn save_contacts(&self, contacts: &[UserId], user: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.contacts.insert(user.clone(), contacts.to_vec());
        true
    }

    async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.contacts_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_contacts_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.contacts_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_block_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.block_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_block_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.block_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_mute_command(&self, identifier: &UserId) -> Option<Command> {
        self.read(self.mute_command.get(identifier).map(|v| v.clone()))
    }

    async fn save_mute_command(&self, content: &Command, identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.mute_command
            .insert(identifier.clone(), content.clone());
        true
    }

    async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>> {
        self.read(self.devices.get(identifier).map(|v| v.clone()))
    }

    async fn save_devices(&self, devices: &[DeviceInfo], identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.devices.insert(identifier.clone(), devices.to_vec());
        true
    }

    async fn load_documents(&self, identifier: &UserId) -> Option<Vec<Document>> {
        self.read(self.documents.get(identifier).map(|v| v.clone()))
    }

    async fn save_documents(&self, documents: &[Document], identifier: &UserId) -> bool {
        if !self.up() {
            return false;
        }
        self.documents.insert(identifier.clone(), documents.to_vec());
        true
    }

    async fn scan_documents(&self) -> Option<Vec<Document>> {
        let all: Vec<Document> = self
            .documents
            .iter()
            .flat_map(|kv| kv.value().clone())
            .collect();
        self.read(if all.is_empty() { None } else { Some(all) })
    }

    async fn load_records(&self) -> Option<HashMap<String, UserId>> {
        let records: HashMap<String, UserId> = self
            .records
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect();
        self.read(if records.is_empty() {
            None
        } else {
            Some(records)
        })
    }

    async fn save_records(&self, records: &HashMap<String, UserId>) -> bool {
        if !self.up() {
            return false;
        }
        self.records.clear();
        for (name, identifier) in records {
            self.records.insert(name.clone(), identifier.clone());
        }
        true
    }
}

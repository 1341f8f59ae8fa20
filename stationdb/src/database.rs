// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The station database: an explicitly constructed context owning every
//! entity table and both sink handles. Command processors receive a
//! reference to this object; there is no process-global state.

use crate::config::Config;
use crate::errors::StationError;
use crate::storage::{CacheService, StorageService};
use crate::tables::{ActiveTable, AddressNameTable, DeviceTable, DocumentTable, UserTable};
use crate::types::{Command, DeviceInfo, Document, UserId};
use log::info;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Facade over the per-entity tables, sharing one volatile and one
/// durable sink
pub struct StationDatabase<C, S> {
    users: UserTable<C, S>,
    documents: DocumentTable<C, S>,
    devices: DeviceTable<C, S>,
    active: ActiveTable<C>,
    ans: AddressNameTable<C, S>,
    ans_seeds: Vec<(String, UserId)>,
    prepared: AtomicBool,
}

impl<C: CacheService, S: StorageService> StationDatabase<C, S> {
    /// Build the database from the configuration and the two sinks
    pub fn new(config: &Config, redis: Arc<C>, dos: Arc<S>) -> Self {
        let expires = config.database.expires();
        let margin = config.database.refresh_margin();
        Self {
            users: UserTable::new(redis.clone(), dos.clone(), expires, margin),
            documents: DocumentTable::new(redis.clone(), dos.clone(), expires, margin),
            devices: DeviceTable::new(redis.clone(), dos.clone(), expires, margin),
            active: ActiveTable::new(redis.clone()),
            ans: AddressNameTable::new(redis, dos, expires, margin),
            ans_seeds: config
                .ans
                .iter()
                .map(|(name, identifier)| (name.clone(), UserId::from(identifier.clone())))
                .collect(),
            prepared: AtomicBool::new(false),
        }
    }

    /// One-shot startup sequence, run before the station accepts
    /// connections: clears all presence state and seeds the configured
    /// address-name records. Subsequent calls are no-ops.
    pub async fn prepare(&self) -> Result<(), StationError> {
        if self.prepared.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.active.clear_socket_addresses().await;
        for (name, identifier) in &self.ans_seeds {
            if !self.ans.save_record(name, identifier).await {
                // unlatch so the station can retry once the sinks come back
                self.prepared.store(false, Ordering::SeqCst);
                return Err(StationError::Startup(format!(
                    "cannot seed ANS record '{name}'"
                )));
            }
        }
        info!("station database prepared ({} ANS seeds)", self.ans_seeds.len());
        Ok(())
    }

    //
    //  Contacts
    //

    pub async fn get_contacts(&self, user: &UserId) -> Vec<UserId> {
        self.users.get_contacts(user).await
    }

    pub async fn save_contacts(&self, contacts: Vec<UserId>, user: &UserId) -> bool {
        self.users.save_contacts(contacts, user).await
    }

    pub async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command> {
        self.users.get_contacts_command(identifier).await
    }

    pub async fn save_contacts_command(&self, content: Command, identifier: &UserId) -> bool {
        self.users.save_contacts_command(content, identifier).await
    }

    //
    //  Block / mute lists
    //

    pub async fn get_block_command(&self, identifier: &UserId) -> Option<Command> {
        self.users.get_block_command(identifier).await
    }

    pub async fn save_block_command(&self, content: Command, identifier: &UserId) -> bool {
        self.users.save_block_command(content, identifier).await
    }

    pub async fn get_mute_command(&self, identifier: &UserId) -> Option<Command> {
        self.users.get_mute_command(identifier).await
    }

    pub async fn save_mute_command(&self, content: Command, identifier: &UserId) -> bool {
        self.users.save_mute_command(content, identifier).await
    }

    //
    //  Devices
    //

    pub async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>> {
        self.devices.get_devices(identifier).await
    }

    pub async fn save_devices(&self, devices: Vec<DeviceInfo>, identifier: &UserId) -> bool {
        self.devices.save_devices(devices, identifier).await
    }

    pub async fn add_device(&self, device: DeviceInfo, identifier: &UserId) -> bool {
        self.devices.add_device(device, identifier).await
    }

    //
    //  Documents
    //

    pub async fn get_documents(&self, identifier: &UserId) -> Vec<Document> {
        self.documents.get_documents(identifier).await
    }

    pub async fn save_document(&self, document: Document) -> bool {
        self.documents.save_document(document).await
    }

    pub async fn scan_documents(&self) -> Vec<Document> {
        self.documents.scan_documents().await
    }

    //
    //  Address-name service
    //

    pub async fn get_record(&self, name: &str) -> Option<UserId> {
        self.ans.get_record(name).await
    }

    pub async fn get_names(&self, identifier: &UserId) -> HashSet<String> {
        self.ans.get_names(identifier).await
    }

    pub async fn save_record(&self, name: &str, identifier: &UserId) -> bool {
        self.ans.save_record(name, identifier).await
    }

    //
    //  Presence
    //

    pub async fn get_active_users(&self) -> HashSet<UserId> {
        self.active.get_active_users().await
    }

    pub async fn add_socket_address(
        &self,
        identifier: &UserId,
        address: SocketAddr,
    ) -> HashSet<SocketAddr> {
        self.active.add_socket_address(identifier, address).await
    }

    pub async fn remove_socket_address(
        &self,
        identifier: &UserId,
        address: SocketAddr,
    ) -> Option<HashSet<SocketAddr>> {
        self.active.remove_socket_address(identifier, address).await
    }

    pub async fn clear_socket_addresses(&self) -> bool {
        self.active.clear_socket_addresses().await
    }
}

// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Contact lists and moderation command records (contacts/block/mute).

use crate::storage::cache::CachePool;
use crate::storage::task::DbTask;
use crate::storage::{CacheService, StorageService};
use crate::types::{Command, UserId};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// The three stored command record kinds, each in its own pool namespace
#[derive(Debug, Clone, Copy, PartialEq)]
enum CommandKind {
    Contacts,
    Block,
    Mute,
}

struct UserPools {
    contacts: CachePool<UserId, Vec<UserId>>,
    cmd_contacts: CachePool<UserId, Command>,
    cmd_block: CachePool<UserId, Command>,
    cmd_mute: CachePool<UserId, Command>,
}

impl UserPools {
    fn command_pool(&mut self, kind: CommandKind) -> &mut CachePool<UserId, Command> {
        match kind {
            CommandKind::Contacts => &mut self.cmd_contacts,
            CommandKind::Block => &mut self.cmd_block,
            CommandKind::Mute => &mut self.cmd_mute,
        }
    }
}

struct ContactsTask<'a, C, S> {
    user: &'a UserId,
    redis: &'a C,
    dos: &'a S,
    expires: Duration,
    margin: Duration,
}

#[async_trait]
impl<C: CacheService, S: StorageService> DbTask for ContactsTask<'_, C, S> {
    type Key = UserId;
    type Value = Vec<UserId>;

    fn cache_key(&self) -> UserId {
        self.user.clone()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<Vec<UserId>> {
        // 1. check the cache server
        if let Some(contacts) = self.redis.get_contacts(self.user).await {
            return Some(contacts);
        }
        // 2. check local storage, back-filling the cache server on a hit
        let contacts = self.dos.get_contacts(self.user).await?;
        self.redis.save_contacts(&contacts, self.user).await;
        Some(contacts)
    }

    async fn write_data(&self, value: &Vec<UserId>) -> bool {
        let ok1 = self.redis.save_contacts(value, self.user).await;
        let ok2 = self.dos.save_contacts(value, self.user).await;
        ok1 || ok2
    }
}

struct CommandTask<'a, C, S> {
    kind: CommandKind,
    user: &'a UserId,
    redis: &'a C,
    dos: &'a S,
    expires: Duration,
    margin: Duration,
}

impl<C: CacheService, S: StorageService> CommandTask<'_, C, S> {
    async fn cache_get(&self) -> Option<Command> {
        match self.kind {
            CommandKind::Contacts => self.redis.get_contacts_command(self.user).await,
            CommandKind::Block => self.redis.get_block_command(self.user).await,
            CommandKind::Mute => self.redis.get_mute_command(self.user).await,
        }
    }

    async fn cache_save(&self, content: &Command) -> bool {
        match self.kind {
            CommandKind::Contacts => self.redis.save_contacts_command(content, self.user).await,
            CommandKind::Block => self.redis.save_block_command(content, self.user).await,
            CommandKind::Mute => self.redis.save_mute_command(content, self.user).await,
        }
    }

    async fn storage_get(&self) -> Option<Command> {
        match self.kind {
            CommandKind::Contacts => self.dos.get_contacts_command(self.user).await,
            CommandKind::Block => self.dos.get_block_command(self.user).await,
            CommandKind::Mute => self.dos.get_mute_command(self.user).await,
        }
    }

    async fn storage_save(&self, content: &Command) -> bool {
        match self.kind {
            CommandKind::Contacts => self.dos.save_contacts_command(content, self.user).await,
            CommandKind::Block => self.dos.save_block_command(content, self.user).await,
            CommandKind::Mute => self.dos.save_mute_command(content, self.user).await,
        }
    }
}

#[async_trait]
impl<C: CacheService, S: StorageService> DbTask for CommandTask<'_, C, S> {
    type Key = UserId;
    type Value = Command;

    fn cache_key(&self) -> UserId {
        self.user.clone()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<Command> {
        if let Some(cmd) = self.cache_get().await {
            return Some(cmd);
        }
        let cmd = self.storage_get().await?;
        self.cache_save(&cmd).await;
        Some(cmd)
    }

    async fn write_data(&self, value: &Command) -> bool {
        let ok1 = self.cache_save(value).await;
        let ok2 = self.storage_save(value).await;
        ok1 || ok2
    }
}

/// Table for contact lists and the per-user command records
pub struct UserTable<C, S> {
    redis: Arc<C>,
    dos: Arc<S>,
    expires: Duration,
    margin: Duration,
    pools: Mutex<UserPools>,
}

impl<C: CacheService, S: StorageService> UserTable<C, S> {
    pub(crate) fn new(redis: Arc<C>, dos: Arc<S>, expires: Duration, margin: Duration) -> Self {
        Self {
            redis,
            dos,
            expires,
            margin,
            pools: Mutex::new(UserPools {
                contacts: CachePool::new(),
                cmd_contacts: CachePool::new(),
                cmd_block: CachePool::new(),
                cmd_mute: CachePool::new(),
            }),
        }
    }

    fn contacts_task<'a>(&'a self, user: &'a UserId) -> ContactsTask<'a, C, S> {
        ContactsTask {
            user,
            redis: &self.redis,
            dos: &self.dos,
            expires: self.expires,
            margin: self.margin,
        }
    }

    fn command_task<'a>(&'a self, kind: CommandKind, user: &'a UserId) -> CommandTask<'a, C, S> {
        CommandTask {
            kind,
            user,
            redis: &self.redis,
            dos: &self.dos,
            expires: self.expires,
            margin: self.margin,
        }
    }

    /// Get the contact list of `user` (empty when unknown)
    pub async fn get_contacts(&self, user: &UserId) -> Vec<UserId> {
        let mut pools = self.pools.lock().await;
        let task = self.contacts_task(user);
        task.load(&mut pools.contacts).await.unwrap_or_default()
    }

    /// Replace the contact list of `user`
    pub async fn save_contacts(&self, contacts: Vec<UserId>, user: &UserId) -> bool {
        let mut pools = self.pools.lock().await;
        let task = self.contacts_task(user);
        task.save(contacts, &mut pools.contacts).await
    }

    async fn get_command(&self, kind: CommandKind, identifier: &UserId) -> Option<Command> {
        let mut pools = self.pools.lock().await;
        let task = self.command_task(kind, identifier);
        task.load(pools.command_pool(kind)).await
    }

    /// Store a command record, applying the timestamp supersession rule:
    /// an untimed record is always accepted; a timed record is rejected
    /// unless strictly newer than the stored one.
    async fn save_command(&self, kind: CommandKind, content: Command, identifier: &UserId) -> bool {
        let mut pools = self.pools.lock().await;
        let task = self.command_task(kind, identifier);
        if content.is_timed() {
            if let Some(old) = task.load(pools.command_pool(kind)).await {
                if !content.supersedes(&old) {
                    debug!(
                        "expired {:?} command dropped: {} (time {} <= {})",
                        kind, identifier, content.time, old.time
                    );
                    return false;
                }
            }
        }
        task.save(content, pools.command_pool(kind)).await
    }

    pub async fn get_contacts_command(&self, identifier: &UserId) -> Option<Command> {
        self.get_command(CommandKind::Contacts, identifier).await
    }

    pub async fn save_contacts_command(&self, content: Command, identifier: &UserId) -> bool {
        self.save_command(CommandKind::Contacts, content, identifier)
            .await
    }

    pub async fn get_block_command(&self, identifier: &UserId) -> Option<Command> {
        self.get_command(CommandKind::Block, identifier).await
    }

    pub async fn save_block_command(&self, content: Command, identifier: &UserId) -> bool {
        self.save_command(CommandKind::Block, content, identifier)
            .await
    }

    pub async fn get_mute_command(&self, identifier: &UserId) -> Option<Command> {
        self.get_command(CommandKind::Mute, identifier).await
    }

    pub async fn save_mute_command(&self, content: Command, identifier: &UserId) -> bool {
        self.save_command(CommandKind::Mute, content, identifier)
            .await
    }
}

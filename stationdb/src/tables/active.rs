// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Presence tracking.
//!
//! Socket addresses live in process memory and are mirrored best-effort
//! into the cache server so every station process can see who is online.
//! Nothing here touches durable storage: presence is ephemeral by nature.

use crate::storage::cache::CachePool;
use crate::storage::task::DbTask;
use crate::storage::CacheService;
use crate::types::UserId;
use async_trait::async_trait;
use log::info;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Pool key for the cross-process active-user set
const ACTIVE_USERS_KEY: &str = "active_users";

/// Active-user set lifespan
const ACTIVE_CACHE_EXPIRES: Duration = Duration::from_secs(60);
/// Active-user refresh margin: the set becomes refresh-eligible 8 seconds
/// after it was loaded
const ACTIVE_CACHE_REFRESH: Duration = Duration::from_secs(52);

struct ActiveState {
    pool: CachePool<String, HashSet<UserId>>,
    sockets: HashMap<UserId, HashSet<SocketAddr>>,
}

/// Read-only task for the cross-process active-user set. The set must
/// reflect every process, so it is sourced from the cache server only,
/// never from this process's socket map.
struct ActTask<'a, C> {
    redis: &'a C,
}

#[async_trait]
impl<C: CacheService> DbTask for ActTask<'_, C> {
    type Key = String;
    type Value = HashSet<UserId>;

    fn cache_key(&self) -> String {
        ACTIVE_USERS_KEY.to_string()
    }

    fn cache_expires(&self) -> Duration {
        ACTIVE_CACHE_EXPIRES
    }

    fn refresh_margin(&self) -> Duration {
        ACTIVE_CACHE_REFRESH
    }

    async fn read_data(&self) -> Option<HashSet<UserId>> {
        // an empty set is a miss: do not pin "nobody online" for a minute
        let users = self.redis.get_active_users().await?;
        if users.is_empty() {
            None
        } else {
            Some(users)
        }
    }

    async fn write_data(&self, _value: &HashSet<UserId>) -> bool {
        // presence is only ever written socket by socket
        false
    }
}

/// Table for online users and their live socket addresses
pub struct ActiveTable<C> {
    redis: Arc<C>,
    state: Mutex<ActiveState>,
}

impl<C: CacheService> ActiveTable<C> {
    pub(crate) fn new(redis: Arc<C>) -> Self {
        Self {
            redis,
            state: Mutex::new(ActiveState {
                pool: CachePool::new(),
                sockets: HashMap::new(),
            }),
        }
    }

    /// Drop all socket-address state, local and mirrored.
    /// Called once before the station starts accepting connections.
    pub async fn clear_socket_addresses(&self) -> bool {
        let mut state = self.state.lock().await;
        info!("clearing socket addresses");
        state.pool.erase(&ACTIVE_USERS_KEY.to_string());
        state.sockets.clear();
        self.redis.clear_socket_addresses().await
    }

    /// Users currently online across all station processes
    /// (read by the archivist bot)
    pub async fn get_active_users(&self) -> HashSet<UserId> {
        let mut state = self.state.lock().await;
        let task = ActTask { redis: &*self.redis };
        task.load(&mut state.pool).await.unwrap_or_default()
    }

    /// Record a new live socket for `identifier`; returns the updated set
    pub async fn add_socket_address(
        &self,
        identifier: &UserId,
        address: SocketAddr,
    ) -> HashSet<SocketAddr> {
        let mut state = self.state.lock().await;
        let sockets = state.sockets.entry(identifier.clone()).or_default();
        sockets.insert(address);
        let sockets = sockets.clone();
        self.redis
            .save_socket_addresses(identifier, Some(&sockets))
            .await;
        sockets
    }

    /// Drop a closed socket for `identifier`; returns the remaining set,
    /// or `None` once the user has no sockets left (the local entry is
    /// removed entirely)
    pub async fn remove_socket_address(
        &self,
        identifier: &UserId,
        address: SocketAddr,
    ) -> Option<HashSet<SocketAddr>> {
        let mut state = self.state.lock().await;
        let remaining = match state.sockets.get_mut(identifier) {
            None => None,
            Some(sockets) => {
                sockets.remove(&address);
                if sockets.is_empty() {
                    state.sockets.remove(identifier);
                    None
                } else {
                    Some(sockets.clone())
                }
            }
        };
        self.redis
            .save_socket_addresses(identifier, remaining.as_ref())
            .await;
        remaining
    }
}

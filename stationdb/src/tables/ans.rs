// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Address-name registry: bidirectional name <-> identifier resolution.
//!
//! The durable source of truth is a single all-records blob scanned and
//! persisted as a unit. The cache server additionally mirrors single-name
//! hits for O(1) resolution; reverse lookups (identifier -> names) are
//! computed by scanning the blob and cached per identifier. Reassigning a
//! name is a read-modify-write of the whole registry inside one critical
//! section.

use crate::storage::cache::CachePool;
use crate::storage::task::DbTask;
use crate::storage::{CacheService, StorageService};
use crate::types::UserId;
use async_trait::async_trait;
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Pool key for the all-records blob
const ALL_RECORDS_KEY: &str = "all_records";

struct AnsPools {
    /// the whole registry blob
    all: CachePool<String, HashMap<String, UserId>>,
    /// name -> identifier, confirmed negatives included
    records: CachePool<String, Option<UserId>>,
    /// identifier -> bound names (reverse index)
    names: CachePool<UserId, HashSet<String>>,
}

struct AllTask<'a, S> {
    dos: &'a S,
    expires: Duration,
    margin: Duration,
}

#[async_trait]
impl<S: StorageService> DbTask for AllTask<'_, S> {
    type Key = String;
    type Value = HashMap<String, UserId>;

    fn cache_key(&self) -> String {
        ALL_RECORDS_KEY.to_string()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<HashMap<String, UserId>> {
        self.dos.load_records().await
    }

    async fn write_data(&self, _value: &HashMap<String, UserId>) -> bool {
        // the blob is persisted explicitly by save_record
        false
    }
}

/// Reverse-index task: the cache server may hold a precomputed name set
struct NameTask<'a, C> {
    identifier: &'a UserId,
    redis: &'a C,
    expires: Duration,
    margin: Duration,
}

#[async_trait]
impl<C: CacheService> DbTask for NameTask<'_, C> {
    type Key = UserId;
    type Value = HashSet<String>;

    fn cache_key(&self) -> UserId {
        self.identifier.clone()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<HashSet<String>> {
        self.redis.get_names(self.identifier).await
    }

    async fn write_data(&self, _value: &HashSet<String>) -> bool {
        false
    }
}

/// Table for the address-name service records
pub struct AddressNameTable<C, S> {
    redis: Arc<C>,
    dos: Arc<S>,
    expires: Duration,
    margin: Duration,
    pools: Mutex<AnsPools>,
}

impl<C: CacheService, S: StorageService> AddressNameTable<C, S> {
    pub(crate) fn new(redis: Arc<C>, dos: Arc<S>, expires: Duration, margin: Duration) -> Self {
        Self {
            redis,
            dos,
            expires,
            margin,
            pools: Mutex::new(AnsPools {
                all: CachePool::new(),
                records: CachePool::new(),
                names: CachePool::new(),
            }),
        }
    }

    fn all_task(&self) -> AllTask<'_, S> {
        AllTask {
            dos: &self.dos,
            expires: self.expires,
            margin: self.margin,
        }
    }

    /// Bind `name` to `identifier`, replacing any previous binding.
    ///
    /// The whole registry blob is loaded, mutated and persisted within one
    /// critical section; the reverse-index entries of both the new owner
    /// and the name's previous owner are invalidated.
    pub async fn save_record(&self, name: &str, identifier: &UserId) -> bool {
        let mut guard = self.pools.lock().await;
        let pools = &mut *guard;
        let now = Instant::now();
        //
        //  1. update memory cache
        //
        let task = self.all_task();
        let mut all_records = task.load(&mut pools.all).await.unwrap_or_default();
        if let Some(previous) = all_records.get(name) {
            pools.names.erase(previous);
        }
        pools.names.erase(identifier);
        all_records.insert(name.to_string(), identifier.clone());
        pools.records.update(
            name.to_string(),
            Some(identifier.clone()),
            self.expires,
            self.margin,
            now,
        );
        pools.all.update(
            ALL_RECORDS_KEY.to_string(),
            all_records.clone(),
            self.expires,
            self.margin,
            now,
        );
        //
        //  2. update the cache server
        //
        self.redis.save_record(name, identifier).await;
        //
        //  3. persist the full blob
        //
        info!("saving {} ANS records ({} updated)", all_records.len(), name);
        self.dos.save_records(&all_records).await
    }

    /// Resolve `name` to an identifier. A confirmed negative is cached
    /// with the standard lifespan so repeated misses stay cheap.
    pub async fn get_record(&self, name: &str) -> Option<UserId> {
        let mut guard = self.pools.lock().await;
        let pools = &mut *guard;
        let now = Instant::now();
        //
        //  1. per-name entry first (may hold a cached negative); a
        //     refresh-flagged entry falls through to the reload below
        //
        let (cached, needs_refresh) = pools.records.fetch(&name.to_string(), now);
        if let Some(record) = cached {
            if !needs_refresh {
                return record;
            }
        }
        //
        //  2. single-record mirror, then the all-records blob
        //
        let mut record = self.redis.get_record(name).await;
        if record.is_none() {
            let task = self.all_task();
            record = task
                .load(&mut pools.all)
                .await
                .and_then(|all| all.get(name).cloned());
        }
        //
        //  3. backfill the mirror and the per-name entry
        //
        if let Some(identifier) = &record {
            self.redis.save_record(name, identifier).await;
        }
        pools
            .records
            .update(name.to_string(), record.clone(), self.expires, self.margin, now);
        record
    }

    /// All names bound to `identifier` (computed by scanning the blob
    /// unless a cached reverse entry exists)
    pub async fn get_names(&self, identifier: &UserId) -> HashSet<String> {
        let mut guard = self.pools.lock().await;
        let pools = &mut *guard;
        //
        //  1. cached reverse entry
        //
        let task = NameTask {
            identifier,
            redis: &*self.redis,
            expires: self.expires,
            margin: self.margin,
        };
        if let Some(names) = task.load(&mut pools.names).await {
            return names;
        }
        //
        //  2. scan the all-records blob
        //
        let all_task = self.all_task();
        let names: HashSet<String> = all_task
            .load(&mut pools.all)
            .await
            .map(|all| scan_names(&all, identifier))
            .unwrap_or_default();
        //
        //  3. cache the computed set
        //
        pools.names.update(
            identifier.clone(),
            names.clone(),
            self.expires,
            self.margin,
            Instant::now(),
        );
        names
    }
}

fn scan_names(records: &HashMap<String, UserId>, identifier: &UserId) -> HashSet<String> {
    records
        .iter()
        .filter(|(_, id)| *id == identifier)
        .map(|(name, _)| name.clone())
        .collect()
}

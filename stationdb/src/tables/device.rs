// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Device registrations for push notification delivery.

use crate::storage::cache::CachePool;
use crate::storage::task::DbTask;
use crate::storage::{CacheService, StorageService};
use crate::types::{insert_device, DeviceInfo, UserId};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

struct DevTask<'a, C, S> {
    identifier: &'a UserId,
    redis: &'a C,
    dos: &'a S,
    expires: Duration,
    margin: Duration,
}

#[async_trait]
impl<C: CacheService, S: StorageService> DbTask for DevTask<'_, C, S> {
    type Key = UserId;
    type Value = Vec<DeviceInfo>;

    fn cache_key(&self) -> UserId {
        self.identifier.clone()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<Vec<DeviceInfo>> {
        // 1. check the cache server
        if let Some(devices) = self.redis.get_devices(self.identifier).await {
            if !devices.is_empty() {
                return Some(devices);
            }
        }
        // 2. check local storage, back-filling the cache server on a hit
        let devices = self.dos.get_devices(self.identifier).await?;
        if devices.is_empty() {
            return None;
        }
        self.redis.save_devices(&devices, self.identifier).await;
        Some(devices)
    }

    async fn write_data(&self, value: &Vec<DeviceInfo>) -> bool {
        let ok1 = self.redis.save_devices(value, self.identifier).await;
        let ok2 = self.dos.save_devices(value, self.identifier).await;
        ok1 || ok2
    }
}

/// Table for per-user device descriptor lists
pub struct DeviceTable<C, S> {
    redis: Arc<C>,
    dos: Arc<S>,
    expires: Duration,
    margin: Duration,
    pool: Mutex<CachePool<UserId, Vec<DeviceInfo>>>,
}

impl<C: CacheService, S: StorageService> DeviceTable<C, S> {
    pub(crate) fn new(redis: Arc<C>, dos: Arc<S>, expires: Duration, margin: Duration) -> Self {
        Self {
            redis,
            dos,
            expires,
            margin,
            pool: Mutex::new(CachePool::new()),
        }
    }

    fn task<'a>(&'a self, identifier: &'a UserId) -> DevTask<'a, C, S> {
        DevTask {
            identifier,
            redis: &self.redis,
            dos: &self.dos,
            expires: self.expires,
            margin: self.margin,
        }
    }

    pub async fn get_devices(&self, identifier: &UserId) -> Option<Vec<DeviceInfo>> {
        let mut pool = self.pool.lock().await;
        let task = self.task(identifier);
        task.load(&mut pool).await
    }

    pub async fn save_devices(&self, devices: Vec<DeviceInfo>, identifier: &UserId) -> bool {
        let mut pool = self.pool.lock().await;
        let task = self.task(identifier);
        task.save(devices, &mut pool).await
    }

    /// Merge one device descriptor into the stored list.
    ///
    /// Returns `false` without writing when the descriptor is already
    /// registered unchanged.
    pub async fn add_device(&self, device: DeviceInfo, identifier: &UserId) -> bool {
        let mut pool = self.pool.lock().await;
        let task = self.task(identifier);
        let merged = match task.load(&mut pool).await {
            None => vec![device],
            Some(devices) => match insert_device(device, &devices) {
                Some(merged) => merged,
                None => {
                    debug!("device unchanged for {}", identifier);
                    return false;
                }
            },
        };
        task.save(merged, &mut pool).await
    }
}

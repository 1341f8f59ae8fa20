// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Generic read/write orchestration over the cache tiers.
//!
//! A task binds one key to the read/write strategies for one value type.
//! Tables construct a task per operation and run it against the cache pool
//! they own; the whole cascade executes inside the table's critical
//! section, so two callers can never race a load for the same key.

use crate::storage::cache::CachePool;
use async_trait::async_trait;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A per-operation unit binding one cache key to the cascading read and
/// write strategies of its table.
///
/// `read_data` is the volatile-then-durable read cascade (back-filling the
/// volatile tier when only the durable tier had the value); `write_data`
/// attempts both sink writes and reports success if either one landed.
/// The provided `load`/`save` add the in-memory tier on top.
#[async_trait]
pub(crate) trait DbTask: Send + Sync {
    type Key: Clone + Eq + Hash + Send + Sync;
    type Value: Clone + Send + Sync;

    fn cache_key(&self) -> Self::Key;

    /// Lifespan of the pool entry written by this task
    fn cache_expires(&self) -> Duration;

    /// Refresh margin of the pool entry written by this task
    fn refresh_margin(&self) -> Duration;

    /// Read through the sink tiers; `None` means absent everywhere
    async fn read_data(&self) -> Option<Self::Value>;

    /// Write through the sink tiers; `true` if at least one tier persisted
    async fn write_data(&self, value: &Self::Value) -> bool;

    /// Cascading read: memory, then the sink tiers via `read_data`.
    ///
    /// A fresh pool entry is returned as is. A stale-but-usable entry is
    /// returned after a synchronous reload attempt; if the reload comes
    /// back empty the stale value stands, without poisoning the pool. On a
    /// true miss the sink result is cached; a hard negative is not.
    async fn load(&self, pool: &mut CachePool<Self::Key, Self::Value>) -> Option<Self::Value> {
        let key = self.cache_key();
        let (cached, needs_refresh) = pool.fetch(&key, Instant::now());
        if let Some(value) = cached {
            if !needs_refresh {
                return Some(value);
            }
            // refresh window: this caller holds the reload marker
            return match self.read_data().await {
                Some(update) => {
                    pool.update(
                        key,
                        update.clone(),
                        self.cache_expires(),
                        self.refresh_margin(),
                        Instant::now(),
                    );
                    Some(update)
                }
                None => Some(value),
            };
        }
        let loaded = self.read_data().await;
        if let Some(value) = &loaded {
            pool.update(
                key,
                value.clone(),
                self.cache_expires(),
                self.refresh_margin(),
                Instant::now(),
            );
        }
        loaded
    }

    /// Cascading write: the pool entry is updated first so subsequent
    /// local reads observe the write immediately, then both sinks are
    /// attempted via `write_data`.
    async fn save(&self, value: Self::Value, pool: &mut CachePool<Self::Key, Self::Value>) -> bool {
        pool.update(
            self.cache_key(),
            value.clone(),
            self.cache_expires(),
            self.refresh_margin(),
            Instant::now(),
        );
        self.write_data(&value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    // wide expiry, short refresh window: refresh-due after 100ms
    const EXPIRES: Duration = Duration::from_secs(5);
    const MARGIN: Duration = Duration::from_millis(4900);

    struct StubTask {
        source: Mutex<Option<u32>>,
        reads: AtomicU64,
        writes_ok: bool,
    }

    impl StubTask {
        fn new(value: Option<u32>) -> Self {
            Self {
                source: Mutex::new(value),
                reads: AtomicU64::new(0),
                writes_ok: true,
            }
        }

        fn set_source(&self, value: Option<u32>) {
            *self.source.lock().unwrap() = value;
        }

        fn reads(&self) -> u64 {
            self.reads.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl DbTask for StubTask {
        type Key = &'static str;
        type Value = u32;

        fn cache_key(&self) -> &'static str {
            "k"
        }

        fn cache_expires(&self) -> Duration {
            EXPIRES
        }

        fn refresh_margin(&self) -> Duration {
            MARGIN
        }

        async fn read_data(&self) -> Option<u32> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            *self.source.lock().unwrap()
        }

        async fn write_data(&self, _value: &u32) -> bool {
            self.writes_ok
        }
    }

    #[tokio::test]
    async fn test_load_fetches_once_within_freshness_window() {
        let task = StubTask::new(Some(7));
        let mut pool = CachePool::new();

        assert_eq!(Some(7), task.load(&mut pool).await);
        assert_eq!(Some(7), task.load(&mut pool).await);
        assert_eq!(1, task.reads());
    }

    #[tokio::test]
    async fn test_load_does_not_cache_hard_negatives() {
        let task = StubTask::new(None);
        let mut pool = CachePool::new();

        assert_eq!(None, task.load(&mut pool).await);
        assert_eq!(None, task.load(&mut pool).await);
        assert_eq!(2, task.reads());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_load_refreshes_after_the_refresh_window() {
        let task = StubTask::new(Some(7));
        let mut pool = CachePool::new();
        assert_eq!(Some(7), task.load(&mut pool).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        task.set_source(Some(8));
        assert_eq!(Some(8), task.load(&mut pool).await);
        assert_eq!(2, task.reads());
    }

    #[tokio::test]
    async fn test_load_keeps_stale_value_when_refresh_comes_back_empty() {
        let task = StubTask::new(Some(7));
        let mut pool = CachePool::new();
        assert_eq!(Some(7), task.load(&mut pool).await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        task.set_source(None);
        // the reload found nothing: the stale value stands, unpoisoned
        assert_eq!(Some(7), task.load(&mut pool).await);
        assert_eq!(2, task.reads());
    }

    #[tokio::test]
    async fn test_save_updates_pool_even_when_sinks_fail() {
        let mut task = StubTask::new(None);
        task.writes_ok = false;
        let mut pool = CachePool::new();

        assert!(!task.save(9, &mut pool).await);
        // local reads still observe the write immediately
        assert_eq!(Some(9), task.load(&mut pool).await);
        assert_eq!(0, task.reads());
    }
}

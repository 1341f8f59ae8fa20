// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! In-process TTL cache pool with a separate refresh window.
//!
//! A pool is the first tier consulted by every read cascade. Each entry
//! carries two deadlines: after `refresh_at` the value is stale-but-usable
//! and one reader is expected to trigger a reload; after `expire_at` the
//! entry is treated as absent. There is no background timer, refresh is
//! cooperative and driven entirely by readers.
//!
//! Pools are not internally synchronized: every pool is owned by exactly
//! one table and only touched while that table's mutex is held.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// While a reload is in flight, other readers keep getting the stale value
/// for this long before a second reload becomes eligible
pub(crate) const RELOAD_GRACE: Duration = Duration::from_secs(32);

pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) expire_at: Instant,
    pub(crate) refresh_at: Instant,
}

/// A keyed map of [`CacheEntry`] values, one namespace per entity table
pub struct CachePool<K, V> {
    map: HashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for CachePool<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> CachePool<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` at time `now`.
    ///
    /// Returns `(None, false)` on a miss or hard expiry, `(value, false)`
    /// within the freshness window, and `(value, true)` within the refresh
    /// window. The refresh flag is handed out once per window: the entry's
    /// `refresh_at` is pushed forward by a grace interval so concurrent
    /// readers keep using the stale value while the flagged caller reloads.
    pub fn fetch(&mut self, key: &K, now: Instant) -> (Option<V>, bool) {
        let Some(entry) = self.map.get_mut(key) else {
            return (None, false);
        };
        if now >= entry.expire_at {
            // hard expiry, drop the entry
            self.map.remove(key);
            return (None, false);
        }
        if now >= entry.refresh_at {
            // the grace marker never outlives the entry itself
            entry.refresh_at = (now + RELOAD_GRACE).min(entry.expire_at);
            return (Some(entry.value.clone()), true);
        }
        (Some(entry.value.clone()), false)
    }

    /// Store `value` under `key` with the given lifespan.
    ///
    /// The entry expires at `now + lifespan` and becomes refresh-eligible
    /// `refresh_margin` before that.
    pub fn update(
        &mut self,
        key: K,
        value: V,
        lifespan: Duration,
        refresh_margin: Duration,
        now: Instant,
    ) {
        let expire_at = now + lifespan;
        let refresh_at = now + lifespan.saturating_sub(refresh_margin);
        self.map.insert(
            key,
            CacheEntry {
                value,
                expire_at,
                refresh_at,
            },
        );
    }

    /// Mutate a live entry in place without touching its deadlines.
    ///
    /// Returns `false` when there is no usable entry (missing or expired);
    /// the mutator is not called in that case.
    pub fn modify(&mut self, key: &K, now: Instant, mutator: impl FnOnce(&mut V)) -> bool {
        match self.map.get_mut(key) {
            Some(entry) if now < entry.expire_at => {
                mutator(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    /// Remove the entry for `key`, if any
    pub fn erase(&mut self, key: &K) {
        self.map.remove(key);
    }

    /// Number of live entries (expired entries are removed lazily)
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

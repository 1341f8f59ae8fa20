// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Cache pool tests

use super::*;

const LIFESPAN: Duration = Duration::from_secs(60);
const MARGIN: Duration = Duration::from_secs(10);

#[test]
fn test_fetch_within_freshness_window() {
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, LIFESPAN, MARGIN, now);

    let (value, needs_refresh) = pool.fetch(&"k", now + Duration::from_secs(1));
    assert_eq!(Some(7), value);
    assert!(!needs_refresh);
}

#[test]
fn test_fetch_miss() {
    let mut pool: CachePool<&str, u32> = CachePool::new();
    let (value, needs_refresh) = pool.fetch(&"missing", Instant::now());
    assert_eq!(None, value);
    assert!(!needs_refresh);
    assert!(pool.is_empty());
}

#[test]
fn test_fetch_hard_expiry_removes_entry() {
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, LIFESPAN, MARGIN, now);

    let (value, needs_refresh) = pool.fetch(&"k", now + LIFESPAN);
    assert_eq!(None, value);
    assert!(!needs_refresh);
    assert_eq!(0, pool.len());
}

#[test]
fn test_refresh_flag_handed_out_once_per_window() {
    // windows wide enough that the grace interval fits inside the lifespan
    let lifespan = Duration::from_secs(600);
    let margin = Duration::from_secs(300);
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, lifespan, margin, now);

    // inside the refresh window: value usable, first reader flagged
    let stale_at = now + lifespan - margin + Duration::from_secs(1);
    let (value, needs_refresh) = pool.fetch(&"k", stale_at);
    assert_eq!(Some(7), value);
    assert!(needs_refresh);

    // a second reader right behind the first is not flagged again
    let (value, needs_refresh) = pool.fetch(&"k", stale_at + Duration::from_secs(1));
    assert_eq!(Some(7), value);
    assert!(!needs_refresh);

    // once the grace interval elapses the reload becomes eligible again
    let (value, needs_refresh) = pool.fetch(&"k", stale_at + RELOAD_GRACE);
    assert_eq!(Some(7), value);
    assert!(needs_refresh);
}

#[test]
fn test_grace_marker_never_outlives_the_entry() {
    // refresh window wider than the grace interval's headroom: the bumped
    // refresh_at is clamped to expire_at instead of passing it
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, LIFESPAN, MARGIN, now);

    let stale_at = now + LIFESPAN - MARGIN + Duration::from_secs(1);
    let (value, needs_refresh) = pool.fetch(&"k", stale_at);
    assert_eq!(Some(7), value);
    assert!(needs_refresh);

    // stale reads keep working up to the very end of the lifespan
    let (value, needs_refresh) = pool.fetch(&"k", now + LIFESPAN - Duration::from_secs(1));
    assert_eq!(Some(7), value);
    assert!(!needs_refresh);

    // and the bump did not extend the entry's life
    let (value, needs_refresh) = pool.fetch(&"k", now + LIFESPAN);
    assert_eq!(None, value);
    assert!(!needs_refresh);
    assert!(pool.is_empty());
}

#[test]
fn test_update_resets_windows() {
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 1u32, LIFESPAN, MARGIN, now);

    let stale_at = now + LIFESPAN - MARGIN;
    let (_, needs_refresh) = pool.fetch(&"k", stale_at);
    assert!(needs_refresh);

    // a reload stored the new value, the windows start over
    pool.update("k", 2u32, LIFESPAN, MARGIN, stale_at);
    let (value, needs_refresh) = pool.fetch(&"k", stale_at + Duration::from_secs(1));
    assert_eq!(Some(2), value);
    assert!(!needs_refresh);
}

#[test]
fn test_zero_margin_never_flags_refresh() {
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, LIFESPAN, Duration::ZERO, now);

    let (value, needs_refresh) = pool.fetch(&"k", now + LIFESPAN - Duration::from_secs(1));
    assert_eq!(Some(7), value);
    // refresh_at == expire_at, the entry goes from fresh straight to absent
    assert!(!needs_refresh);

    let (value, _) = pool.fetch(&"k", now + LIFESPAN);
    assert_eq!(None, value);
}

#[test]
fn test_erase() {
    let mut pool = CachePool::new();
    let now = Instant::now();
    pool.update("k", 7u32, LIFESPAN, MARGIN, now);
    pool.erase(&"k");
    let (value, _) = pool.fetch(&"k", now);
    assert_eq!(None, value);
}

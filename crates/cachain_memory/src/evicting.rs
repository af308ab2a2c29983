// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Entry-bounded cache with LRU or LFU eviction and per-entry expiry.

use std::{fmt, time::Duration};

use bytes::Bytes;
use cachain_tier::{
    Cacher, Counters, Error, Key, Lifecycle, ZeroTtl, embedded_ttl,
    telemetry::{CacheActivity, CacheName, CacheOperation, Event},
};
use moka::{future::Cache, policy::EvictionPolicy};
use tick::Clock;

use crate::builder::{EvictingCacheBuilder, EvictionStrategy};

#[derive(Clone, Debug)]
struct StoredEntry {
    payload: Bytes,
    // Unix seconds; `None` never expires.
    expires_at: Option<u64>,
}

impl StoredEntry {
    fn remaining(&self, now_secs: u64) -> Option<Duration> {
        match self.expires_at {
            None => Some(Duration::ZERO),
            Some(expires_at) if expires_at > now_secs => Some(Duration::from_secs(expires_at - now_secs)),
            Some(_) => None,
        }
    }
}

type Engine = Cache<Bytes, StoredEntry>;

/// An in-process backend with a bounded number of entries and a selectable
/// eviction strategy.
///
/// Every entry carries its own time-to-live, checked against the cache clock on
/// every read. Expired entries are dropped when read or deleted, or evicted
/// when space runs out. A zero TTL stores the entry without expiry.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain_memory::{EvictingCache, EvictionStrategy};
/// use cachain_tier::{Cacher, Key};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = EvictingCache::builder(Clock::new_frozen())
///     .strategy(EvictionStrategy::Lru)
///     .max_entries(1_000)
///     .build();
/// cache.init().await.unwrap();
///
/// cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
/// assert_eq!(cache.get_with_ttl(Key::from("k")).await.unwrap().1, Duration::ZERO);
/// # });
/// ```
pub struct EvictingCache {
    name: CacheName,
    clock: Clock,
    max_entries: u64,
    strategy: EvictionStrategy,
    initial_capacity: Option<usize>,
    engine: Lifecycle<Engine>,
    counters: Counters,
}

impl fmt::Debug for EvictingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictingCache")
            .field("name", &self.name)
            .field("max_entries", &self.max_entries)
            .field("strategy", &self.strategy)
            .field("phase", &self.engine.phase())
            .finish_non_exhaustive()
    }
}

impl EvictingCache {
    /// Creates a builder reading time from `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> EvictingCacheBuilder {
        EvictingCacheBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: EvictingCacheBuilder) -> Self {
        Self {
            name: builder.name,
            clock: builder.clock,
            max_entries: builder.max_entries,
            strategy: builder.strategy,
            initial_capacity: builder.initial_capacity,
            engine: Lifecycle::new(),
            counters: Counters::new(),
        }
    }

    /// Returns the eviction strategy.
    #[must_use]
    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Drops every entry and sets the hit and miss counters back to zero.
    pub fn reset(&self) {
        if let Ok(engine) = self.engine.handle() {
            engine.invalidate_all();
        }
        self.counters.reset();
    }

    fn build_engine(&self) -> Engine {
        let policy = match self.strategy {
            EvictionStrategy::Lru => EvictionPolicy::lru(),
            EvictionStrategy::Lfu => EvictionPolicy::tiny_lfu(),
        };

        let mut builder = Cache::builder()
            .name(self.name)
            .max_capacity(self.max_entries)
            .eviction_policy(policy);

        if let Some(capacity) = self.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        builder.build()
    }
}

impl Cacher for EvictingCache {
    async fn init(&self) -> Result<(), Error> {
        if !self.engine.is_ready() {
            self.engine.install(self.build_engine());
            Event::new(self.name, CacheOperation::Init, CacheActivity::Ok).record();
        }
        Ok(())
    }

    async fn close(&self) {
        if let Some(engine) = self.engine.take_for_close() {
            engine.invalidate_all();
            Event::new(self.name, CacheOperation::Close, CacheActivity::Ok).record();
        }
    }

    async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
        self.get_with_ttl(key).await.map(|(payload, _)| payload)
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        let engine = self.engine.handle()?;
        let activity = match engine.get(key.as_bytes()).await {
            Some(entry) => match entry.remaining(embedded_ttl::unix_secs(&self.clock)) {
                Some(ttl) => {
                    self.counters.record_hit();
                    Event::new(self.name, CacheOperation::Get, CacheActivity::Hit).record();
                    return Ok((entry.payload, ttl));
                }
                None => {
                    engine.invalidate(key.as_bytes()).await;
                    CacheActivity::Expired
                }
            },
            None => CacheActivity::Miss,
        };

        self.counters.record_miss();
        Event::new(self.name, CacheOperation::Get, activity).record();
        Err(Error::miss())
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        let engine = self.engine.handle()?;
        let entry = StoredEntry {
            payload,
            expires_at: (ttl.as_secs() > 0).then(|| embedded_ttl::expiry_for(embedded_ttl::unix_secs(&self.clock), ttl)),
        };
        engine.insert(key.to_bytes(), entry).await;
        Event::new(self.name, CacheOperation::Set, CacheActivity::Inserted).record();
        Ok(())
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        let engine = self.engine.handle()?;
        match engine.remove(key.as_bytes()).await {
            Some(entry) if entry.remaining(embedded_ttl::unix_secs(&self.clock)).is_some() => {
                Event::new(self.name, CacheOperation::Del, CacheActivity::Deleted).record();
                Ok(())
            }
            _ => Err(Error::miss()),
        }
    }

    fn hits(&self) -> u64 {
        self.counters.hits()
    }

    fn misses(&self) -> u64 {
        self.counters.misses()
    }

    fn zero_ttl(&self) -> ZeroTtl {
        ZeroTtl::NoExpiry
    }
}

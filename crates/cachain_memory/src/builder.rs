// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builders for the in-process backends.
//!
//! The builders keep moka's configuration types out of the public API.

use cachain_tier::telemetry::CacheName;
use tick::Clock;

use crate::{embedded::EmbeddedTtlCache, evicting::EvictingCache};

/// Default byte budget of an [`EmbeddedTtlCache`]: 64 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

/// Default entry budget of an [`EvictingCache`].
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// How an [`EvictingCache`] picks entries to drop once it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvictionStrategy {
    /// Drop the least recently used entry.
    #[default]
    Lru,
    /// Admit and retain entries by access frequency (`TinyLFU`).
    Lfu,
}

/// Builder for an [`EmbeddedTtlCache`].
///
/// # Examples
///
/// ```
/// use cachain_memory::EmbeddedTtlCache;
/// use tick::Clock;
///
/// let cache = EmbeddedTtlCache::builder(Clock::new_frozen())
///     .name("sessions")
///     .max_size(16 * 1024 * 1024)
///     .use_ttl(true)
///     .build();
/// assert_eq!(cache.max_size(), 16 * 1024 * 1024);
/// ```
#[derive(Debug)]
pub struct EmbeddedTtlCacheBuilder {
    pub(crate) clock: Clock,
    pub(crate) name: CacheName,
    pub(crate) max_size: u64,
    pub(crate) use_ttl: bool,
    pub(crate) initial_capacity: Option<usize>,
}

impl EmbeddedTtlCacheBuilder {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: "embedded_ttl",
            max_size: DEFAULT_MAX_SIZE,
            use_ttl: true,
            initial_capacity: None,
        }
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets the byte budget shared by keys and stored values.
    ///
    /// Least recently used entries are dropped once the budget is exceeded. A single
    /// entry larger than the budget is rejected.
    #[must_use]
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Enables or disables expiry tracking.
    ///
    /// With tracking (the default) every stored value carries its expiry and a zero
    /// TTL expires the entry immediately. Without it values are stored verbatim,
    /// never expire, and report a remaining TTL of zero.
    #[must_use]
    pub fn use_ttl(mut self, enabled: bool) -> Self {
        self.use_ttl = enabled;
        self
    }

    /// Sets the pre-allocation hint for the engine.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Builds the cache. Call [`init`](cachain_tier::Cacher::init) before use.
    #[must_use]
    pub fn build(self) -> EmbeddedTtlCache {
        EmbeddedTtlCache::from_builder(self)
    }
}

/// Builder for an [`EvictingCache`].
///
/// # Examples
///
/// ```
/// use cachain_memory::{EvictingCache, EvictionStrategy};
/// use tick::Clock;
///
/// let cache = EvictingCache::builder(Clock::new_frozen())
///     .name("hot-keys")
///     .max_entries(10_000)
///     .strategy(EvictionStrategy::Lfu)
///     .build();
/// assert_eq!(cache.strategy(), EvictionStrategy::Lfu);
/// ```
#[derive(Debug)]
pub struct EvictingCacheBuilder {
    pub(crate) clock: Clock,
    pub(crate) name: CacheName,
    pub(crate) max_entries: u64,
    pub(crate) strategy: EvictionStrategy,
    pub(crate) initial_capacity: Option<usize>,
}

impl EvictingCacheBuilder {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: "evicting",
            max_entries: DEFAULT_MAX_ENTRIES,
            strategy: EvictionStrategy::default(),
            initial_capacity: None,
        }
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets the maximum number of entries.
    #[must_use]
    pub fn max_entries(mut self, entries: u64) -> Self {
        self.max_entries = entries;
        self
    }

    /// Sets the eviction strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the pre-allocation hint for the engine.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Builds the cache. Call [`init`](cachain_tier::Cacher::init) before use.
    #[must_use]
    pub fn build(self) -> EvictingCache {
        EvictingCache::from_builder(self)
    }
}

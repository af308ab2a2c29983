// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Byte-bounded cache for opaque payloads with the expiry stored in the value.

use std::{fmt, time::Duration};

use bytes::Bytes;
use cachain_tier::{
    Cacher, Counters, Error, Key, Lifecycle, ZeroTtl,
    embedded_ttl::{self, Decoded},
    telemetry::{CacheActivity, CacheName, CacheOperation, Event},
};
use moka::{future::Cache, policy::EvictionPolicy};
use tick::Clock;

use crate::builder::EmbeddedTtlCacheBuilder;

type Engine = Cache<Bytes, Bytes>;

/// An in-process backend whose engine stores opaque bytes and knows nothing about
/// expiry.
///
/// With expiry tracking enabled (the default) every value is stored with an
/// [`embedded_ttl`] trailer. Reads strip the trailer, report the remaining TTL and
/// treat an expired value as a miss, removing it on the way. Entries are bounded by
/// total bytes, key and value included.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain_memory::EmbeddedTtlCache;
/// use cachain_tier::{Cacher, Key};
/// use tick::ClockControl;
///
/// # futures::executor::block_on(async {
/// let control = ClockControl::new();
/// let cache = EmbeddedTtlCache::builder(control.to_clock()).build();
/// cache.init().await.unwrap();
///
/// cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(10)).await.unwrap();
/// control.advance(Duration::from_secs(4));
///
/// let (payload, ttl) = cache.get_with_ttl(Key::from("k")).await.unwrap();
/// assert_eq!(payload, Bytes::from_static(b"v"));
/// assert_eq!(ttl, Duration::from_secs(6));
/// # });
/// ```
pub struct EmbeddedTtlCache {
    name: CacheName,
    clock: Clock,
    max_size: u64,
    use_ttl: bool,
    initial_capacity: Option<usize>,
    engine: Lifecycle<Engine>,
    counters: Counters,
}

impl fmt::Debug for EmbeddedTtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedTtlCache")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("use_ttl", &self.use_ttl)
            .field("phase", &self.engine.phase())
            .finish_non_exhaustive()
    }
}

impl EmbeddedTtlCache {
    /// Creates a builder reading time from `clock`.
    #[must_use]
    pub fn builder(clock: Clock) -> EmbeddedTtlCacheBuilder {
        EmbeddedTtlCacheBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: EmbeddedTtlCacheBuilder) -> Self {
        Self {
            name: builder.name,
            clock: builder.clock,
            max_size: builder.max_size,
            use_ttl: builder.use_ttl,
            initial_capacity: builder.initial_capacity,
            engine: Lifecycle::new(),
            counters: Counters::new(),
        }
    }

    /// Returns the byte budget.
    #[must_use]
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Returns `true` when stored values carry their expiry.
    #[must_use]
    pub fn uses_ttl(&self) -> bool {
        self.use_ttl
    }

    /// Drops every entry and sets the hit and miss counters back to zero.
    pub fn reset(&self) {
        if let Ok(engine) = self.engine.handle() {
            engine.invalidate_all();
        }
        self.counters.reset();
    }

    fn build_engine(&self) -> Engine {
        let mut builder = Cache::builder()
            .name(self.name)
            .max_capacity(self.max_size)
            .eviction_policy(EvictionPolicy::lru())
            .weigher(|key: &Bytes, value: &Bytes| u32::try_from(key.len() + value.len()).unwrap_or(u32::MAX));

        if let Some(capacity) = self.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        builder.build()
    }

    fn miss(&self, activity: CacheActivity) -> Error {
        self.counters.record_miss();
        Event::new(self.name, CacheOperation::Get, activity).record();
        Error::miss()
    }

    fn hit(&self) {
        self.counters.record_hit();
        Event::new(self.name, CacheOperation::Get, CacheActivity::Hit).record();
    }
}

impl Cacher for EmbeddedTtlCache {
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
        let Some(stored) = engine.get(key.as_bytes()).await else {
            return Err(self.miss(CacheActivity::Miss));
        };

        if !self.use_ttl {
            self.hit();
            return Ok((stored, Duration::ZERO));
        }

        match embedded_ttl::decode(stored, embedded_ttl::unix_secs(&self.clock)) {
            Ok(Decoded::Live { payload, ttl }) => {
                self.hit();
                Ok((payload, ttl))
            }
            Ok(Decoded::Expired) => {
                engine.invalidate(key.as_bytes()).await;
                Err(self.miss(CacheActivity::Expired))
            }
            Err(error) => {
                Event::new(self.name, CacheOperation::Get, CacheActivity::Error).error(&error).record();
                Err(error)
            }
        }
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        let engine = self.engine.handle()?;
        let stored = if self.use_ttl {
            let expires_at = embedded_ttl::expiry_for(embedded_ttl::unix_secs(&self.clock), ttl);
            embedded_ttl::encode(&payload, expires_at)
        } else {
            payload
        };

        let weight = (key.len() + stored.len()) as u64;
        if weight > self.max_size {
            let error = Error::internal(format!(
                "entry of {weight} bytes exceeds the cache size of {} bytes",
                self.max_size
            ));
            Event::new(self.name, CacheOperation::Set, CacheActivity::Error).error(&error).record();
            return Err(error);
        }

        engine.insert(key.to_bytes(), stored).await;
        Event::new(self.name, CacheOperation::Set, CacheActivity::Inserted).record();
        Ok(())
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        let engine = self.engine.handle()?;
        let Some(stored) = engine.remove(key.as_bytes()).await else {
            return Err(Error::miss());
        };

        if self.use_ttl
            && let Ok(Decoded::Expired) = embedded_ttl::decode(stored, embedded_ttl::unix_secs(&self.clock))
        {
            return Err(Error::miss());
        }

        Event::new(self.name, CacheOperation::Del, CacheActivity::Deleted).record();
        Ok(())
    }

    fn hits(&self) -> u64 {
        self.counters.hits()
    }

    fn misses(&self) -> u64 {
        self.counters.misses()
    }

    fn zero_ttl(&self) -> ZeroTtl {
        if self.use_ttl { ZeroTtl::Immediate } else { ZeroTtl::NoExpiry }
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    async fn ready(control: &ClockControl) -> EmbeddedTtlCache {
        let cache = EmbeddedTtlCache::builder(control.to_clock()).build();
        cache.init().await.unwrap();
        cache
    }

    #[test]
    fn stored_value_carries_trailer() {
        block_on(async {
            let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(500));
            let cache = ready(&control).await;
            cache.set(Key::from("k"), Bytes::from_static(b"abc"), Duration::from_secs(20)).await.unwrap();

            let raw = cache.engine.handle().unwrap().get(b"k".as_slice()).await.unwrap();
            assert_eq!(raw.len(), 3 + embedded_ttl::TRAILER_LEN);
            assert_eq!(&raw[3..], &520_u64.to_le_bytes());
        });
    }

    #[test]
    fn corrupt_value_is_internal_error() {
        block_on(async {
            let control = ClockControl::new();
            let cache = ready(&control).await;
            cache
                .engine
                .handle()
                .unwrap()
                .insert(Bytes::from_static(b"k"), Bytes::from_static(b"short"))
                .await;

            let error = cache.get(Key::from("k")).await.unwrap_err();
            assert_eq!(error.kind(), cachain_tier::ErrorKind::Internal);
            assert_eq!(cache.hits(), 0);
            assert_eq!(cache.misses(), 0);
        });
    }

    #[test]
    fn oversized_entry_is_rejected() {
        block_on(async {
            let cache = EmbeddedTtlCache::builder(Clock::new_frozen()).max_size(16).build();
            cache.init().await.unwrap();

            let error = cache
                .set(Key::from("k"), Bytes::from(vec![0_u8; 32]), Duration::from_secs(1))
                .await
                .unwrap_err();
            assert_eq!(error.kind(), cachain_tier::ErrorKind::Internal);
        });
    }

    #[test]
    fn reset_clears_counters() {
        block_on(async {
            let control = ClockControl::new();
            let cache = ready(&control).await;
            cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(5)).await.unwrap();
            cache.get(Key::from("k")).await.unwrap();
            cache.get(Key::from("nope")).await.unwrap_err();

            cache.reset();
            assert_eq!(cache.hits(), 0);
            assert_eq!(cache.misses(), 0);
            assert!(cache.get(Key::from("k")).await.unwrap_err().is_miss());
        });
    }
}

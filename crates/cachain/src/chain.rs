// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The multi-tier chain coordinator.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use bytes::Bytes;
use cachain_tier::{
    Cacher, Counters, DynamicCacher, Error, Key, Lifecycle, Phase, ZeroTtl,
    telemetry::{CacheActivity, CacheName, CacheOperation, Event},
};

use crate::ChainBuilder;

/// An ordered sequence of cache tiers behaving as a single cache.
///
/// Tier 0 is the fastest and is queried first. A read walks the tiers in order and
/// stops at the first hit; when backfill is on, the hit is then written into every
/// faster tier with the remaining TTL it was found with. Writes and deletes reach
/// every tier.
///
/// A tier failing with anything but a miss aborts the operation with that error,
/// unless the chain tolerates adapter errors, in which case the failure is logged at
/// WARN and the tier counts as a miss.
///
/// `Chain` implements [`Cacher`] itself, so a chain can be a tier of another chain.
/// Its hit and miss counters count logical chain reads, independent of the tiers'
/// own counters.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain::{Cacher, Chain, EmbeddedTtlCache, EvictingCache, Key};
/// use cachain_tier::DynamicCacherExt;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let clock = Clock::new_frozen();
/// let near = EvictingCache::builder(clock.clone()).build().into_dynamic();
/// let far = EmbeddedTtlCache::builder(clock).build().into_dynamic();
///
/// let chain = Chain::builder().tier(near.clone()).tier(far.clone()).build()?;
/// chain.init().await?;
///
/// // Only the far tier holds the entry
/// far.set(Key::from("user:7"), Bytes::from_static(b"ada"), Duration::from_secs(60)).await?;
///
/// assert_eq!(chain.get(Key::from("user:7")).await?, Bytes::from_static(b"ada"));
/// assert_eq!(chain.hits(), 1);
///
/// // The hit was copied into the near tier with the TTL it had left
/// assert_eq!(near.get_with_ttl(Key::from("user:7")).await?.1, Duration::from_secs(60));
/// # Ok::<(), cachain::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct Chain<T = DynamicCacher> {
    name: CacheName,
    tiers: Vec<T>,
    backfill_on_hit: AtomicBool,
    tolerate_adapter_errors: AtomicBool,
    lifecycle: Lifecycle<()>,
    counters: Counters,
}

impl<T: Cacher> Chain<T> {
    /// Starts building a chain.
    pub fn builder() -> ChainBuilder<T> {
        ChainBuilder::default()
    }

    pub(crate) fn new(name: CacheName, tiers: Vec<T>, backfill_on_hit: bool, tolerate_adapter_errors: bool) -> Self {
        Self {
            name,
            tiers,
            backfill_on_hit: AtomicBool::new(backfill_on_hit),
            tolerate_adapter_errors: AtomicBool::new(tolerate_adapter_errors),
            lifecycle: Lifecycle::new(),
            counters: Counters::new(),
        }
    }

    /// Returns the chain's name.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the number of tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always `false`: a chain has at least one tier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Returns the tier at `index`, 0 being the fastest.
    #[must_use]
    pub fn tier(&self, index: usize) -> Option<&T> {
        self.tiers.get(index)
    }

    /// Returns all tiers, fastest first.
    #[must_use]
    pub fn tiers(&self) -> &[T] {
        &self.tiers
    }

    /// Returns the lifecycle phase of the chain.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Returns whether hits are written back to faster tiers.
    #[must_use]
    pub fn backfills_on_hit(&self) -> bool {
        self.backfill_on_hit.load(Ordering::Relaxed)
    }

    /// Turns backfill on or off for subsequent reads.
    pub fn set_backfill_on_hit(&self, enabled: bool) {
        self.backfill_on_hit.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether failing tiers are treated as misses.
    #[must_use]
    pub fn tolerates_adapter_errors(&self) -> bool {
        self.tolerate_adapter_errors.load(Ordering::Relaxed)
    }

    /// Turns error tolerance on or off for subsequent operations.
    pub fn set_tolerate_adapter_errors(&self, enabled: bool) {
        self.tolerate_adapter_errors.store(enabled, Ordering::Relaxed);
    }

    /// Writes `payload` into every tier, with `ttls[i]` as the TTL of tier `i`.
    ///
    /// Tiers are written in order. Unless the chain tolerates adapter errors, the first
    /// failing tier aborts the write; tiers before it keep the new entry.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`](cachain_tier::ErrorKind::NotReady) before `init`, an
    /// internal error without touching any tier when `ttls` does not hold exactly one
    /// TTL per tier, and otherwise the error of the first failing tier.
    pub async fn set_per_tier(&self, key: Key<'_>, payload: Bytes, ttls: &[Duration]) -> Result<(), Error> {
        self.lifecycle.handle()?;
        if ttls.len() != self.tiers.len() {
            let error = Error::internal(format!(
                "expected one TTL per tier ({}), got {}",
                self.tiers.len(),
                ttls.len()
            ));
            Event::new(self.name, CacheOperation::Set, CacheActivity::Error).error(&error).record();
            return Err(error);
        }

        let mut accepted = 0_usize;
        for (index, (tier, ttl)) in self.tiers.iter().zip(ttls).enumerate() {
            match tier.set(key, payload.clone(), *ttl).await {
                Ok(()) => accepted += 1,
                Err(error) => self.tier_failed(CacheOperation::Set, index, error)?,
            }
        }

        if accepted > 0 {
            Event::new(self.name, CacheOperation::Set, CacheActivity::Inserted).record();
        }
        Ok(())
    }

    /// Walks the tiers until one hits, then backfills the faster ones.
    async fn lookup(&self, key: Key<'_>, with_ttl: bool) -> Result<(Bytes, Duration), Error> {
        self.lifecycle.handle()?;
        let backfill = self.backfills_on_hit();

        for (index, tier) in self.tiers.iter().enumerate() {
            let found = if with_ttl || backfill {
                tier.get_with_ttl(key).await
            } else {
                tier.get(key).await.map(|payload| (payload, Duration::ZERO))
            };

            match found {
                Ok((payload, ttl)) => {
                    self.counters.record_hit();
                    Event::new(self.name, CacheOperation::Get, CacheActivity::Hit).tier(index).record();
                    if backfill {
                        self.backfill(key, &payload, ttl, index).await?;
                    }
                    return Ok((payload, ttl));
                }
                Err(error) if error.is_miss() => {}
                Err(error) => self.tier_failed(CacheOperation::Get, index, error)?,
            }
        }

        self.counters.record_miss();
        Event::new(self.name, CacheOperation::Get, CacheActivity::Miss).record();
        Err(Error::miss())
    }

    /// Copies a hit found at tier `found_at` into tiers `0..found_at`.
    async fn backfill(&self, key: Key<'_>, payload: &Bytes, ttl: Duration, found_at: usize) -> Result<(), Error> {
        for (index, tier) in self.tiers.iter().enumerate().take(found_at) {
            match tier.set(key, payload.clone(), ttl).await {
                Ok(()) => Event::new(self.name, CacheOperation::Backfill, CacheActivity::Backfilled)
                    .tier(index)
                    .record(),
                Err(error) => self.tier_failed(CacheOperation::Backfill, index, error)?,
            }
        }
        Ok(())
    }

    /// Either swallows a tier failure or hands it back to abort the operation.
    fn tier_failed(&self, operation: CacheOperation, index: usize, error: Error) -> Result<(), Error> {
        if self.tolerates_adapter_errors() {
            Event::new(self.name, operation, CacheActivity::Tolerated)
                .tier(index)
                .error(&error)
                .record();
            Ok(())
        } else {
            Event::new(self.name, operation, CacheActivity::Error)
                .tier(index)
                .error(&error)
                .record();
            Err(error)
        }
    }
}

impl<T: Cacher> Cacher for Chain<T> {
    async fn init(&self) -> Result<(), Error> {
        if self.lifecycle.is_ready() {
            return Ok(());
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            if let Err(error) = tier.init().await {
                Event::new(self.name, CacheOperation::Init, CacheActivity::Error)
                    .tier(index)
                    .error(&error)
                    .record();
                return Err(error);
            }
        }

        self.lifecycle.install(());
        Event::new(self.name, CacheOperation::Init, CacheActivity::Ok).record();
        Ok(())
    }

    async fn close(&self) {
        for tier in &self.tiers {
            tier.close().await;
        }
        if self.lifecycle.take_for_close().is_some() {
            Event::new(self.name, CacheOperation::Close, CacheActivity::Ok).record();
        }
    }

    async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
        self.lookup(key, false).await.map(|(payload, _)| payload)
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        self.lookup(key, true).await
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        let ttls = vec![ttl; self.tiers.len()];
        self.set_per_tier(key, payload, &ttls).await
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        self.lifecycle.handle()?;

        let mut removed = false;
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.del(key).await {
                Ok(()) => removed = true,
                Err(error) if error.is_miss() => {}
                Err(error) => self.tier_failed(CacheOperation::Del, index, error)?,
            }
        }

        if removed {
            Event::new(self.name, CacheOperation::Del, CacheActivity::Deleted).record();
            Ok(())
        } else {
            Err(Error::miss())
        }
    }

    fn hits(&self) -> u64 {
        self.counters.hits()
    }

    fn misses(&self) -> u64 {
        self.counters.misses()
    }

    fn zero_ttl(&self) -> ZeroTtl {
        ZeroTtl::PerTier
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`Chain`].

use cachain_tier::{Cacher, DynamicCacher, Error, telemetry::CacheName};

use crate::Chain;

/// Builder for a [`Chain`].
///
/// Tiers are kept in the order they are added; the first tier added is tier 0, the
/// one queried first.
///
/// # Examples
///
/// ```
/// use cachain::{Chain, EmbeddedTtlCache, EvictingCache};
/// use cachain_tier::DynamicCacherExt;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let chain = Chain::builder()
///     .name("sessions")
///     .tier(EvictingCache::builder(clock.clone()).build().into_dynamic())
///     .tier(EmbeddedTtlCache::builder(clock).build().into_dynamic())
///     .tolerate_adapter_errors(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(chain.len(), 2);
/// assert!(chain.backfills_on_hit());
/// ```
#[derive(Debug)]
#[must_use]
pub struct ChainBuilder<T = DynamicCacher> {
    name: CacheName,
    tiers: Vec<T>,
    backfill_on_hit: bool,
    tolerate_adapter_errors: bool,
}

impl<T> Default for ChainBuilder<T> {
    fn default() -> Self {
        Self {
            name: "chain",
            tiers: Vec::new(),
            backfill_on_hit: true,
            tolerate_adapter_errors: false,
        }
    }
}

impl<T: Cacher> ChainBuilder<T> {
    /// Sets the name reported in logs.
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Appends a tier after the ones already added.
    pub fn tier(mut self, tier: T) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Appends several tiers, in iteration order.
    pub fn tiers(mut self, tiers: impl IntoIterator<Item = T>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    /// Whether a hit on a slower tier is written back to the faster ones. On by default.
    pub fn backfill_on_hit(mut self, enabled: bool) -> Self {
        self.backfill_on_hit = enabled;
        self
    }

    /// Whether failing tiers are treated as misses instead of aborting. Off by default.
    pub fn tolerate_adapter_errors(mut self, enabled: bool) -> Self {
        self.tolerate_adapter_errors = enabled;
        self
    }

    /// Builds the chain.
    ///
    /// # Errors
    ///
    /// Returns an internal error when no tier was added.
    pub fn build(self) -> Result<Chain<T>, Error> {
        if self.tiers.is_empty() {
            return Err(Error::internal("a chain needs at least one tier"));
        }
        Ok(Chain::new(
            self.name,
            self.tiers,
            self.backfill_on_hit,
            self.tolerate_adapter_errors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use cachain_tier::testing::MockCacher;
    use tick::Clock;

    use super::*;

    #[test]
    fn empty_chain_is_rejected() {
        let error = ChainBuilder::<MockCacher>::default().build().unwrap_err();
        assert!(error.to_string().contains("at least one tier"), "got: {error}");
    }

    #[test]
    fn defaults() {
        let chain = ChainBuilder::default().tier(MockCacher::new(Clock::new_frozen())).build().unwrap();
        assert_eq!(chain.name(), "chain");
        assert!(chain.backfills_on_hit());
        assert!(!chain.tolerates_adapter_errors());
    }

    #[test]
    fn tiers_keep_insertion_order() {
        let clock = Clock::new_frozen();
        let (a, b, c) = (MockCacher::new(clock.clone()), MockCacher::new(clock.clone()), MockCacher::new(clock));
        let chain = ChainBuilder::default()
            .tier(a)
            .tiers([b, c])
            .backfill_on_hit(false)
            .build()
            .unwrap();

        assert_eq!(chain.len(), 3);
        assert!(!chain.backfills_on_hit());
    }
}

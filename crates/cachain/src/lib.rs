// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Composable multi-tier caching.
//!
//! Every backend implements the same [`Cacher`] contract: byte payloads under
//! [`Key`]s, whole-second TTLs, a three-kind [`Error`] and explicit `init`/`close`.
//! A [`Chain`] stacks backends into tiers, fastest first. Reads stop at the first
//! tier that hits and backfill the faster tiers with the TTL the entry had left;
//! writes and deletes reach every tier.
//!
//! # Backends
//!
//! | Backend | Crate feature | Zero TTL |
//! |---|---|---|
//! | [`EmbeddedTtlCache`]: byte-bounded, expiry stored in the value | `memory` (default) | expires immediately |
//! | [`EvictingCache`]: entry-bounded LRU or LFU | `memory` (default) | never expires |
//! | `DocumentStoreCache`: records of a document database | `remote` | never expires |
//! | `KeyValueCache`: key/value service, single or cluster | `remote` | never expires |
//! | [`Chain`] | | per tier |
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use cachain::{Cacher, Chain, EmbeddedTtlCache, EvictingCache, Key};
//! use cachain_tier::DynamicCacherExt;
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let clock = Clock::new_frozen();
//! let chain = Chain::builder()
//!     .tier(EvictingCache::builder(clock.clone()).max_entries(10_000).build().into_dynamic())
//!     .tier(EmbeddedTtlCache::builder(clock).max_size(256 * 1024 * 1024).build().into_dynamic())
//!     .build()?;
//! chain.init().await?;
//!
//! // A short TTL near the caller, a longer one further away
//! chain
//!     .set_per_tier(
//!         Key::from("greeting"),
//!         Bytes::from_static(b"hello"),
//!         &[Duration::from_secs(30), Duration::from_secs(600)],
//!     )
//!     .await?;
//! assert_eq!(chain.get(Key::from("greeting")).await?, Bytes::from_static(b"hello"));
//!
//! chain.close().await;
//! # Ok::<(), cachain::Error>(())
//! # }).unwrap();
//! ```

pub mod builder;
mod chain;

#[doc(inline)]
pub use builder::ChainBuilder;
#[doc(inline)]
pub use chain::Chain;

#[doc(inline)]
pub use cachain_tier::{
    Cacher, Counters, DynamicCacher, DynamicCacherExt, Error, ErrorKind, Key, LatencyStats, Lifecycle, Phase, Result, ZeroTtl,
    embedded_ttl, telemetry,
};

#[cfg(feature = "memory")]
#[doc(inline)]
pub use cachain_memory::{EmbeddedTtlCache, EvictingCache, EvictionStrategy};

#[cfg(feature = "remote")]
#[doc(inline)]
pub use cachain_remote::{DocumentStoreCache, DocumentStoreConfig, KeyValueCache, KeyValueConfig};

#[cfg(feature = "test-util")]
#[doc(inline)]
pub use cachain_tier::testing::{CacheOp, LogCapture, MockCacher};

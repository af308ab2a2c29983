// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process cache backends backed by moka.
//!
//! - [`EmbeddedTtlCache`] bounds entries by bytes and keeps each entry's expiry inside
//!   the stored value (see [`cachain_tier::embedded_ttl`]). A zero TTL expires the
//!   entry immediately unless expiry tracking is disabled.
//! - [`EvictingCache`] bounds entries by count, evicts by [`EvictionStrategy`] and
//!   tracks expiry per entry. A zero TTL stores the entry without expiry.
//!
//! Both read time from an injected [`tick::Clock`], so tests control expiry
//! deterministically.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use cachain_memory::EmbeddedTtlCache;
//! use cachain_tier::{Cacher, Key};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let cache = EmbeddedTtlCache::builder(Clock::new_frozen()).max_size(1024 * 1024).build();
//! cache.init().await?;
//!
//! cache.set(Key::from("greeting"), Bytes::from_static(b"hello"), Duration::from_secs(60)).await?;
//! assert_eq!(cache.get(Key::from("greeting")).await?, Bytes::from_static(b"hello"));
//!
//! cache.close().await;
//! # Ok::<(), cachain_tier::Error>(())
//! # }).unwrap();
//! ```

pub mod builder;
mod embedded;
mod evicting;

#[doc(inline)]
pub use builder::{EmbeddedTtlCacheBuilder, EvictingCacheBuilder, EvictionStrategy};
#[doc(inline)]
pub use embedded::EmbeddedTtlCache;
#[doc(inline)]
pub use evicting::EvictingCache;

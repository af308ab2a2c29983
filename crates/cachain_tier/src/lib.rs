// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The capability contract every cache backend satisfies.
//!
//! This crate defines the [`Cacher`] trait implemented by every backend adapter and by
//! the chain coordinator itself, the [`Key`] type addressing entries, the three-kind
//! [`Error`] taxonomy, and the small building blocks adapters share: atomic
//! [`Counters`], request [`LatencyStats`], the [`Lifecycle`] state machine owning the
//! engine handle, and the [`embedded_ttl`] codec for engines with no native expiry.
//!
//! # Implementing a Backend
//!
//! ```
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use cachain_tier::{Cacher, Counters, Error, Key, ZeroTtl};
//! use parking_lot::Mutex;
//!
//! #[derive(Default)]
//! struct MapCacher {
//!     data: Mutex<HashMap<Vec<u8>, Bytes>>,
//!     counters: Counters,
//! }
//!
//! impl Cacher for MapCacher {
//!     async fn init(&self) -> Result<(), Error> {
//!         Ok(())
//!     }
//!
//!     async fn close(&self) {}
//!
//!     async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
//!         self.get_with_ttl(key).await.map(|(payload, _)| payload)
//!     }
//!
//!     async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
//!         match self.data.lock().get(key.as_bytes()) {
//!             Some(payload) => {
//!                 self.counters.record_hit();
//!                 Ok((payload.clone(), Duration::ZERO))
//!             }
//!             None => {
//!                 self.counters.record_miss();
//!                 Err(Error::miss())
//!             }
//!         }
//!     }
//!
//!     async fn set(&self, key: Key<'_>, payload: Bytes, _ttl: Duration) -> Result<(), Error> {
//!         self.data.lock().insert(key.as_bytes().to_vec(), payload);
//!         Ok(())
//!     }
//!
//!     async fn del(&self, key: Key<'_>) -> Result<(), Error> {
//!         self.data.lock().remove(key.as_bytes()).map(|_| ()).ok_or_else(Error::miss)
//!     }
//!
//!     fn hits(&self) -> u64 {
//!         self.counters.hits()
//!     }
//!
//!     fn misses(&self) -> u64 {
//!         self.counters.misses()
//!     }
//!
//!     fn zero_ttl(&self) -> ZeroTtl {
//!         ZeroTtl::NoExpiry
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! Enable the `dynamic-cache` feature for [`DynamicCacher`], which wraps any `Cacher`
//! in a type-erased, clonable container. Chains of heterogeneous backends are built
//! from `DynamicCacher` tiers.

pub mod embedded_ttl;
pub mod error;
mod key;
mod lifecycle;
mod stats;
pub mod telemetry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[cfg(any(test, feature = "dynamic-cache"))]
mod dynamic;

#[cfg(any(test, feature = "dynamic-cache"))]
#[doc(inline)]
pub use dynamic::{DynamicCacher, DynamicCacherExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use key::Key;
#[doc(inline)]
pub use lifecycle::{Lifecycle, Phase};
#[doc(inline)]
pub use stats::{Counters, LatencyStats};
#[doc(inline)]
pub use tier::{Cacher, ZeroTtl};

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache backends.
//!
//! [`Cacher`] defines the operation set every backend adapter exposes. The chain
//! coordinator implements it too, so chains nest like any other backend.

use std::time::Duration;

use bytes::Bytes;

use crate::{Error, Key};

/// What a time-to-live of zero means when passed to [`Cacher::set`].
///
/// Backends disagree on this, and the difference is observable, so each backend
/// declares its own meaning instead of having it silently reinterpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZeroTtl {
    /// The entry never expires.
    NoExpiry,
    /// The entry is already expired; the next read reports a miss.
    Immediate,
    /// Each tier of a chain applies its own meaning.
    PerTier,
}

/// Trait for cache backend implementations.
///
/// Every operation other than the counters and [`zero_ttl`](Cacher::zero_ttl) fails
/// with [`ErrorKind::NotReady`](crate::ErrorKind::NotReady) until [`init`](Cacher::init)
/// succeeds and again after [`close`](Cacher::close).
///
/// Misses are reported exclusively through [`ErrorKind::Miss`](crate::ErrorKind::Miss);
/// a successful read always carries the stored payload.
///
/// Time-to-live values have whole-second granularity. Sub-second parts are truncated
/// on write and remaining TTLs are rounded down.
#[cfg_attr(
    any(test, feature = "dynamic-cache"),
    dynosaur::dynosaur(pub(crate) DynCacher = dyn(box) Cacher, bridge(none))
)]
pub trait Cacher: Send + Sync {
    /// Acquires the underlying engine. Calling it on a ready cacher is a no-op.
    fn init(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Releases the underlying engine. Calling it more than once is a no-op.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Gets the payload stored under `key`.
    fn get(&self, key: Key<'_>) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// Gets the payload stored under `key` together with its remaining time-to-live.
    ///
    /// Entries without an expiry report [`Duration::ZERO`].
    fn get_with_ttl(&self, key: Key<'_>) -> impl Future<Output = Result<(Bytes, Duration), Error>> + Send;

    /// Stores `payload` under `key` for `ttl`.
    ///
    /// The meaning of a zero `ttl` is given by [`zero_ttl`](Cacher::zero_ttl).
    fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the entry stored under `key`.
    ///
    /// Reports a miss when there was nothing to remove.
    fn del(&self, key: Key<'_>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the number of reads that found an entry.
    fn hits(&self) -> u64;

    /// Returns the number of reads that found nothing.
    fn misses(&self) -> u64;

    /// Returns what a zero time-to-live means for this backend.
    fn zero_ttl(&self) -> ZeroTtl;
}

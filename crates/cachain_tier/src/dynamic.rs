// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic cacher wrapper for type erasure.

use std::{fmt::Debug, sync::Arc, time::Duration};

use bytes::Bytes;

use crate::{Cacher, Error, Key, ZeroTtl, tier::DynCacher};

/// Extension trait for converting any `Cacher` into a `DynamicCacher`.
///
/// This trait is automatically implemented for all types that implement `Cacher`.
///
/// # Examples
///
/// ```
/// use cachain_tier::{Cacher, DynamicCacher, DynamicCacherExt};
///
/// fn erase<T>(backend: T) -> DynamicCacher
/// where
///     T: Cacher + 'static,
/// {
///     backend.into_dynamic()
/// }
/// ```
pub trait DynamicCacherExt: Sized {
    /// Converts this cacher into a `DynamicCacher`.
    fn into_dynamic(self) -> DynamicCacher;
}

impl<T> DynamicCacherExt for T
where
    T: Cacher + 'static,
{
    fn into_dynamic(self) -> DynamicCacher {
        DynamicCacher::new(self)
    }
}

/// A clonable cacher with type erasure.
///
/// `DynamicCacher` wraps a trait object in an `Arc`, so clones share the same
/// backend (and its counters and lifecycle). Use it to put backends of different
/// concrete types into one chain.
pub struct DynamicCacher(Arc<DynCacher<'static>>);

impl DynamicCacher {
    pub(crate) fn new<T>(backend: T) -> Self
    where
        T: Cacher + 'static,
    {
        Self(DynCacher::new_arc(backend))
    }
}

impl Debug for DynamicCacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCacher").finish()
    }
}

impl Clone for DynamicCacher {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Cacher for DynamicCacher {
    async fn init(&self) -> Result<(), Error> {
        self.0.init().await
    }

    async fn close(&self) {
        self.0.close().await;
    }

    async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
        self.0.get(key).await
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        self.0.get_with_ttl(key).await
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        self.0.set(key, payload, ttl).await
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        self.0.del(key).await
    }

    fn hits(&self) -> u64 {
        self.0.hits()
    }

    fn misses(&self) -> u64 {
        self.0.misses()
    }

    fn zero_ttl(&self) -> ZeroTtl {
        self.0.zero_ttl()
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use cachain_tier::{
    Cacher, Counters, Error, Key, Lifecycle, ZeroTtl,
    telemetry::{CacheActivity, CacheName, CacheOperation, Event},
};
use tick::Clock;

use crate::{
    KeyValueConfig,
    key_value::{KeyTtl, KeyValueClient, KeyValueConnector},
    request::{Requests, engine_error, setup_error},
};

/// A backend storing entries in a distributed in-memory key/value service.
///
/// `init` resolves the topology from the configuration, connects and pings the
/// service; a failed ping closes the fresh client and fails `init`. Reads with TTL
/// issue a GET followed by a TTL query. A zero TTL stores the key without expiry.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain_remote::{KeyValueCache, KeyValueConfig, testing::InMemoryKeyValueStore};
/// use cachain_tier::{Cacher, Key};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let clock = Clock::new_frozen();
/// let config = KeyValueConfig {
///     host: "127.0.0.1:6379".to_string(),
///     ..KeyValueConfig::default()
/// };
///
/// let cache = KeyValueCache::new(config, InMemoryKeyValueStore::new(clock.clone()), clock);
/// cache.init().await.unwrap();
/// cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
/// assert_eq!(
///     cache.get_with_ttl(Key::from("k")).await.unwrap(),
///     (Bytes::from_static(b"v"), Duration::ZERO)
/// );
/// # });
/// ```
pub struct KeyValueCache<C: KeyValueConnector> {
    name: CacheName,
    config: KeyValueConfig,
    connector: C,
    client: Lifecycle<Arc<C::Client>>,
    counters: Counters,
    requests: Requests,
}

impl<C: KeyValueConnector> fmt::Debug for KeyValueCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueCache")
            .field("name", &self.name)
            .field("host", &self.config.host)
            .field("hosts", &self.config.hosts)
            .field("cluster_mode", &self.config.cluster_mode)
            .field("phase", &self.client.phase())
            .finish_non_exhaustive()
    }
}

impl<C: KeyValueConnector> KeyValueCache<C> {
    /// Creates an uninitialized backend connecting through `connector`.
    #[must_use]
    pub fn new(config: KeyValueConfig, connector: C, clock: Clock) -> Self {
        Self {
            name: "key_value",
            config,
            connector,
            client: Lifecycle::new(),
            counters: Counters::new(),
            requests: Requests::new(clock),
        }
    }

    /// Sets the name reported in logs.
    #[must_use]
    pub fn with_name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &KeyValueConfig {
        &self.config
    }

    /// Returns the average time of the requests sent so far.
    #[must_use]
    pub fn avg_request_time(&self) -> Duration {
        self.requests.average()
    }

    /// Returns the number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.count()
    }

    fn miss(&self, duration: Duration) -> Error {
        self.counters.record_miss();
        Event::new(self.name, CacheOperation::Get, CacheActivity::Miss)
            .duration(duration)
            .record();
        Error::miss()
    }

    async fn fetch(&self, client: &C::Client, key: &[u8]) -> Result<(Bytes, Duration), Error> {
        let timed = self.requests.send(client.get(key)).await;
        match timed.result {
            Ok(Some(payload)) => Ok((payload, timed.duration)),
            Ok(None) => Err(self.miss(timed.duration)),
            Err(cause) => Err(engine_error(self.name, CacheOperation::Get, cause, timed.duration)),
        }
    }

    fn hit(&self, duration: Duration) {
        self.counters.record_hit();
        Event::new(self.name, CacheOperation::Get, CacheActivity::Hit)
            .duration(duration)
            .record();
    }
}

impl<C: KeyValueConnector> Cacher for KeyValueCache<C> {
    async fn init(&self) -> Result<(), Error> {
        if self.client.is_ready() {
            return Ok(());
        }

        let options = self
            .config
            .connect_options()
            .map_err(|error| setup_error(self.name, CacheOperation::Init, error))?;

        let connected = self.requests.send(self.connector.connect(&options)).await;
        let client = connected
            .result
            .map_err(|cause| engine_error(self.name, CacheOperation::Init, cause, connected.duration))?;

        let pinged = self.requests.send(client.ping()).await;
        if let Err(cause) = pinged.result {
            client.close().await;
            return Err(engine_error(self.name, CacheOperation::Init, cause, pinged.duration));
        }

        if let Some(previous) = self.client.install(Arc::new(client)) {
            previous.close().await;
        }
        Event::new(self.name, CacheOperation::Init, CacheActivity::Ok)
            .duration(connected.duration + pinged.duration)
            .record();
        Ok(())
    }

    async fn close(&self) {
        if let Some(client) = self.client.take_for_close() {
            client.close().await;
            Event::new(self.name, CacheOperation::Close, CacheActivity::Ok).record();
        }
    }

    async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
        let client = self.client.handle()?;
        let (payload, duration) = self.fetch(&client, key.as_bytes()).await?;
        self.hit(duration);
        Ok(payload)
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        let client = self.client.handle()?;
        let (payload, get_duration) = self.fetch(&client, key.as_bytes()).await?;

        let timed = self.requests.send(client.ttl(key.as_bytes())).await;
        let duration = get_duration + timed.duration;
        let ttl = match timed.result {
            Ok(KeyTtl::Persistent) => Duration::ZERO,
            Ok(KeyTtl::Expires(remaining)) if remaining.as_secs() > 0 => Duration::from_secs(remaining.as_secs()),
            // Expired or removed between the two requests.
            Ok(KeyTtl::Expires(_) | KeyTtl::Missing) => return Err(self.miss(duration)),
            Err(cause) => return Err(engine_error(self.name, CacheOperation::Get, cause, duration)),
        };

        self.hit(duration);
        Ok((payload, ttl))
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        let client = self.client.handle()?;

        let timed = self
            .requests
            .send(client.set(key.as_bytes(), payload, Duration::from_secs(ttl.as_secs())))
            .await;
        timed
            .result
            .map_err(|cause| engine_error(self.name, CacheOperation::Set, cause, timed.duration))?;

        Event::new(self.name, CacheOperation::Set, CacheActivity::Inserted)
            .duration(timed.duration)
            .record();
        Ok(())
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        let client = self.client.handle()?;

        let timed = self.requests.send(client.del(key.as_bytes())).await;
        match timed.result {
            Ok(0) => Err(Error::miss()),
            Ok(_) => {
                Event::new(self.name, CacheOperation::Del, CacheActivity::Deleted)
                    .duration(timed.duration)
                    .record();
                Ok(())
            }
            Err(cause) => Err(engine_error(self.name, CacheOperation::Del, cause, timed.duration)),
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

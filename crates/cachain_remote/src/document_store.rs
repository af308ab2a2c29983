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
    DocumentStoreConfig,
    document::{BinMap, DocumentClient, DocumentConnector, RecordKey},
    request::{Requests, engine_error, setup_error},
};

/// A backend storing entries as records of a document-oriented database.
///
/// Every entry is a record in the configured namespace and set, with the payload in
/// the configured bin. The record's own expiration carries the TTL, so a zero TTL
/// writes a record that never expires. String and byte keys map to string and blob
/// record keys, which the store keeps apart.
///
/// Transport failures are reported as internal errors, never as misses.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain_remote::{DocumentStoreCache, DocumentStoreConfig, testing::InMemoryDocumentStore};
/// use cachain_tier::{Cacher, Key};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let clock = Clock::new_frozen();
/// let config = DocumentStoreConfig {
///     hosts: vec!["127.0.0.1:3000".to_string()],
///     namespace: "cache".to_string(),
///     set_name: "sessions".to_string(),
///     bin_name: "payload".to_string(),
///     ..DocumentStoreConfig::default()
/// };
///
/// let cache = DocumentStoreCache::new(config, InMemoryDocumentStore::new(clock.clone()), clock);
/// cache.init().await.unwrap();
/// cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(30)).await.unwrap();
/// assert_eq!(cache.get(Key::from("k")).await.unwrap(), Bytes::from_static(b"v"));
/// # });
/// ```
pub struct DocumentStoreCache<C: DocumentConnector> {
    name: CacheName,
    config: DocumentStoreConfig,
    connector: C,
    client: Lifecycle<Arc<C::Client>>,
    counters: Counters,
    requests: Requests,
}

impl<C: DocumentConnector> fmt::Debug for DocumentStoreCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStoreCache")
            .field("name", &self.name)
            .field("hosts", &self.config.hosts)
            .field("namespace", &self.config.namespace)
            .field("set_name", &self.config.set_name)
            .field("phase", &self.client.phase())
            .finish_non_exhaustive()
    }
}

impl<C: DocumentConnector> DocumentStoreCache<C> {
    /// Creates an uninitialized backend connecting through `connector`.
    #[must_use]
    pub fn new(config: DocumentStoreConfig, connector: C, clock: Clock) -> Self {
        Self {
            name: "document_store",
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
    pub fn config(&self) -> &DocumentStoreConfig {
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

    fn record_key(&self, key: Key<'_>) -> RecordKey {
        RecordKey {
            namespace: self.config.namespace.clone(),
            set_name: self.config.set_name.clone(),
            user_key: key.into(),
        }
    }
}

impl<C: DocumentConnector> Cacher for DocumentStoreCache<C> {
    async fn init(&self) -> Result<(), Error> {
        if self.client.is_ready() {
            return Ok(());
        }

        let hosts = self
            .config
            .parse_hosts()
            .map_err(|error| setup_error(self.name, CacheOperation::Init, error))?;
        let policy = self.config.client_policy();

        let timed = self.requests.send(self.connector.connect(&policy, &hosts)).await;
        let client = timed
            .result
            .map_err(|cause| engine_error(self.name, CacheOperation::Init, cause, timed.duration))?;

        if let Some(previous) = self.client.install(Arc::new(client)) {
            previous.close().await;
        }
        Event::new(self.name, CacheOperation::Init, CacheActivity::Ok)
            .duration(timed.duration)
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
        self.get_with_ttl(key).await.map(|(payload, _)| payload)
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        let client = self.client.handle()?;
        let record_key = self.record_key(key);

        let timed = self.requests.send(client.get(&record_key)).await;
        let mut record = match timed.result {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.counters.record_miss();
                Event::new(self.name, CacheOperation::Get, CacheActivity::Miss)
                    .duration(timed.duration)
                    .record();
                return Err(Error::miss());
            }
            Err(cause) => return Err(engine_error(self.name, CacheOperation::Get, cause, timed.duration)),
        };

        let Some(payload) = record.bins.remove(&self.config.bin_name) else {
            let cause = format!("record has no bin named '{}'", self.config.bin_name);
            return Err(engine_error(self.name, CacheOperation::Get, cause.into(), timed.duration));
        };

        self.counters.record_hit();
        Event::new(self.name, CacheOperation::Get, CacheActivity::Hit)
            .duration(timed.duration)
            .record();
        Ok((payload, record.ttl))
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        let client = self.client.handle()?;
        let record_key = self.record_key(key);
        let bins = BinMap::from([(self.config.bin_name.clone(), payload)]);

        let timed = self
            .requests
            .send(client.put(&record_key, bins, Duration::from_secs(ttl.as_secs())))
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
        let record_key = self.record_key(key);

        let timed = self.requests.send(client.delete(&record_key)).await;
        match timed.result {
            Ok(true) => {
                Event::new(self.name, CacheOperation::Del, CacheActivity::Deleted)
                    .duration(timed.duration)
                    .record();
                Ok(())
            }
            Ok(false) => Err(Error::miss()),
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

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory stand-ins for the remote engines.
//!
//! [`InMemoryDocumentStore`] and [`InMemoryKeyValueStore`] act as both connector and
//! client, keep their data behind a shared lock and expire entries against the
//! supplied clock. Clones share state, so a test can keep a handle after giving one to
//! a backend and inspect connections, closes and stored data.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use cachain_tier::embedded_ttl;
use parking_lot::Mutex;
use tick::Clock;

use crate::{
    BoxError, Host,
    document::{BinMap, ClientPolicy, DocumentClient, DocumentConnector, Record, RecordKey},
    key_value::{ConnectOptions, KeyTtl, KeyValueClient, KeyValueConnector},
};

/// A request received by one of the in-memory stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// Opening a client.
    Connect,
    /// Connectivity check.
    Ping,
    /// Reading an entry.
    Get,
    /// Writing an entry.
    Set,
    /// Reading the remaining lifetime of an entry.
    Ttl,
    /// Removing an entry.
    Del,
}

type FailPredicate = Box<dyn Fn(RemoteOp) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct Stored<V> {
    value: V,
    expires_at: Option<u64>,
}

impl<V> Stored<V> {
    fn new(clock: &Clock, value: V, ttl: Duration) -> Self {
        let expires_at = (ttl.as_secs() > 0).then(|| embedded_ttl::expiry_for(embedded_ttl::unix_secs(clock), ttl));
        Self { value, expires_at }
    }

    /// Remaining lifetime, `Some(ZERO)` when persistent, `None` once expired.
    fn remaining(&self, now: u64) -> Option<Duration> {
        match self.expires_at {
            None => Some(Duration::ZERO),
            Some(expires_at) if expires_at > now => Some(Duration::from_secs(expires_at - now)),
            Some(_) => None,
        }
    }
}

struct Shared<K, V, C> {
    clock: Clock,
    data: Mutex<HashMap<K, Stored<V>>>,
    fail_when: Mutex<Option<FailPredicate>>,
    connects: Mutex<Vec<C>>,
    closes: Mutex<usize>,
}

impl<K, V, C> Shared<K, V, C> {
    fn new(clock: Clock) -> Self {
        Self {
            clock,
            data: Mutex::new(HashMap::new()),
            fail_when: Mutex::new(None),
            connects: Mutex::new(Vec::new()),
            closes: Mutex::new(0),
        }
    }

    fn check(&self, op: RemoteOp) -> Result<(), BoxError> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op));
        if fail {
            Err(format!("simulated {op:?} failure").into())
        } else {
            Ok(())
        }
    }

    fn now(&self) -> u64 {
        embedded_ttl::unix_secs(&self.clock)
    }
}

impl<K: Eq + std::hash::Hash, V: Clone, C> Shared<K, V, C> {
    /// Returns a live entry and its remaining lifetime, dropping it once expired.
    fn live(&self, key: &K) -> Option<(V, Duration)> {
        let now = self.now();
        let mut data = self.data.lock();
        let stored = data.get(key)?;
        match stored.remaining(now) {
            Some(remaining) => Some((stored.value.clone(), remaining)),
            None => {
                data.remove(key);
                None
            }
        }
    }

    fn remove_live(&self, key: &K) -> bool {
        let now = self.now();
        self.data.lock().remove(key).is_some_and(|stored| stored.remaining(now).is_some())
    }
}

/// An in-memory document store.
///
/// Records are keyed by namespace, set and user key, so a string key and a blob key
/// with the same bytes address different records.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    shared: Arc<Shared<RecordKey, BinMap, (ClientPolicy, Vec<Host>)>>,
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("records", &self.shared.data.lock().len())
            .field("connects", &self.connect_count())
            .field("closes", &self.close_count())
            .finish()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            shared: Arc::new(Shared::new(clock)),
        }
    }

    /// Sets a predicate that decides which requests fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(RemoteOp) -> bool + Send + Sync + 'static,
    {
        *self.shared.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Lets all requests succeed again.
    pub fn clear_failures(&self) {
        *self.shared.fail_when.lock() = None;
    }

    /// Returns how many clients were opened.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.shared.connects.lock().len()
    }

    /// Returns how many times a client was closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        *self.shared.closes.lock()
    }

    /// Returns the policy of the most recent connection.
    #[must_use]
    pub fn last_policy(&self) -> Option<ClientPolicy> {
        self.shared.connects.lock().last().map(|(policy, _)| policy.clone())
    }

    /// Returns the hosts of the most recent connection.
    #[must_use]
    pub fn last_hosts(&self) -> Option<Vec<Host>> {
        self.shared.connects.lock().last().map(|(_, hosts)| hosts.clone())
    }

    /// Writes a record directly, bypassing any backend.
    pub fn insert_record(&self, key: RecordKey, bins: BinMap, ttl: Duration) {
        let stored = Stored::new(&self.shared.clock, bins, ttl);
        self.shared.data.lock().insert(key, stored);
    }

    /// Returns the number of stored records, expired ones included.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.shared.data.lock().len()
    }
}

impl DocumentConnector for InMemoryDocumentStore {
    type Client = Self;

    async fn connect(&self, policy: &ClientPolicy, hosts: &[Host]) -> Result<Self::Client, BoxError> {
        self.shared.check(RemoteOp::Connect)?;
        self.shared.connects.lock().push((policy.clone(), hosts.to_vec()));
        Ok(self.clone())
    }
}

impl DocumentClient for InMemoryDocumentStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, BoxError> {
        self.shared.check(RemoteOp::Get)?;
        Ok(self.shared.live(key).map(|(bins, ttl)| Record { bins, ttl }))
    }

    async fn put(&self, key: &RecordKey, bins: BinMap, ttl: Duration) -> Result<(), BoxError> {
        self.shared.check(RemoteOp::Set)?;
        self.insert_record(key.clone(), bins, ttl);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, BoxError> {
        self.shared.check(RemoteOp::Del)?;
        Ok(self.shared.remove_live(key))
    }

    async fn close(&self) {
        *self.shared.closes.lock() += 1;
    }
}

/// An in-memory key/value service.
///
/// Besides failure injection, the store can be told to answer TTL queries as if the
/// key vanished right after it was read.
#[derive(Clone)]
pub struct InMemoryKeyValueStore {
    shared: Arc<Shared<Bytes, Bytes, ConnectOptions>>,
    vanish_before_ttl: Arc<Mutex<bool>>,
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyValueStore")
            .field("keys", &self.shared.data.lock().len())
            .field("connects", &self.connect_count())
            .field("closes", &self.close_count())
            .finish()
    }
}

impl InMemoryKeyValueStore {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            shared: Arc::new(Shared::new(clock)),
            vanish_before_ttl: Arc::new(Mutex::new(false)),
        }
    }

    /// Sets a predicate that decides which requests fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(RemoteOp) -> bool + Send + Sync + 'static,
    {
        *self.shared.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Lets all requests succeed again.
    pub fn clear_failures(&self) {
        *self.shared.fail_when.lock() = None;
    }

    /// Makes TTL queries report every key as missing.
    pub fn vanish_before_ttl(&self, enabled: bool) {
        *self.vanish_before_ttl.lock() = enabled;
    }

    /// Returns how many clients were opened.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.shared.connects.lock().len()
    }

    /// Returns how many times a client was closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        *self.shared.closes.lock()
    }

    /// Returns the options of the most recent connection.
    #[must_use]
    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.shared.connects.lock().last().cloned()
    }

    /// Returns the number of stored keys, expired ones included.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.shared.data.lock().len()
    }
}

impl KeyValueConnector for InMemoryKeyValueStore {
    type Client = Self;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Client, BoxError> {
        self.shared.check(RemoteOp::Connect)?;
        self.shared.connects.lock().push(options.clone());
        Ok(self.clone())
    }
}

impl KeyValueClient for InMemoryKeyValueStore {
    async fn ping(&self) -> Result<(), BoxError> {
        self.shared.check(RemoteOp::Ping)
    }

    async fn set(&self, key: &[u8], value: Bytes, ttl: Duration) -> Result<(), BoxError> {
        self.shared.check(RemoteOp::Set)?;
        let stored = Stored::new(&self.shared.clock, value, ttl);
        self.shared.data.lock().insert(Bytes::copy_from_slice(key), stored);
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BoxError> {
        self.shared.check(RemoteOp::Get)?;
        Ok(self.shared.live(&Bytes::copy_from_slice(key)).map(|(value, _)| value))
    }

    async fn ttl(&self, key: &[u8]) -> Result<KeyTtl, BoxError> {
        self.shared.check(RemoteOp::Ttl)?;
        if *self.vanish_before_ttl.lock() {
            return Ok(KeyTtl::Missing);
        }
        Ok(match self.shared.live(&Bytes::copy_from_slice(key)) {
            None => KeyTtl::Missing,
            Some((_, Duration::ZERO)) => KeyTtl::Persistent,
            Some((_, remaining)) => KeyTtl::Expires(remaining),
        })
    }

    async fn del(&self, key: &[u8]) -> Result<u64, BoxError> {
        self.shared.check(RemoteOp::Del)?;
        Ok(u64::from(self.shared.remove_live(&Bytes::copy_from_slice(key))))
    }

    async fn close(&self) {
        *self.shared.closes.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use cachain_tier::Key;
    use tick::ClockControl;

    use super::*;
    use crate::document::UserKey;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn record_key(user_key: UserKey) -> RecordKey {
        RecordKey {
            namespace: "ns".to_string(),
            set_name: "set".to_string(),
            user_key,
        }
    }

    #[test]
    fn document_records_expire_against_clock() {
        block_on(async {
            let control = ClockControl::new();
            let store = InMemoryDocumentStore::new(control.to_clock());
            let key = record_key(UserKey::from(Key::from("a")));

            store.put(&key, BinMap::new(), Duration::from_secs(3)).await.unwrap();
            assert_eq!(store.get(&key).await.unwrap().unwrap().ttl, Duration::from_secs(3));

            control.advance(Duration::from_secs(3));
            assert!(store.get(&key).await.unwrap().is_none());
            assert_eq!(store.record_count(), 0);
        });
    }

    #[test]
    fn string_and_blob_keys_are_distinct() {
        block_on(async {
            let store = InMemoryDocumentStore::new(Clock::new_frozen());
            let by_str = record_key(UserKey::from(Key::from("k")));
            let by_blob = record_key(UserKey::from(Key::from(b"k")));

            store.put(&by_str, BinMap::new(), Duration::ZERO).await.unwrap();
            assert!(store.get(&by_blob).await.unwrap().is_none());
            assert!(!store.delete(&by_blob).await.unwrap());
            assert!(store.delete(&by_str).await.unwrap());
        });
    }

    #[test]
    fn key_value_ttl_states() {
        block_on(async {
            let control = ClockControl::new();
            let store = InMemoryKeyValueStore::new(control.to_clock());

            store.set(b"p", Bytes::from_static(b"1"), Duration::ZERO).await.unwrap();
            store.set(b"t", Bytes::from_static(b"2"), Duration::from_secs(10)).await.unwrap();

            assert_eq!(store.ttl(b"p").await.unwrap(), KeyTtl::Persistent);
            assert_eq!(store.ttl(b"t").await.unwrap(), KeyTtl::Expires(Duration::from_secs(10)));
            assert_eq!(store.ttl(b"none").await.unwrap(), KeyTtl::Missing);

            control.advance(Duration::from_secs(10));
            assert_eq!(store.ttl(b"t").await.unwrap(), KeyTtl::Missing);
            assert_eq!(store.del(b"t").await.unwrap(), 0);
            assert_eq!(store.del(b"p").await.unwrap(), 1);
        });
    }

    #[test]
    fn injected_failures_name_the_request() {
        block_on(async {
            let store = InMemoryKeyValueStore::new(Clock::new_frozen());
            store.fail_when(|op| op == RemoteOp::Ping);

            let error = store.ping().await.unwrap_err();
            assert_eq!(error.to_string(), "simulated Ping failure");
            assert!(store.get(b"k").await.unwrap().is_none());

            store.clear_failures();
            store.ping().await.unwrap();
        });
    }
}

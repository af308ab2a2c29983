// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Network-backed cache backends.
//!
//! - [`DocumentStoreCache`] keeps entries as records of a document-oriented database,
//!   one bin per record, with the record's own expiration carrying the TTL.
//! - [`KeyValueCache`] keeps entries in a distributed in-memory key/value service,
//!   either a single server or a cluster.
//!
//! Neither backend links a client library. Each one talks to its engine through a
//! small connector and client trait pair ([`document`] and [`key_value`]) that an
//! adapter for the concrete client implements. The `test-util` feature provides
//! in-memory implementations of both.
//!
//! Both backends time every request against an injected [`tick::Clock`] and report
//! the running average through `avg_request_time`. A transport failure is always an
//! internal error, never a miss.
//!
//! # Configuration
//!
//! [`DocumentStoreConfig`] and [`KeyValueConfig`] deserialize with `serde`, so they can
//! be embedded in an application's configuration file.
//!
//! ```
//! use cachain_remote::{KeyValueCache, KeyValueConfig, testing::InMemoryKeyValueStore};
//! use cachain_tier::Cacher;
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let config: KeyValueConfig = serde_json::from_str(r#"{ "host": "10.0.0.5:6379", "pool_size": 8 }"#)?;
//!
//! let clock = Clock::new_frozen();
//! let cache = KeyValueCache::new(config, InMemoryKeyValueStore::new(clock.clone()), clock);
//! cache.init().await?;
//! cache.close().await;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

mod config;
pub mod document;
mod document_store;
pub mod key_value;
mod key_value_cache;
mod request;
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

/// Error type returned by engine clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[doc(inline)]
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONNECTION_QUEUE_SIZE, DEFAULT_IDLE_TIMEOUT, DEFAULT_LOGIN_TIMEOUT, DocumentStoreConfig,
    Host, KeyValueConfig,
};
#[doc(inline)]
pub use document::{BinMap, ClientPolicy, DocumentClient, DocumentConnector, Record, RecordKey, UserKey};
#[doc(inline)]
pub use document_store::DocumentStoreCache;
#[doc(inline)]
pub use key_value::{ConnectOptions, KeyTtl, KeyValueClient, KeyValueConnector, Topology};
#[doc(inline)]
pub use key_value_cache::KeyValueCache;

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Contract of the document-oriented database client.
//!
//! The document store keeps records addressed by namespace, set and user key. Each
//! record holds named bins and carries its own expiration. The traits below name the
//! handful of client operations the cache needs; an adapter for a concrete client
//! library implements them.

use std::{collections::HashMap, time::Duration};

use bytes::Bytes;
use cachain_tier::Key;

use crate::{BoxError, Host};

/// Connection policy handed to the connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientPolicy {
    /// User name; empty disables authentication.
    pub user: String,
    /// Password.
    pub password: String,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Login timeout.
    pub login_timeout: Duration,
    /// Connections kept per node.
    pub connection_queue_size: usize,
    /// Maximum number of connections being opened in parallel per node.
    pub opening_connection_threshold: usize,
    /// Connections opened eagerly per node.
    pub min_connections_per_node: usize,
}

/// The user part of a record key.
///
/// String and blob keys are distinct in the store, even with identical bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserKey {
    /// A string key.
    Str(String),
    /// A blob key.
    Blob(Bytes),
}

impl From<Key<'_>> for UserKey {
    fn from(key: Key<'_>) -> Self {
        match key {
            Key::Str(s) => Self::Str(s.to_owned()),
            Key::Bytes(b) => Self::Blob(Bytes::copy_from_slice(b)),
        }
    }
}

/// Full address of a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Namespace holding the record.
    pub namespace: String,
    /// Set holding the record.
    pub set_name: String,
    /// User key.
    pub user_key: UserKey,
}

/// Named bins of a record.
pub type BinMap = HashMap<String, Bytes>;

/// A record read from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// The record's bins.
    pub bins: BinMap,
    /// Remaining lifetime in whole seconds; zero when the record never expires.
    pub ttl: Duration,
}

/// Opens client connections to a document store cluster.
pub trait DocumentConnector: Send + Sync {
    /// The connected client.
    type Client: DocumentClient;

    /// Connects to the cluster reachable through `hosts`.
    fn connect(&self, policy: &ClientPolicy, hosts: &[Host]) -> impl Future<Output = Result<Self::Client, BoxError>> + Send;
}

/// A connected document store client.
pub trait DocumentClient: Send + Sync + 'static {
    /// Reads a record. `Ok(None)` means the record does not exist.
    fn get(&self, key: &RecordKey) -> impl Future<Output = Result<Option<Record>, BoxError>> + Send;

    /// Writes `bins` to a record that expires after `ttl`.
    ///
    /// A zero `ttl` writes the record without expiry.
    fn put(&self, key: &RecordKey, bins: BinMap, ttl: Duration) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Deletes a record, returning whether it existed.
    fn delete(&self, key: &RecordKey) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Closes the client and its connections.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

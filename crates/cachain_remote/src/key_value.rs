// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Contract of the distributed in-memory key/value service client.

use std::time::Duration;

use bytes::Bytes;

use crate::BoxError;

/// Which servers a client talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    /// A single server.
    Single {
        /// `host:port` of the server.
        addr: String,
    },
    /// A sharded cluster.
    Cluster {
        /// `host:port` of the seed nodes.
        addrs: Vec<String>,
    },
}

/// Options handed to the connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Servers to connect to.
    pub topology: Topology,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Retries of a failed command before giving up.
    pub max_retries: u32,
    /// Dial timeout; zero keeps the client default.
    pub dial_timeout: Duration,
    /// Read timeout; zero keeps the client default.
    pub read_timeout: Duration,
    /// Write timeout; zero keeps the client default.
    pub write_timeout: Duration,
    /// Connection pool size; zero keeps the client default.
    pub pool_size: usize,
}

/// Remaining lifetime of a key as reported by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists without expiry.
    Persistent,
    /// The key expires after the given duration.
    Expires(Duration),
}

/// Opens clients to a key/value service.
pub trait KeyValueConnector: Send + Sync {
    /// The connected client.
    type Client: KeyValueClient;

    /// Creates a client for `options`.
    fn connect(&self, options: &ConnectOptions) -> impl Future<Output = Result<Self::Client, BoxError>> + Send;
}

/// A connected key/value client.
pub trait KeyValueClient: Send + Sync + 'static {
    /// Checks connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Stores `value` under `key`, expiring after `ttl`; zero means no expiry.
    fn set(&self, key: &[u8], value: Bytes, ttl: Duration) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Reads `key`. `Ok(None)` means the key does not exist.
    fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Bytes>, BoxError>> + Send;

    /// Reads the remaining lifetime of `key`.
    fn ttl(&self, key: &[u8]) -> impl Future<Output = Result<KeyTtl, BoxError>> + Send;

    /// Removes `key`, returning the number of keys removed.
    fn del(&self, key: &[u8]) -> impl Future<Output = Result<u64, BoxError>> + Send;

    /// Closes the client.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

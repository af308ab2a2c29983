// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration of the network-backed backends.
//!
//! Both configurations deserialize with `serde`. Absent fields take their defaults,
//! and for the document store a zero timeout or pool setting also falls back to the
//! default.

use std::{fmt, str::FromStr, time::Duration};

use cachain_tier::Error;
use serde::Deserialize;

use crate::{document::ClientPolicy, key_value::{ConnectOptions, Topology}};

/// Default document store connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default document store idle connection timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(55);
/// Default document store login timeout.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Default document store connection queue size per node.
pub const DEFAULT_CONNECTION_QUEUE_SIZE: usize = 256;

/// A `host:port` endpoint.
///
/// # Examples
///
/// ```
/// use cachain_remote::Host;
///
/// let host: Host = "db-1.internal:3000".parse().unwrap();
/// assert_eq!(host.name(), "db-1.internal");
/// assert_eq!(host.port(), 3000);
/// assert!("db-1.internal".parse::<Host>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Host {
    name: String,
    port: u16,
}

impl Host {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self { name: name.into(), port }
    }

    /// Returns the host name or address.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.port)
    }
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad_format = || Error::internal(format!("bad host format '{s}', expected 'host:port'"));

        let mut parts = s.split(':');
        let (Some(name), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(bad_format());
        };
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::internal(format!("bad port in host '{s}': {e}")))?;
        Ok(Self::new(name, port))
    }
}

/// Configuration of a [`DocumentStoreCache`](crate::DocumentStoreCache).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cachain_remote::DocumentStoreConfig;
///
/// let config: DocumentStoreConfig = serde_json::from_str(
///     r#"{
///         "hosts": ["10.0.0.1:3000", "10.0.0.2:3000"],
///         "namespace": "cache",
///         "set": "sessions",
///         "bin": "payload",
///         "login_timeout_ms": 2000
///     }"#,
/// )
/// .unwrap();
///
/// let policy = config.client_policy();
/// assert_eq!(policy.login_timeout, Duration::from_secs(2));
/// assert_eq!(policy.connect_timeout, Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Seed nodes as `host:port`.
    pub hosts: Vec<String>,
    /// User name; empty disables authentication.
    pub username: String,
    /// Password.
    pub password: String,
    /// Namespace holding the records.
    pub namespace: String,
    /// Set holding the records.
    #[serde(alias = "set")]
    pub set_name: String,
    /// Bin holding the payload.
    #[serde(alias = "bin")]
    pub bin_name: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Idle connection timeout in milliseconds.
    pub idle_timeout_ms: u64,
    /// Login timeout in milliseconds.
    pub login_timeout_ms: u64,
    /// Connections kept per node.
    pub connection_queue_size: usize,
    /// Maximum number of connections being opened in parallel per node.
    pub opening_connection_threshold: usize,
    /// Connections opened eagerly per node.
    pub min_connections_per_node: usize,
}

impl DocumentStoreConfig {
    /// Returns the client policy with defaults applied to zero values.
    #[must_use]
    pub fn client_policy(&self) -> ClientPolicy {
        let millis_or = |ms: u64, default: Duration| if ms == 0 { default } else { Duration::from_millis(ms) };

        ClientPolicy {
            user: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: millis_or(self.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT),
            idle_timeout: millis_or(self.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT),
            login_timeout: millis_or(self.login_timeout_ms, DEFAULT_LOGIN_TIMEOUT),
            connection_queue_size: if self.connection_queue_size == 0 {
                DEFAULT_CONNECTION_QUEUE_SIZE
            } else {
                self.connection_queue_size
            },
            opening_connection_threshold: self.opening_connection_threshold,
            min_connections_per_node: self.min_connections_per_node,
        }
    }

    /// Parses the seed nodes.
    ///
    /// # Errors
    ///
    /// Returns an internal error when no host is configured or one of them is not
    /// `host:port`.
    pub fn parse_hosts(&self) -> Result<Vec<Host>, Error> {
        if self.hosts.is_empty() {
            return Err(Error::internal("document store hosts are not defined"));
        }
        self.hosts.iter().map(|host| host.parse()).collect()
    }
}

/// Configuration of a [`KeyValueCache`](crate::KeyValueCache).
///
/// Set `host` for a single server or `hosts` for a cluster. When only one of them is
/// given it is used for either mode.
///
/// # Examples
///
/// ```
/// use cachain_remote::{KeyValueConfig, Topology};
///
/// let config: KeyValueConfig =
///     serde_json::from_str(r#"{ "host": "127.0.0.1:6379", "cluster_mode": true }"#).unwrap();
///
/// let options = config.connect_options().unwrap();
/// assert_eq!(
///     options.topology,
///     Topology::Cluster {
///         addrs: vec!["127.0.0.1:6379".to_string()]
///     }
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyValueConfig {
    /// Cluster nodes.
    pub hosts: Vec<String>,
    /// Single server address.
    pub host: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Retries of a failed command before giving up.
    pub max_retries: u32,
    /// Dial timeout in milliseconds.
    pub dial_timeout_ms: u64,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds.
    pub write_timeout_ms: u64,
    /// Connection pool size.
    pub pool_size: usize,
    /// Connect to a cluster instead of a single server.
    pub cluster_mode: bool,
}

impl KeyValueConfig {
    /// Resolves the topology and converts the configuration into connect options.
    ///
    /// # Errors
    ///
    /// Returns an internal error when neither `host` nor `hosts` is set.
    pub fn connect_options(&self) -> Result<ConnectOptions, Error> {
        let topology = match (self.cluster_mode, self.host.is_empty(), self.hosts.first()) {
            (_, true, None) => return Err(Error::internal("no key/value host is defined")),
            (true, _, None) => Topology::Cluster {
                addrs: vec![self.host.clone()],
            },
            (true, _, Some(_)) => Topology::Cluster {
                addrs: self.hosts.clone(),
            },
            (false, true, Some(first)) => Topology::Single { addr: first.clone() },
            (false, false, _) => Topology::Single { addr: self.host.clone() },
        };

        Ok(ConnectOptions {
            topology,
            username: self.username.clone(),
            password: self.password.clone(),
            max_retries: self.max_retries,
            dial_timeout: Duration::from_millis(self.dial_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            pool_size: self.pool_size,
        })
    }
}

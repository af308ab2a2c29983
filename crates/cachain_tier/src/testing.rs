// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for code built on [`Cacher`].
//!
//! [`MockCacher`] is an in-memory backend that records every operation and supports
//! failure injection. [`LogCapture`] collects formatted `tracing` output so tests can
//! assert on what was logged.

use std::{collections::HashMap, io::Write, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::Mutex;
use tick::Clock;
use tracing_subscriber::fmt::MakeWriter;

use crate::{Cacher, Counters, Error, Key, Lifecycle, Phase, ZeroTtl, embedded_ttl};

/// Recorded cacher operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// `init` was called.
    Init,
    /// `close` was called.
    Close,
    /// `get` was called with the given key.
    Get(Bytes),
    /// `get_with_ttl` was called with the given key.
    GetWithTtl(Bytes),
    /// `set` was called.
    Set {
        /// The key written.
        key: Bytes,
        /// The payload written.
        payload: Bytes,
        /// The requested time-to-live.
        ttl: Duration,
    },
    /// `del` was called with the given key.
    Del(Bytes),
}

impl CacheOp {
    /// Returns the key the operation addressed, if any.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        match self {
            Self::Get(key) | Self::GetWithTtl(key) | Self::Del(key) | Self::Set { key, .. } => Some(key),
            Self::Init | Self::Close => None,
        }
    }

    /// Returns `true` for reads, with or without TTL.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Get(_) | Self::GetWithTtl(_))
    }
}

type FailPredicate = Box<dyn Fn(&CacheOp) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct MockEntry {
    payload: Bytes,
    expires_at: Option<u64>,
}

struct Inner {
    clock: Clock,
    data: Mutex<HashMap<Bytes, MockEntry>>,
    operations: Mutex<Vec<CacheOp>>,
    fail_when: Mutex<Option<FailPredicate>>,
    lifecycle: Lifecycle<()>,
    counters: Counters,
}

/// A configurable mock backend for testing.
///
/// Entries live in a map and expire against the supplied clock. A zero TTL means the
/// entry never expires. Clones share state, so a test can keep a handle to a mock
/// after handing it to a chain.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bytes::Bytes;
/// use cachain_tier::testing::{CacheOp, MockCacher};
/// use cachain_tier::{Cacher, Key};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cacher = MockCacher::new(Clock::new_frozen());
/// cacher.init().await.unwrap();
///
/// cacher.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(5)).await.unwrap();
/// assert_eq!(cacher.get(Key::from("k")).await.unwrap(), Bytes::from_static(b"v"));
///
/// // Fail reads of one key
/// cacher.fail_when(|op| op.is_read() && op.key() == Some(b"bad".as_slice()));
/// assert!(cacher.get(Key::from("bad")).await.is_err());
/// assert!(cacher.get(Key::from("other")).await.unwrap_err().is_miss());
/// # });
/// ```
#[derive(Clone)]
pub struct MockCacher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MockCacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCacher")
            .field("entries", &self.inner.data.lock().len())
            .field("phase", &self.inner.lifecycle.phase())
            .field("fail_when", &self.inner.fail_when.lock().is_some())
            .finish()
    }
}

impl MockCacher {
    /// Creates an uninitialized mock reading time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                data: Mutex::new(HashMap::new()),
                operations: Mutex::new(Vec::new()),
                fail_when: Mutex::new(None),
                lifecycle: Lifecycle::new(),
                counters: Counters::new(),
            }),
        }
    }

    /// Sets a predicate that decides which operations fail with an internal error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp) -> bool + Send + Sync + 'static,
    {
        *self.inner.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.inner.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp> {
        self.inner.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.inner.operations.lock().clear();
    }

    /// Sets the hit and miss counters back to zero.
    pub fn reset_counters(&self) {
        self.inner.counters.reset();
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.lifecycle.phase()
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.data.lock().len()
    }

    /// Returns `true` if an entry is stored under `key`, even if it has expired.
    #[must_use]
    pub fn contains_key<'k>(&self, key: impl Into<Key<'k>>) -> bool {
        self.inner.data.lock().contains_key(key.into().as_bytes())
    }

    fn record(&self, op: CacheOp) -> Result<(), Error> {
        let fail = self.inner.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let message = match &op {
            CacheOp::Init => "mock: init failed",
            CacheOp::Close => "mock: close failed",
            CacheOp::Get(_) | CacheOp::GetWithTtl(_) => "mock: get failed",
            CacheOp::Set { .. } => "mock: set failed",
            CacheOp::Del(_) => "mock: del failed",
        };
        self.inner.operations.lock().push(op);
        if fail { Err(Error::internal(message)) } else { Ok(()) }
    }

    fn lookup(&self, key: &[u8]) -> Result<(Bytes, Duration), Error> {
        let now = embedded_ttl::unix_secs(&self.inner.clock);
        let mut data = self.inner.data.lock();
        let Some(entry) = data.get(key) else {
            self.inner.counters.record_miss();
            return Err(Error::miss());
        };

        let ttl = match entry.expires_at {
            None => Duration::ZERO,
            Some(expires_at) if expires_at > now => Duration::from_secs(expires_at - now),
            Some(_) => {
                data.remove(key);
                self.inner.counters.record_miss();
                return Err(Error::miss());
            }
        };

        self.inner.counters.record_hit();
        Ok((entry.payload.clone(), ttl))
    }
}

impl Cacher for MockCacher {
    async fn init(&self) -> Result<(), Error> {
        self.record(CacheOp::Init)?;
        if !self.inner.lifecycle.is_ready() {
            self.inner.lifecycle.install(());
        }
        Ok(())
    }

    async fn close(&self) {
        // A failing close is still recorded; close has no way to report it.
        let _ = self.record(CacheOp::Close);
        self.inner.lifecycle.take_for_close();
    }

    async fn get(&self, key: Key<'_>) -> Result<Bytes, Error> {
        self.record(CacheOp::Get(key.to_bytes()))?;
        self.inner.lifecycle.handle()?;
        self.lookup(key.as_bytes()).map(|(payload, _)| payload)
    }

    async fn get_with_ttl(&self, key: Key<'_>) -> Result<(Bytes, Duration), Error> {
        self.record(CacheOp::GetWithTtl(key.to_bytes()))?;
        self.inner.lifecycle.handle()?;
        self.lookup(key.as_bytes())
    }

    async fn set(&self, key: Key<'_>, payload: Bytes, ttl: Duration) -> Result<(), Error> {
        self.record(CacheOp::Set {
            key: key.to_bytes(),
            payload: payload.clone(),
            ttl,
        })?;
        self.inner.lifecycle.handle()?;

        let expires_at = (ttl.as_secs() > 0).then(|| embedded_ttl::expiry_for(embedded_ttl::unix_secs(&self.inner.clock), ttl));
        self.inner.data.lock().insert(key.to_bytes(), MockEntry { payload, expires_at });
        Ok(())
    }

    async fn del(&self, key: Key<'_>) -> Result<(), Error> {
        self.record(CacheOp::Del(key.to_bytes()))?;
        self.inner.lifecycle.handle()?;
        self.inner.data.lock().remove(key.as_bytes()).map(|_| ()).ok_or_else(Error::miss)
    }

    fn hits(&self) -> u64 {
        self.inner.counters.hits()
    }

    fn misses(&self) -> u64 {
        self.inner.counters.misses()
    }

    fn zero_ttl(&self) -> ZeroTtl {
        ZeroTtl::NoExpiry
    }
}

/// Shared log capture buffer for testing.
///
/// Uses `tracing_subscriber::fmt::MakeWriter` to capture formatted, uncolored log
/// output that can be inspected in tests. Install the subscriber with
/// `tracing::subscriber::set_default` for thread-local capture.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the captured log output as a string.
    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    /// Asserts that the captured log output contains the given string.
    ///
    /// # Panics
    ///
    /// Panics when `expected` was not logged.
    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(
            output.contains(expected),
            "log output does not contain '{expected}', got:\n{output}"
        );
    }

    /// Creates a `tracing` subscriber that writes to this capture buffer.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Writer that appends to a [`LogCapture`] buffer.
#[derive(Debug)]
pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn not_ready_before_init() {
        block_on(async {
            let cacher = MockCacher::new(Clock::new_frozen());
            let error = cacher.get(Key::from("k")).await.unwrap_err();
            assert!(error.is_not_ready());
            assert_eq!(cacher.misses(), 0);
        });
    }

    #[test]
    fn ttl_counts_down_with_clock() {
        block_on(async {
            let control = tick::ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
            let cacher = MockCacher::new(control.to_clock());
            cacher.init().await.unwrap();

            cacher.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(10)).await.unwrap();
            control.advance(Duration::from_secs(3));
            let (_, ttl) = cacher.get_with_ttl(Key::from("k")).await.unwrap();
            assert_eq!(ttl, Duration::from_secs(7));

            control.advance(Duration::from_secs(7));
            assert!(cacher.get(Key::from("k")).await.unwrap_err().is_miss());
            assert!(!cacher.contains_key("k"));
        });
    }

    #[test]
    fn zero_ttl_never_expires() {
        block_on(async {
            let control = tick::ClockControl::new();
            let cacher = MockCacher::new(control.to_clock());
            cacher.init().await.unwrap();

            cacher.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
            control.advance(Duration::from_secs(86_400));
            let (_, ttl) = cacher.get_with_ttl(Key::from("k")).await.unwrap();
            assert_eq!(ttl, Duration::ZERO);
            assert_eq!(cacher.zero_ttl(), ZeroTtl::NoExpiry);
        });
    }

    #[test]
    fn failed_operations_are_recorded() {
        block_on(async {
            let cacher = MockCacher::new(Clock::new_frozen());
            cacher.fail_when(|op| matches!(op, CacheOp::Init));

            assert!(cacher.init().await.is_err());
            assert_eq!(cacher.phase(), Phase::Uninitialized);
            assert_eq!(cacher.operations(), vec![CacheOp::Init]);

            cacher.clear_failures();
            cacher.init().await.unwrap();
            assert_eq!(cacher.phase(), Phase::Ready);
        });
    }

    #[test]
    fn del_missing_key_is_miss() {
        block_on(async {
            let cacher = MockCacher::new(Clock::new_frozen());
            cacher.init().await.unwrap();
            assert!(cacher.del(Key::from("nothing")).await.unwrap_err().is_miss());
        });
    }

    #[test]
    fn close_then_reinit() {
        block_on(async {
            let cacher = MockCacher::new(Clock::new_frozen());
            cacher.init().await.unwrap();
            cacher.close().await;
            assert!(cacher.get(Key::from("k")).await.unwrap_err().is_not_ready());

            cacher.init().await.unwrap();
            assert!(cacher.get(Key::from("k")).await.unwrap_err().is_miss());
        });
    }

    #[test]
    fn log_capture_collects_output() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        tracing::info!(answer = 42, "hello");
        capture.assert_contains("hello");
        capture.assert_contains("answer=42");
    }
}

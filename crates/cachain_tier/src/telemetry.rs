// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging of cache operations.
//!
//! Every backend and the chain coordinator report what they did through an
//! [`Event`], which is emitted as a single `tracing` event named `cache.event`.
//! The level is chosen from the [`CacheActivity`]: routine outcomes such as hits and
//! misses are logged at DEBUG, lifecycle transitions at INFO, errors a chain chose to
//! tolerate at WARN and failures at ERROR.

use std::time::Duration;

use tick::Clock;

use crate::Error;

/// Static name identifying a cache instance in logs.
pub type CacheName = &'static str;

/// The operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    /// Acquiring the engine.
    Init,
    /// Releasing the engine.
    Close,
    /// Reading an entry.
    Get,
    /// Writing an entry.
    Set,
    /// Removing an entry.
    Del,
    /// Copying a hit into a faster tier.
    Backfill,
}

impl CacheOperation {
    /// Returns the name used in the `cache.operation` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "cache.init",
            Self::Close => "cache.close",
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Del => "cache.del",
            Self::Backfill => "cache.backfill",
        }
    }
}

/// The outcome an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheActivity {
    /// A read found a live entry.
    Hit,
    /// A read found nothing.
    Miss,
    /// A read found an entry past its expiry and removed it.
    Expired,
    /// An entry was written.
    Inserted,
    /// An entry was removed.
    Deleted,
    /// A hit was copied into a faster tier.
    Backfilled,
    /// A lifecycle operation completed.
    Ok,
    /// A tier failed and the chain carried on.
    Tolerated,
    /// The operation failed.
    Error,
}

/// Severity of an activity, mapped onto `tracing` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// `tracing::Level::DEBUG`
    Debug,
    /// `tracing::Level::INFO`
    Info,
    /// `tracing::Level::WARN`
    Warn,
    /// `tracing::Level::ERROR`
    Error,
}

impl CacheActivity {
    /// Returns the name used in the `cache.activity` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Inserted => "cache.inserted",
            Self::Deleted => "cache.deleted",
            Self::Backfilled => "cache.backfilled",
            Self::Ok => "cache.ok",
            Self::Tolerated => "cache.tolerated",
            Self::Error => "cache.error",
        }
    }

    /// Returns the severity events with this activity are logged at.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Expired | Self::Inserted | Self::Deleted | Self::Backfilled => Severity::Debug,
            Self::Ok => Severity::Info,
            Self::Tolerated => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

/// A single cache event.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cachain_tier::telemetry::{CacheActivity, CacheOperation, Event};
///
/// Event::new("sessions", CacheOperation::Get, CacheActivity::Hit)
///     .tier(1)
///     .duration(Duration::from_micros(250))
///     .record();
/// ```
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct Event<'a> {
    name: CacheName,
    operation: CacheOperation,
    activity: CacheActivity,
    tier: Option<usize>,
    duration: Option<Duration>,
    error: Option<&'a Error>,
}

impl<'a> Event<'a> {
    /// Creates an event for `operation` on the cache called `name`.
    pub fn new(name: CacheName, operation: CacheOperation, activity: CacheActivity) -> Self {
        Self {
            name,
            operation,
            activity,
            tier: None,
            duration: None,
            error: None,
        }
    }

    /// Attaches the index of the chain tier the event concerns.
    pub fn tier(mut self, tier: usize) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Attaches how long the operation took.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attaches the error the operation failed with.
    pub fn error(mut self, error: &'a Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Emits the event.
    pub fn record(self) {
        let name = self.name;
        let op = self.operation.as_str();
        let activity = self.activity.as_str();
        let tier = self.tier;
        let duration_ns = self.duration.map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        let error = self.error.map(tracing::field::display);

        // Tracing levels must be known at the callsite.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = name,
                    cache.operation = op,
                    cache.activity = activity,
                    cache.tier = tier,
                    cache.duration_ns = duration_ns,
                    cache.error = error,
                    "cache.event"
                )
            };
        }

        match self.activity.severity() {
            Severity::Debug => emit_event!(debug),
            Severity::Info => emit_event!(info),
            Severity::Warn => emit_event!(warn),
            Severity::Error => emit_event!(error),
        }
    }
}

/// Result of a timed async operation.
#[derive(Debug, Clone, Copy)]
pub struct TimedResult<R> {
    /// The result of the operation.
    pub result: R,
    /// The duration of the operation.
    pub duration: Duration,
}

/// Extension trait for timing async operations.
pub trait ClockExt {
    /// Times an async operation and returns both the result and elapsed duration.
    fn timed_async<F, R>(&self, f: F) -> impl Future<Output = TimedResult<R>>
    where
        F: Future<Output = R>;
}

impl ClockExt for Clock {
    async fn timed_async<F, R>(&self, f: F) -> TimedResult<R>
    where
        F: Future<Output = R>,
    {
        let start = self.instant();
        let result = f.await;
        TimedResult {
            result,
            duration: self.instant().saturating_duration_since(start),
        }
    }
}

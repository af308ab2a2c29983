// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use cachain_tier::{
    Error, LatencyStats,
    telemetry::{CacheActivity, CacheName, CacheOperation, ClockExt, Event, TimedResult},
};
use tick::Clock;

use crate::BoxError;

/// Times every request sent to the remote engine.
#[derive(Debug)]
pub(crate) struct Requests {
    clock: Clock,
    latency: LatencyStats,
}

impl Requests {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            latency: LatencyStats::new(),
        }
    }

    pub(crate) async fn send<F, R>(&self, request: F) -> TimedResult<R>
    where
        F: Future<Output = R>,
    {
        let timed = self.clock.timed_async(request).await;
        self.latency.record(timed.duration);
        timed
    }

    pub(crate) fn average(&self) -> Duration {
        self.latency.average()
    }

    pub(crate) fn count(&self) -> u64 {
        self.latency.requests()
    }
}

/// Wraps an engine failure and logs it.
pub(crate) fn engine_error(name: CacheName, operation: CacheOperation, cause: BoxError, duration: Duration) -> Error {
    let error = Error::internal(cause);
    Event::new(name, operation, CacheActivity::Error)
        .duration(duration)
        .error(&error)
        .record();
    error
}

/// Logs a failure that happened before any request was sent.
pub(crate) fn setup_error(name: CacheName, operation: CacheOperation, error: Error) -> Error {
    Event::new(name, operation, CacheActivity::Error).error(&error).record();
    error
}

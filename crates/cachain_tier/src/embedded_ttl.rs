// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expiry embedded in the stored value.
//!
//! Engines that store opaque bytes and know nothing about expiry can still honor a
//! time-to-live by carrying it inside the value. The stored form is the payload
//! followed by an 8-byte little-endian trailer holding the absolute expiry as Unix
//! seconds:
//!
//! ```text
//! +-----------------+---------------------------+
//! | payload (n)     | expires_at (u64 LE, 8)    |
//! +-----------------+---------------------------+
//! ```
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use cachain_tier::embedded_ttl::{self, Decoded};
//!
//! let now = 1_000;
//! let stored = embedded_ttl::encode(b"v1", embedded_ttl::expiry_for(now, Duration::from_secs(10)));
//! assert_eq!(stored.len(), 2 + embedded_ttl::TRAILER_LEN);
//!
//! let decoded = embedded_ttl::decode(stored.clone(), now + 4).unwrap();
//! assert_eq!(
//!     decoded,
//!     Decoded::Live {
//!         payload: Bytes::from_static(b"v1"),
//!         ttl: Duration::from_secs(6),
//!     }
//! );
//!
//! assert_eq!(embedded_ttl::decode(stored, now + 10).unwrap(), Decoded::Expired);
//! ```

use std::time::{Duration, SystemTime};

use bytes::{BufMut, Bytes, BytesMut};
use tick::Clock;

use crate::Error;

/// Length of the expiry trailer appended to every stored value.
pub const TRAILER_LEN: usize = 8;

/// A decoded stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// The entry is live.
    Live {
        /// The payload with the trailer stripped.
        payload: Bytes,
        /// Whole seconds left before expiry, always at least one.
        ttl: Duration,
    },
    /// The expiry has been reached.
    Expired,
}

/// Appends the expiry trailer to `payload`.
#[must_use]
pub fn encode(payload: &[u8], expires_at_secs: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + TRAILER_LEN);
    buf.put_slice(payload);
    buf.put_u64_le(expires_at_secs);
    buf.freeze()
}

/// Splits a stored value into payload and remaining time-to-live at `now_secs`.
///
/// # Errors
///
/// Returns [`ErrorKind::Internal`](crate::ErrorKind::Internal) when `stored` is too
/// short to carry a trailer.
pub fn decode(mut stored: Bytes, now_secs: u64) -> Result<Decoded, Error> {
    let Some(payload_len) = stored.len().checked_sub(TRAILER_LEN) else {
        return Err(Error::internal(format!(
            "stored value of {} bytes is shorter than the {TRAILER_LEN} byte expiry trailer",
            stored.len()
        )));
    };

    let trailer = stored.split_off(payload_len);
    let mut expires_at = [0_u8; TRAILER_LEN];
    expires_at.copy_from_slice(&trailer);
    let expires_at = u64::from_le_bytes(expires_at);

    match expires_at.checked_sub(now_secs) {
        Some(remaining) if remaining > 0 => Ok(Decoded::Live {
            payload: stored,
            ttl: Duration::from_secs(remaining),
        }),
        _ => Ok(Decoded::Expired),
    }
}

/// Returns the absolute expiry for an entry written at `now_secs` with `ttl`.
///
/// Sub-second parts of `ttl` are dropped.
#[must_use]
pub fn expiry_for(now_secs: u64, ttl: Duration) -> u64 {
    now_secs.saturating_add(ttl.as_secs())
}

/// Returns the current Unix time of `clock` in whole seconds.
#[must_use]
pub fn unix_secs(clock: &Clock) -> u64 {
    clock
        .system_time()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |since_epoch| since_epoch.as_secs())
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;

/// The kind of failure reported by a cache operation.
///
/// Every backend reports exactly these three kinds, regardless of the engine it wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The cacher has not been initialized yet, or has already been closed.
    NotReady,
    /// The key is absent or its entry has expired.
    Miss,
    /// The underlying engine failed. The engine's error is attached as the cause.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotReady => "cacher has not been initialized",
            Self::Miss => "key missed in cache",
            Self::Internal => "internal cache error",
        })
    }
}

/// An error from a cache operation.
///
/// Use [`Error::kind`] to tell a miss apart from a lifecycle or engine failure.
/// Engine failures keep the original error as their cause, which shows up in the
/// `Display` and `Debug` output.
///
/// # Example
///
/// ```
/// use cachain_tier::{Error, ErrorKind};
///
/// let error = Error::internal("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Internal);
/// assert!(error.to_string().contains("connection reset"));
///
/// assert!(Error::miss().is_miss());
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a [`ErrorKind::Miss`] error.
    #[must_use]
    pub fn miss() -> Self {
        Self::new(ErrorKind::Miss)
    }

    /// Creates a [`ErrorKind::NotReady`] error.
    #[must_use]
    pub fn not_ready() -> Self {
        Self::new(ErrorKind::NotReady)
    }

    /// Creates a [`ErrorKind::Internal`] error wrapping the engine's own error.
    pub fn internal(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Internal, cause)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` for [`ErrorKind::Miss`].
    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.kind == ErrorKind::Miss
    }

    /// Returns `true` for [`ErrorKind::NotReady`].
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        self.kind == ErrorKind::NotReady
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_reports_miss_kind() {
        let error = Error::miss();
        assert_eq!(error.kind(), ErrorKind::Miss);
        assert!(error.is_miss());
        assert!(!error.is_not_ready());
    }

    #[test]
    fn not_ready_display() {
        let error = Error::not_ready();
        assert!(error.is_not_ready());
        assert!(error.to_string().starts_with("cacher has not been initialized"));
    }

    #[test]
    fn internal_display_contains_cause_message() {
        let error = Error::internal("disk on fire");
        let display_str = format!("{error}");
        assert!(display_str.starts_with("internal cache error"), "got: {display_str}");
        assert!(display_str.contains("disk on fire"), "got: {display_str}");
    }

    #[test]
    fn internal_debug_contains_cause_message() {
        let error = Error::internal(std::io::Error::other("socket closed"));
        let debug_str = format!("{error:?}");
        assert!(debug_str.contains("socket closed"), "got: {debug_str}");
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::internal("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}

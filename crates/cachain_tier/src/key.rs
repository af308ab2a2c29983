// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use bytes::Bytes;

/// A borrowed cache key.
///
/// Keys are opaque byte sequences. A key may be given either as a UTF-8 string or as
/// raw bytes; both forms address the same entry, so `Key::from("user:1")` and
/// `Key::from(b"user:1".as_slice())` compare equal and hit the same in-process entry.
/// The form only matters to engines whose wire protocol encodes string and blob keys
/// differently, which can inspect it through [`Key::as_str`].
///
/// # Examples
///
/// ```
/// use cachain_tier::Key;
///
/// let text = Key::from("user:1");
/// let raw = Key::from(b"user:1".as_slice());
///
/// assert_eq!(text, raw);
/// assert_eq!(text.as_bytes(), b"user:1");
/// assert_eq!(text.as_str(), Some("user:1"));
/// assert_eq!(raw.as_str(), None);
/// ```
#[derive(Clone, Copy)]
pub enum Key<'a> {
    /// A UTF-8 string key.
    Str(&'a str),
    /// A raw byte key.
    Bytes(&'a [u8]),
}

impl<'a> Key<'a> {
    /// Returns the bytes addressed by this key.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Self::Str(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// Returns the key as a string if it was given in string form.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Self::Str(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }

    /// Copies the key into an owned buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` for the empty key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl PartialEq for Key<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Key<'_> {}

impl Hash for Key<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&String::from_utf8_lossy(b)).finish(),
        }
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(value: &'a str) -> Self {
        Self::Str(value)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(value: &'a String) -> Self {
        Self::Str(value)
    }
}

impl<'a> From<&'a [u8]> for Key<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::Bytes(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Key<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Self::Bytes(value)
    }
}

impl<'a> From<&'a Vec<u8>> for Key<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<'a> From<&'a Bytes> for Key<'a> {
    fn from(value: &'a Bytes) -> Self {
        Self::Bytes(value)
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::RwLock;

use crate::Error;

/// The observable lifecycle phase of a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Built but never initialized.
    Uninitialized,
    /// Initialized and holding an engine handle.
    Ready,
    /// Closed; the engine handle has been released.
    Closed,
}

#[derive(Debug)]
enum State<H> {
    Uninitialized,
    Ready(H),
    Closed,
}

/// Owns the engine handle of a backend and tracks its lifecycle.
///
/// The handle is cloned out under a short read lock, so callers never hold the lock
/// across an `.await`. Handles are usually cheap `Arc`-like clients.
///
/// # Examples
///
/// ```
/// use cachain_tier::{Lifecycle, Phase};
///
/// let lifecycle = Lifecycle::<u32>::new();
/// assert!(lifecycle.handle().unwrap_err().is_not_ready());
///
/// lifecycle.install(7);
/// assert_eq!(lifecycle.handle().unwrap(), 7);
///
/// assert_eq!(lifecycle.take_for_close(), Some(7));
/// assert_eq!(lifecycle.take_for_close(), None);
/// assert_eq!(lifecycle.phase(), Phase::Closed);
/// ```
#[derive(Debug)]
pub struct Lifecycle<H> {
    state: RwLock<State<H>>,
}

impl<H> Default for Lifecycle<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Lifecycle<H> {
    /// Creates an uninitialized lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match *self.state.read() {
            State::Uninitialized => Phase::Uninitialized,
            State::Ready(_) => Phase::Ready,
            State::Closed => Phase::Closed,
        }
    }

    /// Returns `true` when a handle is installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), State::Ready(_))
    }

    /// Installs `handle`, moving to [`Phase::Ready`].
    ///
    /// Returns the handle that was installed before, if any, so the caller can
    /// release it.
    pub fn install(&self, handle: H) -> Option<H> {
        match std::mem::replace(&mut *self.state.write(), State::Ready(handle)) {
            State::Ready(previous) => Some(previous),
            State::Uninitialized | State::Closed => None,
        }
    }

    /// Moves to [`Phase::Closed`] and hands out the installed handle.
    ///
    /// Only the first call after an install returns the handle, so the engine is
    /// released exactly once.
    pub fn take_for_close(&self) -> Option<H> {
        let mut state = self.state.write();
        match std::mem::replace(&mut *state, State::Closed) {
            State::Ready(handle) => Some(handle),
            State::Uninitialized => {
                *state = State::Uninitialized;
                None
            }
            State::Closed => None,
        }
    }
}

impl<H: Clone> Lifecycle<H> {
    /// Returns a clone of the installed handle.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotReady`](crate::ErrorKind::NotReady) before the first
    /// install and after close.
    pub fn handle(&self) -> Result<H, Error> {
        match &*self.state.read() {
            State::Ready(handle) => Ok(handle.clone()),
            State::Uninitialized | State::Closed => Err(Error::not_ready()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let lifecycle = Lifecycle::<String>::new();
        assert_eq!(lifecycle.phase(), Phase::Uninitialized);
        assert!(!lifecycle.is_ready());
        assert!(lifecycle.handle().unwrap_err().is_not_ready());
    }

    #[test]
    fn closing_uninitialized_stays_uninitialized() {
        let lifecycle = Lifecycle::<String>::new();
        assert_eq!(lifecycle.take_for_close(), None);
        assert_eq!(lifecycle.phase(), Phase::Uninitialized);
    }

    #[test]
    fn install_replaces_previous_handle() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.install("first"), None);
        assert_eq!(lifecycle.install("second"), Some("first"));
        assert_eq!(lifecycle.handle().unwrap(), "second");
    }

    #[test]
    fn reinstall_after_close() {
        let lifecycle = Lifecycle::new();
        lifecycle.install(1);
        assert_eq!(lifecycle.take_for_close(), Some(1));
        assert!(lifecycle.handle().unwrap_err().is_not_ready());

        assert_eq!(lifecycle.install(2), None);
        assert_eq!(lifecycle.phase(), Phase::Ready);
        assert_eq!(lifecycle.handle().unwrap(), 2);
    }
}

//! # Tick cache
//!
//! Once-per-cycle memoization. A value computed through the cache is computed at most once
//! between two calls to `reset`, and every reader in between observes the same value.
//!
//! `reset` must be called once at the top of every tick, before the first read of that tick. It
//! may also be called mid-tick after an out-of-band change (for example a pose reset) to force a
//! recomputation. Reading without a reset for the new tick returns the previous tick's value,
//! which is a caller bug rather than a runtime fault.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use drive_if::Tick;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cache holding at most one value per reset epoch.
#[derive(Debug, Clone)]
pub struct TickCache<T> {
    /// The tick passed to the latest `reset`.
    epoch: Tick,

    value: Option<T>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Default for TickCache<T> {
    fn default() -> Self {
        Self {
            epoch: 0,
            value: None,
        }
    }
}

impl<T> TickCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached value and start a new epoch for `tick`.
    pub fn reset(&mut self, tick: Tick) {
        self.epoch = tick;
        self.value = None;
    }

    /// Get the cached value, computing it with `compute` if the cache is empty.
    ///
    /// `compute` is passed the current epoch and is only invoked if nothing has been stored since
    /// the last reset. If it fails the error is returned and the cache stays empty, so the next
    /// call in the same epoch will try again.
    pub fn get_or_try_compute<E, F>(&mut self, compute: F) -> Result<&T, E>
    where
        F: FnOnce(Tick) -> Result<T, E>,
    {
        let value = match self.value.take() {
            Some(v) => v,
            None => compute(self.epoch)?,
        };

        Ok(self.value.get_or_insert(value))
    }

    /// Infallible version of `get_or_try_compute`.
    pub fn get_or_compute<F>(&mut self, compute: F) -> &T
    where
        F: FnOnce(Tick) -> T,
    {
        let epoch = self.epoch;
        self.value.get_or_insert_with(|| compute(epoch))
    }

    /// The cached value, if one has been computed this epoch.
    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The tick of the latest reset.
    pub fn epoch(&self) -> Tick {
        self.epoch
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! # Dispatcher configuration.
//!
//! Provides [`Config`] construction-time settings for the [`Dispatcher`](crate::Dispatcher).
//!
//! ## Sentinel values
//! - `async_timeout = 0s` → no per-listener timeout (async listeners are bounded only by
//!   the emitting call's cancellation/deadline)
//! - `buffer_size = 0` → clamped to 1

use std::time::Duration;

/// Construction-time configuration for the dispatcher.
///
/// ## Field semantics
/// - `buffer_size`: informational; reserved for queueing depth and used today only as a
///   capacity hint for per-emit bookkeeping
/// - `async_timeout`: how long an emit waits on one async listener (`0s` = forever)
#[derive(Clone, Debug)]
pub struct Config {
    /// Size hint for async event bookkeeping.
    pub buffer_size: usize,

    /// Maximum time an emit waits for one async listener.
    ///
    /// When exceeded, the emit reports [`DispatchError::Timeout`](crate::DispatchError::Timeout)
    /// naming the event; the listener's own work is not preempted.
    pub async_timeout: Duration,
}

impl Config {
    /// Returns the per-listener timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → each async invocation is raced against `d`
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        if self.async_timeout == Duration::ZERO {
            None
        } else {
            Some(self.async_timeout)
        }
    }

    /// Returns the buffer size clamped to a minimum of 1.
    #[inline]
    pub fn buffer_size_clamped(&self) -> usize {
        self.buffer_size.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `buffer_size = 100`
    /// - `async_timeout = 5s`
    fn default() -> Self {
        Self {
            buffer_size: 100,
            async_timeout: Duration::from_secs(5),
        }
    }
}

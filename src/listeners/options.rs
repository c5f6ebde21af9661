//! # Per-listener dispatch options.
//!
//! - `priority`: higher fires earlier; equal priorities keep registration order.
//! - `mode`: [`Mode::Sync`] runs inline on the emitting caller, [`Mode::Async`]
//!   runs as its own task, raced against cancellation and the dispatcher timeout.
//! - `once`: remove the listener after its first successful invocation.

/// Execution mode of a listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Invoked inline, in priority order; an error aborts the emit (default).
    #[default]
    Sync,
    /// Invoked concurrently; the emit waits for the outcome after the walk.
    Async,
}

/// Dispatch options attached to a listener at registration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove the listener after its first successful invocation.
    pub once: bool,
    /// Inline or concurrent invocation.
    pub mode: Mode,
    /// Higher priority fires earlier.
    pub priority: i32,
}

impl ListenerOptions {
    /// Returns options with the given priority.
    #[inline]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns options with the given mode.
    #[inline]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns options with the once flag set.
    #[inline]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// True if the listener is spawned instead of awaited inline.
    #[inline]
    pub fn is_async(&self) -> bool {
        self.mode == Mode::Async
    }
}

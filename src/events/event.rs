//! # Event envelope handed to listeners.
//!
//! An [`Event`] pairs the caller's [`Payload`] with metadata generated by
//! [`Dispatcher::emit`](crate::Dispatcher::emit): the event name, a global
//! sequence number, the creation timestamp, and the cancellation token and
//! optional deadline inherited from the emitting call.
//!
//! ## Ordering guarantees
//! Each envelope has a globally unique sequence number (`seq`) that increases monotonically.
//! Listeners running concurrently may use `seq` to restore emit order.
//!
//! ## Cancellation
//! The token carried by the envelope is a **child** of the caller's token:
//! - cancelling the caller's token is observed by every listener;
//! - the dispatcher cancels an async listener's own child token when it stops
//!   waiting on it (timeout, cancellation, deadline). The listener is never
//!   preempted; checking [`Event::is_cancelled`] is how it learns it was abandoned.
//!
//! ## Example
//! ```rust
//! use eventvisor::Event;
//! use tokio_util::sync::CancellationToken;
//!
//! let ev = Event::new("user.created", 42u32, CancellationToken::new());
//!
//! assert_eq!(ev.name(), "user.created");
//! assert_eq!(ev.payload::<u32>(), Some(&42));
//! assert!(!ev.is_cancelled());
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tokio_util::sync::CancellationToken;

use super::payload::Payload;

/// Global sequence counter for envelope ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Immutable envelope built once per emit.
///
/// Cloning is cheap: name and payload are reference-counted.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock creation timestamp.
    pub created_at: SystemTime,

    name: Arc<str>,
    payload: Payload,
    ctx: CancellationToken,
    deadline: Option<Instant>,
}

impl Event {
    /// Creates an envelope with the next sequence number and the current timestamp.
    ///
    /// `ctx` is the emitting caller's token; the envelope holds a child of it.
    pub fn new<P: Any + Send + Sync>(
        name: impl Into<Arc<str>>,
        payload: P,
        ctx: CancellationToken,
    ) -> Self {
        Self::with_payload(name, Payload::new(payload), ctx)
    }

    /// Same as [`Event::new`] for an already wrapped [`Payload`].
    pub fn with_payload(name: impl Into<Arc<str>>, payload: Payload, ctx: CancellationToken) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            created_at: SystemTime::now(),
            name: name.into(),
            payload,
            ctx: ctx.child_token(),
            deadline: None,
        }
    }

    /// Attaches a deadline inherited from the emitting call.
    #[inline]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Event name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrows the payload as `T`, if it is one.
    #[inline]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The raw payload.
    #[inline]
    pub fn raw_payload(&self) -> &Payload {
        &self.payload
    }

    /// Cancellation token inherited from the emitting call.
    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.ctx
    }

    /// True once the emitting call was cancelled or the dispatcher abandoned this invocation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Deadline inherited from the emitting call, if any.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Clone for one async invocation, carrying its own child token.
    pub(crate) fn fork(&self) -> Self {
        let mut ev = self.clone();
        ev.ctx = self.ctx.child_token();
        ev
    }
}

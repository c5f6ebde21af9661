//! Error types used by the eventvisor dispatcher and its listeners.
//!
//! This module defines:
//!
//! - [`DispatchError`]: every failure the dispatcher reports, from registration
//!   rejects to per-listener timeouts.
//! - [`ListenerError`]: the boxed error a [`Listener`](crate::Listener) returns.
//!
//! [`DispatchError`] provides helper methods (`as_label`, `as_message`) for logging/metrics.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error returned by listener logic.
///
/// Anything implementing [`std::error::Error`] converts into it with `?` or `.into()`,
/// and so does a plain `&str` / `String`.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the dispatcher.
///
/// Registration and removal errors (`InvalidListener`, `ListenerNotFound`) are returned
/// synchronously and never retried. The remaining variants describe the outcome of one
/// listener invocation during [`Dispatcher::emit`](crate::Dispatcher::emit).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Registration rejected: missing handler or empty event name.
    #[error("invalid listener: {reason}")]
    InvalidListener {
        /// Why the listener was rejected.
        reason: &'static str,
    },

    /// Removal target is not registered (anymore).
    #[error("listener not found for event {event}")]
    ListenerNotFound {
        /// Event the handle was bound to.
        event: Arc<str>,
    },

    /// Async listener did not finish within the configured window.
    #[error("event processing timeout: event {event} after {timeout:?}")]
    Timeout {
        /// Event being dispatched.
        event: Arc<str>,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The emitting context was cancelled before the listener finished.
    #[error("event {event}: context cancelled")]
    Canceled {
        /// Event being dispatched.
        event: Arc<str>,
    },

    /// The emitting call's deadline passed before the listener finished.
    #[error("event {event}: deadline exceeded")]
    DeadlineExceeded {
        /// Event being dispatched.
        event: Arc<str>,
    },

    /// Listener panicked while handling the event.
    #[error("event {event}: listener {listener} panicked: {info}")]
    Panicked {
        /// Event being dispatched.
        event: Arc<str>,
        /// Name of the panicking listener.
        listener: Arc<str>,
        /// Panic payload rendered as text.
        info: String,
    },

    /// Listener returned an error; displayed verbatim.
    #[error("{source}")]
    Listener {
        /// Event being dispatched.
        event: Arc<str>,
        /// The error returned by the listener.
        source: ListenerError,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::DispatchError;
    /// use std::time::Duration;
    ///
    /// let err = DispatchError::Timeout { event: "user.created".into(), timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "listener_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidListener { .. } => "invalid_listener",
            DispatchError::ListenerNotFound { .. } => "listener_not_found",
            DispatchError::Timeout { .. } => "listener_timeout",
            DispatchError::Canceled { .. } => "listener_canceled",
            DispatchError::DeadlineExceeded { .. } => "listener_deadline_exceeded",
            DispatchError::Panicked { .. } => "listener_panicked",
            DispatchError::Listener { .. } => "listener_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::InvalidListener { reason } => format!("invalid listener: {reason}"),
            DispatchError::ListenerNotFound { event } => format!("not found: event={event}"),
            DispatchError::Timeout { event, timeout } => {
                format!("timeout: event={event} after={timeout:?}")
            }
            DispatchError::Canceled { event } => format!("cancelled: event={event}"),
            DispatchError::DeadlineExceeded { event } => format!("deadline: event={event}"),
            DispatchError::Panicked {
                event,
                listener,
                info,
            } => format!("panic: event={event} listener={listener} info={info}"),
            DispatchError::Listener { event, source } => {
                format!("error: event={event} err={source}")
            }
        }
    }

    /// Name of the event the error relates to, if any.
    pub fn event(&self) -> Option<&str> {
        match self {
            DispatchError::InvalidListener { .. } => None,
            DispatchError::ListenerNotFound { event }
            | DispatchError::Timeout { event, .. }
            | DispatchError::Canceled { event }
            | DispatchError::DeadlineExceeded { event }
            | DispatchError::Panicked { event, .. }
            | DispatchError::Listener { event, .. } => Some(event),
        }
    }

    /// True for [`DispatchError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout { .. })
    }

    /// True for [`DispatchError::ListenerNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::ListenerNotFound { .. })
    }

    /// Returns the error produced by listener logic, if this is one.
    ///
    /// Use it to downcast back to the concrete error type:
    /// ```
    /// use eventvisor::DispatchError;
    ///
    /// let err = DispatchError::Listener { event: "e".into(), source: "boom".into() };
    /// assert_eq!(err.listener_error().map(|e| e.to_string()).as_deref(), Some("boom"));
    /// ```
    pub fn listener_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DispatchError::Listener { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

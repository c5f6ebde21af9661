//! # Listener registration request.
//!
//! Defines [`ListenerSpec`]: the event name, the listener and its [`ListenerOptions`].
//!
//! A spec can be created:
//! - **Explicitly** with [`ListenerSpec::new`] (full control)
//! - **Fluently** with [`ListenerSpec::builder`]
//!
//! ## Rules
//! - The spec is validated by [`Dispatcher::register`](crate::Dispatcher::register):
//!   a missing listener or an empty event name is rejected with
//!   [`DispatchError::InvalidListener`].

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::listeners::listener::ListenerRef;
use crate::listeners::options::{ListenerOptions, Mode};

/// Request to register one listener for one event name.
///
/// ## Example
/// ```rust
/// use eventvisor::{Event, ListenerError, ListenerFn, ListenerOptions, ListenerRef, ListenerSpec, Mode};
///
/// let l: ListenerRef = ListenerFn::arc("audit", |_ev: Event| async move {
///     Ok::<(), ListenerError>(())
/// });
///
/// let spec = ListenerSpec::new(
///     "user.created",
///     Some(l),
///     ListenerOptions::default().with_priority(10).with_mode(Mode::Async),
/// );
/// assert_eq!(spec.event(), "user.created");
/// assert_eq!(spec.options().priority, 10);
/// ```
#[derive(Clone)]
pub struct ListenerSpec {
    event: Cow<'static, str>,
    listener: Option<ListenerRef>,
    options: ListenerOptions,
}

impl ListenerSpec {
    /// Creates a new spec with explicit parameters.
    ///
    /// ### Parameters
    /// - `event`: Event name to subscribe to (must be non-empty)
    /// - `listener`: Handler (must be present)
    /// - `options`: Priority, mode and once-ness
    pub fn new(
        event: impl Into<Cow<'static, str>>,
        listener: Option<ListenerRef>,
        options: ListenerOptions,
    ) -> Self {
        Self {
            event: event.into(),
            listener,
            options,
        }
    }

    /// Event name.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Listener, if set.
    pub fn listener(&self) -> Option<&ListenerRef> {
        self.listener.as_ref()
    }

    /// Dispatch options.
    pub fn options(&self) -> ListenerOptions {
        self.options
    }

    /// Returns a new spec with updated options.
    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a new spec with updated priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.options.priority = priority;
        self
    }

    /// Returns a new spec with updated mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Splits a valid spec into its parts.
    pub(crate) fn validate(self) -> Result<(Arc<str>, ListenerRef, ListenerOptions), DispatchError> {
        if self.event.is_empty() {
            return Err(DispatchError::InvalidListener {
                reason: "empty event name",
            });
        }
        let Some(listener) = self.listener else {
            return Err(DispatchError::InvalidListener {
                reason: "missing listener function",
            });
        };
        Ok((Arc::from(self.event.as_ref()), listener, self.options))
    }
}

impl std::fmt::Debug for ListenerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSpec")
            .field("event", &self.event)
            .field("listener", &self.listener.as_ref().map(|l| l.name()))
            .field("options", &self.options)
            .finish()
    }
}

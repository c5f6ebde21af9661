use std::borrow::Cow;
use std::future::Future;

use crate::error::ListenerError;
use crate::events::Event;
use crate::listeners::{ListenerFn, ListenerOptions, ListenerRef, ListenerSpec, Mode};

/// Builder for ListenerSpec with fluent API
///
/// ```rust
/// use eventvisor::{Event, ListenerError, ListenerSpec};
///
/// let spec = ListenerSpec::builder("user.created")
///     .with_priority(5)
///     .async_mode()
///     .once()
///     .build(|_ev: Event| async { Ok::<(), ListenerError>(()) });
///
/// assert!(spec.options().once);
/// ```
#[derive(Clone, Debug)]
pub struct ListenerSpecBuilder {
    event: Cow<'static, str>,
    name: Option<Cow<'static, str>>,
    options: ListenerOptions,
}

impl ListenerSpecBuilder {
    /// Creates a new builder for the given event name
    pub fn new(event: impl Into<Cow<'static, str>>) -> Self {
        Self {
            event: event.into(),
            name: None,
            options: ListenerOptions::default(),
        }
    }

    /// Listener name used in logs; defaults to the event name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn async_mode(self) -> Self {
        self.with_mode(Mode::Async)
    }

    pub fn once(mut self) -> Self {
        self.options.once = true;
        self
    }

    /// Build ListenerSpec from a closure
    pub fn build<F, Fut>(self, f: F) -> ListenerSpec
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let name = self.name.unwrap_or_else(|| self.event.clone());
        let listener: ListenerRef = ListenerFn::arc(name, f);
        ListenerSpec::new(self.event, Some(listener), self.options)
    }

    /// Build ListenerSpec from an existing ListenerRef
    pub fn build_from_listener(self, listener: ListenerRef) -> ListenerSpec {
        ListenerSpec::new(self.event, Some(listener), self.options)
    }
}

impl ListenerSpec {
    /// Creates a builder for constructing ListenerSpec with fluent API
    pub fn builder(event: impl Into<Cow<'static, str>>) -> ListenerSpecBuilder {
        ListenerSpecBuilder::new(event)
    }
}

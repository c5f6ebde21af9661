//! # Function-backed listener (`ListenerFn`)
//!
//! [`ListenerFn`] wraps a closure `F: Fn(Event) -> Fut`, producing a fresh
//! future per invocation. The closure receives an owned (cheap) clone of the
//! envelope, so the future can be `'static`.
//!
//! ## Concurrency semantics
//! - Every invocation creates a **new** future owning its state.
//! - Async listeners may run concurrently with themselves across emits; share state
//!   explicitly through `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, ListenerError, ListenerFn, ListenerRef};
//!
//! let l: ListenerRef = ListenerFn::arc("mailer", |ev: Event| async move {
//!     let _user = ev.payload::<String>();
//!     Ok::<_, ListenerError>(())
//! });
//!
//! assert_eq!(l.name(), "mailer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ListenerError;
use crate::events::Event;
use crate::listeners::listener::Listener;

/// Function-backed listener implementation.
#[derive(Debug)]
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> ListenerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`ListenerFn::arc`] when you immediately need a [`ListenerRef`](crate::ListenerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listener for ListenerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        (self.f)(event.clone()).await
    }
}

//! # Listener abstraction.
//!
//! This module defines the [`Listener`] trait (async, fallible).
//! The common handle type is [`ListenerRef`], an `Arc<dyn Listener>` suitable for sharing
//! between the registry and the tasks spawned for async invocations.
//!
//! A listener receives the [`Event`] envelope and may check its cancellation
//! token to stop cooperatively once the dispatcher stops waiting on it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ListenerError;
use crate::events::Event;

/// Shared handle to a listener.
pub type ListenerRef = Arc<dyn Listener>;

/// # Event handler.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use eventvisor::{Event, Listener, ListenerError};
///
/// struct Audit;
///
/// #[async_trait]
/// impl Listener for Audit {
///     fn name(&self) -> &str { "audit" }
///
///     async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
///         if event.is_cancelled() {
///             return Ok(());
///         }
///         // write audit record...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Human-readable name (for logs and panic reports).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handles one event.
    ///
    /// An `Err` is propagated verbatim as the emit's failure cause.
    async fn handle(&self, event: &Event) -> Result<(), ListenerError>;
}

//! # Opaque registration handle.
//!
//! Removal is keyed by the handle returned from registration, never by comparing
//! listener objects.

use std::fmt;
use std::sync::Arc;

/// Identifies one registration. Ids are never reused within a dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: u64,
    event: Arc<str>,
}

impl ListenerHandle {
    pub(crate) fn new(id: u64, event: Arc<str>) -> Self {
        Self { id, event }
    }

    /// Event name the listener was registered for.
    pub fn event(&self) -> &str {
        &self.event
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn event_arc(&self) -> Arc<str> {
        Arc::clone(&self.event)
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.event, self.id)
    }
}

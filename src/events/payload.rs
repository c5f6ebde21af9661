//! # Type-erased event payload.
//!
//! [`Payload`] wraps any `Send + Sync + 'static` value behind an `Arc`, so the
//! envelope can be cloned for every listener without copying the caller's data.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque payload attached to an [`Event`](crate::Event).
///
/// ## Example
/// ```rust
/// use eventvisor::Payload;
///
/// let p = Payload::new(42u64);
/// assert_eq!(p.downcast_ref::<u64>(), Some(&42));
/// assert!(p.downcast_ref::<String>().is_none());
/// assert!(Payload::empty().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without another allocation.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        let value: Arc<dyn Any + Send + Sync> = value;
        Self(Some(value))
    }

    /// A payload carrying nothing.
    pub fn empty() -> Self {
        Self(None)
    }

    /// True when no value is attached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the value as `T`, if it is one.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a shared handle to the value as `T`, if it is one.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().and_then(|v| v.downcast::<T>().ok())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("Payload(..)"),
            None => f.write_str("Payload(empty)"),
        }
    }
}

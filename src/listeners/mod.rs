//! # Listener abstractions and registration specs.
//!
//! This module provides the listener-related types:
//! - [`Listener`] - trait for implementing event handlers
//! - [`ListenerFn`] - closure-based listener implementation
//! - [`ListenerRef`] - shared reference to a listener (`Arc<dyn Listener>`)
//! - [`ListenerOptions`] / [`Mode`] - priority, execution mode and once-ness
//! - [`ListenerSpec`] - registration request bundling event name, listener and options
//! - [`ListenerHandle`] - opaque handle returned by registration, used for removal

mod handle;
mod listener;
mod listener_fn;
mod options;
mod spec;
mod spec_builder;

pub use handle::ListenerHandle;
pub use listener::{Listener, ListenerRef};
pub use listener_fn::ListenerFn;
pub use options::{ListenerOptions, Mode};
pub use spec::ListenerSpec;
pub use spec_builder::ListenerSpecBuilder;

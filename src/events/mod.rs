//! Event envelope: what every listener receives.
//!
//! This module groups the envelope **data model** passed to listeners on every
//! invocation.
//!
//! ## Contents
//! - [`Event`] the envelope: name, payload, creation time, inherited cancellation/deadline
//! - [`Payload`] type-erased, cheaply cloneable caller payload
//!
//! ## Quick reference
//! - **Producer**: [`Dispatcher::emit`](crate::Dispatcher::emit) builds one envelope per call.
//! - **Consumers**: every [`Listener`](crate::Listener) registered for the event name.
//! - The registry never retains an envelope; it is dropped once dispatch completes
//!   (or once the last abandoned listener releases it).

mod event;
mod payload;

pub use event::Event;
pub use payload::Payload;

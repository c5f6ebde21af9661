//! # eventvisor
//!
//! **Eventvisor** is an in-process publish/subscribe dispatcher for Tokio applications.
//!
//! Independent components register interest in named events and are notified when
//! those events are emitted, with priority ordering, synchronous-or-concurrent
//! delivery, per-listener timeouts and one-shot listeners.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ListenerSpec │   │ ListenerSpec │   │ ListenerSpec │
//!     │ (prio 10,    │   │ (prio 5,     │   │ (prio 0,     │
//!     │  sync)       │   │  async)      │   │  async,once) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher (one per process, shared by Arc)                      │
//! │  - Registry (event → listeners sorted by priority, copy-on-write) │
//! │  - Config   (async timeout, buffer size)                          │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ emit(name, payload, ctx)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Event envelope: name, payload, seq, created_at, ctx, deadline    │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     inline await       tokio::spawn       tokio::spawn
//!     (fail-fast)        ├─ completion      ├─ completion
//!                        ├─ ctx cancelled   ├─ ctx cancelled
//!                        ├─ deadline        ├─ deadline
//!                        └─ timeout         └─ timeout
//!                                  │
//!                                  ▼
//!                 settle all ─► once-cleanup ─► Result
//! ```
//!
//! ### Emit lifecycle
//! ```text
//! snapshot(name) ──► None ──► Ok(())
//!        │
//!        ▼
//! for listener in snapshot (descending priority, stable on ties) {
//!   ├─► once && already claimed ─► skip
//!   ├─► Sync  ─► await inline ─► Err ─► return Err (nothing lower-priority starts)
//!   └─► Async ─► spawn, continue immediately
//! }
//! wait for every spawned listener (first of: completion / cancel / deadline / timeout)
//! remove succeeded once-listeners (single write-locked pass)
//! return first async error in priority order, or Ok(())
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Listeners**     | Handlers as trait objects or closures.                           | [`Listener`], [`ListenerFn`], [`ListenerRef`] |
//! | **Registration**  | Event name, priority, mode, once-ness; opaque removal handle.    | [`ListenerSpec`], [`ListenerOptions`], [`ListenerHandle`] |
//! | **Dispatch**      | Emit with inherited cancellation and optional deadline.          | [`Dispatcher`], [`Event`], [`Payload`]      |
//! | **Errors**        | Typed errors for registration and listener outcomes.             | [`DispatchError`], [`ListenerError`]        |
//! | **Configuration** | Construction-time settings.                                      | [`DispatcherConfig`], [`DispatcherBuilder`] |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{Dispatcher, DispatcherConfig, Event, ListenerError, ListenerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder(DispatcherConfig::default())
//!         .with_async_timeout(Duration::from_secs(1))
//!         .build();
//!
//!     dispatcher
//!         .register(
//!             ListenerSpec::builder("order.placed")
//!                 .with_priority(10)
//!                 .build(|ev: Event| async move {
//!                     println!("order {:?}", ev.payload::<u64>());
//!                     Ok::<(), ListenerError>(())
//!                 }),
//!         )
//!         .await?;
//!
//!     dispatcher
//!         .register(
//!             ListenerSpec::builder("order.placed")
//!                 .async_mode()
//!                 .once()
//!                 .build(|_ev: Event| async move { Ok::<(), ListenerError>(()) }),
//!         )
//!         .await?;
//!
//!     let ctx = CancellationToken::new();
//!     dispatcher.emit("order.placed", 42u64, &ctx).await?;
//!     assert_eq!(dispatcher.listener_count("order.placed").await, 1);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod listeners;

// ---- Public re-exports ----

pub use crate::core::{Config as DispatcherConfig, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, ListenerError};
pub use events::{Event, Payload};
pub use listeners::{
    Listener, ListenerFn, ListenerHandle, ListenerOptions, ListenerRef, ListenerSpec,
    ListenerSpecBuilder, Mode,
};

//! Dispatch core: registry, runner and the dispatcher façade.
//!
//! The public API from this module is [`Dispatcher`] (with its [`DispatcherBuilder`] and
//! [`Config`]), which owns the registry and implements emit.
//!
//! Internal modules:
//! - `registry`: per-event listener sequences with consistent snapshots;
//! - `runner`: one listener invocation, inline or spawned with its outcome race;
//! - `dispatcher`: registration façade and the emit walk / wait / cleanup phases;
//! - `builder`: fluent construction.

mod builder;
mod config;
mod dispatcher;
mod registry;
mod runner;

pub use builder::DispatcherBuilder;
pub use config::Config;
pub use dispatcher::Dispatcher;

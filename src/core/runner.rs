//! # Run a single listener invocation.
//!
//! Two execution paths, one per [`Mode`](crate::Mode):
//!
//! - [`run_inline`]: awaits the listener on the emitting caller's own task.
//! - [`spawn`] + [`settle`]: starts the listener as its own tokio task, then races its
//!   completion against the caller's cancellation, the caller's deadline and the
//!   dispatcher timeout.
//!
//! ## Outcome race (async)
//! ```text
//! spawn(listener.handle(fork))  ──►  started_at
//!                                       │
//! settle():  select! {
//!              join handle          ─► Ok / Listener / Panicked
//!              ctx.cancelled()      ─► Canceled
//!              sleep_until(deadline)─► DeadlineExceeded
//!              sleep_until(expiry)  ─► Timeout
//!            }
//! ```
//!
//! ## Rules
//! - The timeout is measured from spawn, not from the start of the wait phase.
//! - Losing the race **detaches** the listener task; it is never aborted. Its forked
//!   cancellation token is cancelled so it can stop cooperatively. Dropping an
//!   [`InFlight`] unobserved (the emit future was dropped) does the same.
//! - Panics are caught (inline via `catch_unwind`, spawned via `JoinError::is_panic`) and
//!   reported as [`DispatchError::Panicked`].

use std::any::Any;
use std::future::pending;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tokio_util::sync::DropGuard;

use crate::core::registry::{Claim, Registration};
use crate::error::{DispatchError, ListenerError};
use crate::events::Event;

/// An async invocation that has been started but whose outcome is not known yet.
pub(crate) struct InFlight {
    claim: Claim,
    join: JoinHandle<Result<(), ListenerError>>,
    cancel_on_drop: DropGuard,
    timeout: Option<(Duration, Instant)>,
}

/// Invokes `reg` inline and maps its result.
pub(crate) async fn run_inline(reg: &Registration, event: &Event) -> Result<(), DispatchError> {
    let fut = reg.listener.handle(event);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res.map_err(|source| DispatchError::Listener {
            event: event.name_arc(),
            source,
        }),
        Err(panic_err) => Err(panicked(reg, event, panic_message(&*panic_err))),
    }
}

/// Starts the claimed listener as its own task without waiting on it.
pub(crate) fn spawn(claim: Claim, event: &Event, timeout: Option<Duration>) -> InFlight {
    let fork = event.fork();
    let cancel_on_drop = fork.cancellation().clone().drop_guard();
    let started_at = Instant::now();
    let listener = Arc::clone(&claim.registration().listener);

    let join = tokio::spawn(async move { listener.handle(&fork).await });

    InFlight {
        claim,
        join,
        cancel_on_drop,
        timeout: timeout.map(|d| (d, started_at + d)),
    }
}

/// Waits for the first of: completion, cancellation, deadline, timeout.
///
/// Hands the claim back with the outcome.
pub(crate) async fn settle(inflight: InFlight, event: &Event) -> (Claim, Result<(), DispatchError>) {
    let InFlight {
        claim,
        mut join,
        cancel_on_drop,
        timeout,
    } = inflight;

    let expiry = async {
        match timeout {
            Some((_, at)) => time::sleep_until(at).await,
            None => pending::<()>().await,
        }
    };
    let deadline = async {
        match event.deadline() {
            Some(at) => time::sleep_until(Instant::from_std(at)).await,
            None => pending::<()>().await,
        }
    };

    let res = tokio::select! {
        biased;
        joined = &mut join => {
            let _ = cancel_on_drop.disarm();
            let outcome = joined_outcome(claim.registration(), event, joined);
            return (claim, outcome);
        }
        _ = event.cancellation().cancelled() => DispatchError::Canceled { event: event.name_arc() },
        _ = deadline => DispatchError::DeadlineExceeded { event: event.name_arc() },
        _ = expiry => DispatchError::Timeout {
            event: event.name_arc(),
            timeout: timeout.map(|(d, _)| d).unwrap_or_default(),
        },
    };

    // Abandoned: signal the listener and detach its task.
    drop(cancel_on_drop);
    drop(join);
    (claim, Err(res))
}

fn joined_outcome(
    reg: &Registration,
    event: &Event,
    joined: Result<Result<(), ListenerError>, JoinError>,
) -> Result<(), DispatchError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(DispatchError::Listener {
            event: event.name_arc(),
            source,
        }),
        Err(je) if je.is_panic() => Err(panicked(reg, event, panic_message(&*je.into_panic()))),
        Err(_) => Err(DispatchError::Canceled {
            event: event.name_arc(),
        }),
    }
}

fn panicked(reg: &Registration, event: &Event, info: String) -> DispatchError {
    DispatchError::Panicked {
        event: event.name_arc(),
        listener: Arc::from(reg.name()),
        info,
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! # Dispatcher: registration façade and the emit algorithm.
//!
//! The [`Dispatcher`] owns the listener registry and the construction-time
//! [`Config`]. Build exactly one per process and hand it out by `Arc` to every
//! component that publishes or subscribes.
//!
//! ## Emit
//! ```text
//! emit(name, payload, ctx)
//!   ├─► Event::new(name, payload, ctx.child_token())
//!   ├─► registry.snapshot(name)          (read lock, Arc clone, lock released)
//!   │       └─ None ─► Ok(())            (no listeners is not an error)
//!   ├─► walk snapshot in priority order:
//!   │       ├─ once & already claimed  ─► skip
//!   │       ├─ Sync  ─► run_inline().await
//!   │       │            └─ Err ─► hand in-flight async work to a detached settle task
//!   │       │                      └─► return Err (fail-fast)
//!   │       └─ Async ─► runner::spawn()  (does not block the walk)
//!   ├─► settle all in-flight async invocations (concurrently)
//!   │       └─ each: completion | ctx cancelled | deadline | timeout
//!   ├─► registry.remove_many(succeeded once-listeners)   (one write-locked pass)
//!   └─► Ok(()) or the error of the highest-priority failed async listener
//! ```
//!
//! ## Rules
//! - Sync listeners run strictly in descending priority order on the caller's task.
//! - Async listeners start in priority order and may finish in any order.
//! - A listener registered during an in-flight emit is not visible to that emit.
//! - When several async listeners fail, the returned error is the one from the
//!   highest-priority listener; the others are logged at `warn`.
//! - Once-removal never happens while a registry lock is held by the emit; removing an
//!   already-removed once-listener is silently ignored.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{Dispatcher, DispatcherConfig, Event, ListenerError, ListenerSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
//!
//!     let handle = dispatcher
//!         .register(ListenerSpec::builder("user.created").build(|ev: Event| async move {
//!             println!("welcome {:?}", ev.payload::<String>());
//!             Ok::<(), ListenerError>(())
//!         }))
//!         .await?;
//!
//!     let ctx = CancellationToken::new();
//!     dispatcher.emit("user.created", String::from("ada"), &ctx).await?;
//!
//!     dispatcher.unregister(&handle).await?;
//!     assert!(!dispatcher.has_listeners("user.created").await);
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::core::builder::DispatcherBuilder;
use crate::core::config::Config;
use crate::core::registry::{Claim, Registry};
use crate::core::runner::{self, InFlight};
use crate::error::DispatchError;
use crate::events::{Event, Payload};
use crate::listeners::{ListenerHandle, ListenerSpec, Mode};

/// Process-wide publish/subscribe dispatcher.
pub struct Dispatcher {
    cfg: Config,
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty registry.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: Arc::new(Registry::new()),
        }
    }

    /// Creates a builder starting from `cfg`.
    pub fn builder(cfg: Config) -> DispatcherBuilder {
        DispatcherBuilder::new(cfg)
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Registers one listener.
    ///
    /// Fails with [`DispatchError::InvalidListener`] if the spec has no listener or an
    /// empty event name; the registry is unchanged in that case.
    pub async fn register(&self, spec: ListenerSpec) -> Result<ListenerHandle, DispatchError> {
        let handle = self.registry.add_one(spec).await?;
        tracing::debug!(listener = %handle, "listener registered");
        Ok(handle)
    }

    /// Registers several listeners atomically: all of them, or none if any is invalid.
    pub async fn register_many(
        &self,
        specs: Vec<ListenerSpec>,
    ) -> Result<Vec<ListenerHandle>, DispatchError> {
        let handles = self.registry.add(specs).await?;
        tracing::debug!(count = handles.len(), "listeners registered");
        Ok(handles)
    }

    /// Removes a listener.
    ///
    /// Fails with [`DispatchError::ListenerNotFound`] if it was never registered, was
    /// already removed, or was a once-listener that already fired.
    pub async fn unregister(&self, handle: &ListenerHandle) -> Result<(), DispatchError> {
        self.registry.remove(handle).await?;
        tracing::debug!(listener = %handle, "listener unregistered");
        Ok(())
    }

    /// True if `event` has at least one listener.
    pub async fn has_listeners(&self, event: &str) -> bool {
        self.registry.has_listeners(event).await
    }

    /// Number of listeners currently registered for `event`.
    pub async fn listener_count(&self, event: &str) -> usize {
        self.registry.listener_count(event).await
    }

    /// Sorted names of events that have at least one listener.
    pub async fn event_names(&self) -> Vec<String> {
        self.registry.event_names().await
    }

    /// Notifies every listener of `event`.
    ///
    /// `ctx` is inherited by the envelope: cancelling it makes every pending async
    /// listener resolve as [`DispatchError::Canceled`].
    pub async fn emit<P: Any + Send + Sync>(
        &self,
        event: &str,
        payload: P,
        ctx: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.dispatch(Event::new(event, payload, ctx.clone())).await
    }

    /// Same as [`Dispatcher::emit`], with a deadline every async listener is raced against.
    pub async fn emit_with_deadline<P: Any + Send + Sync>(
        &self,
        event: &str,
        payload: P,
        ctx: &CancellationToken,
        deadline: Instant,
    ) -> Result<(), DispatchError> {
        let ev = Event::with_payload(event, Payload::new(payload), ctx.clone()).with_deadline(deadline);
        self.dispatch(ev).await
    }

    /// Dispatches a prebuilt envelope.
    pub async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let Some(snapshot) = self.registry.snapshot(event.name()).await else {
            tracing::trace!(event = event.name(), "no listeners");
            return Ok(());
        };
        tracing::debug!(
            event = event.name(),
            seq = event.seq,
            listeners = snapshot.len(),
            "dispatching event"
        );

        let timeout = self.cfg.timeout();
        let mut inflight: Vec<InFlight> =
            Vec::with_capacity(snapshot.len().min(self.cfg.buffer_size_clamped()));
        let mut fired_once: Vec<Claim> = Vec::new();

        for reg in snapshot.iter() {
            let Some(claim) = Claim::acquire(reg, &self.registry) else {
                tracing::trace!(event = event.name(), listener = reg.name(), "once-listener already claimed");
                continue;
            };
            match reg.options.mode {
                Mode::Sync => match runner::run_inline(reg, &event).await {
                    Ok(()) => {
                        if reg.options.once {
                            fired_once.push(claim.fire());
                        }
                    }
                    Err(err) => {
                        drop(claim);
                        tracing::warn!(
                            event = event.name(),
                            listener = reg.name(),
                            error = %err,
                            "sync listener failed; aborting dispatch"
                        );
                        self.abandon(inflight, event, fired_once).await;
                        return Err(err);
                    }
                },
                Mode::Async => inflight.push(runner::spawn(claim, &event, timeout)),
            }
        }
        drop(snapshot);

        settle_all(&self.registry, inflight, &event, fired_once).await
    }

    /// Hands async work that is already running to a detached task after a fail-fast abort.
    ///
    /// Nothing new is started; the detached task only observes outcomes and performs
    /// once-cleanup.
    async fn abandon(&self, inflight: Vec<InFlight>, event: Event, fired_once: Vec<Claim>) {
        if inflight.is_empty() {
            remove_fired(&self.registry, fired_once).await;
            return;
        }
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let _ = settle_all(&registry, inflight, &event, fired_once).await;
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("cfg", &self.cfg).finish_non_exhaustive()
    }
}

/// Waits for every in-flight invocation, then removes succeeded once-listeners.
///
/// Outcomes are inspected in spawn (priority) order, so the returned error is the one
/// from the highest-priority failing listener.
async fn settle_all(
    registry: &Registry,
    inflight: Vec<InFlight>,
    event: &Event,
    mut fired_once: Vec<Claim>,
) -> Result<(), DispatchError> {
    let outcomes = join_all(inflight.into_iter().map(|f| runner::settle(f, event))).await;

    let mut first_err = None;
    for (claim, outcome) in outcomes {
        let reg = Arc::clone(claim.registration());
        match outcome {
            Ok(()) => {
                if reg.options.once {
                    fired_once.push(claim.fire());
                }
            }
            Err(err) => {
                drop(claim);
                tracing::warn!(
                    event = event.name(),
                    listener = reg.name(),
                    error = %err,
                    label = err.as_label(),
                    "async listener failed"
                );
                first_err.get_or_insert(err);
            }
        }
    }

    let removed = remove_fired(registry, fired_once).await;
    if removed > 0 {
        tracing::trace!(event = event.name(), removed, "once-listeners removed");
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Removes succeeded once-listeners in one write-locked pass, then ends their claims.
async fn remove_fired(registry: &Registry, fired_once: Vec<Claim>) -> usize {
    let handles: Vec<ListenerHandle> = fired_once.iter().filter_map(Claim::once_handle).collect();
    let removed = registry.remove_many(&handles).await;
    fired_once.into_iter().for_each(Claim::settle);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use crate::{ListenerError, ListenerOptions};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn dispatcher(timeout: Duration) -> Arc<Dispatcher> {
        Dispatcher::builder(Config::default())
            .with_async_timeout(timeout)
            .build()
    }

    fn record(event: &'static str, name: &'static str, priority: i32, mode: Mode, log: &Log) -> ListenerSpec {
        let log = Arc::clone(log);
        ListenerSpec::builder(event)
            .with_name(name)
            .with_priority(priority)
            .with_mode(mode)
            .build(move |_ev: Event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(name);
                    Ok::<(), ListenerError>(())
                }
            })
    }

    fn counting(event: &'static str, mode: Mode, once: bool, hits: &Arc<AtomicUsize>) -> ListenerSpec {
        let hits = Arc::clone(hits);
        let mut options = ListenerOptions::default().with_mode(mode);
        options.once = once;
        ListenerSpec::builder(event)
            .build(move |_ev: Event| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), ListenerError>(())
                }
            })
            .with_options(options)
    }

    fn failing(event: &'static str, priority: i32, mode: Mode, msg: &'static str) -> ListenerSpec {
        ListenerSpec::builder(event)
            .with_priority(priority)
            .with_mode(mode)
            .build(move |_ev: Event| async move { Err::<(), ListenerError>(msg.into()) })
    }

    fn sleeping(event: &'static str, priority: i32, dur: Duration) -> ListenerSpec {
        ListenerSpec::builder(event)
            .with_name("sleeper")
            .with_priority(priority)
            .async_mode()
            .build(move |_ev: Event| async move {
                tokio::time::sleep(dur).await;
                Ok::<(), ListenerError>(())
            })
    }

    #[tokio::test]
    async fn test_register_makes_event_visible() {
        let d = dispatcher(Duration::from_secs(5));
        let log = Log::default();
        d.register(record("user.created", "a", 0, Mode::Sync, &log))
            .await
            .unwrap();

        assert!(d.has_listeners("user.created").await);
        assert!(!d.has_listeners("user.deleted").await);
        assert_eq!(d.event_names().await, vec!["user.created".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_registration_is_rejected() {
        let d = dispatcher(Duration::from_secs(5));
        let log = Log::default();

        let err = d
            .register(record("", "a", 0, Mode::Sync, &log))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidListener { .. }));

        let err = d
            .register(ListenerSpec::new("e", None, ListenerOptions::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidListener { .. }));

        assert!(!d.has_listeners("e").await);
        assert!(d.event_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_many_is_atomic() {
        let d = dispatcher(Duration::from_secs(5));
        let log = Log::default();

        let err = d
            .register_many(vec![
                record("e", "a", 0, Mode::Sync, &log),
                ListenerSpec::new("e", None, ListenerOptions::default()),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidListener { .. }));
        assert_eq!(d.listener_count("e").await, 0);

        let handles = d
            .register_many(vec![
                record("e", "a", 0, Mode::Sync, &log),
                record("f", "b", 0, Mode::Sync, &log),
            ])
            .await
            .unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[1].event(), "f");
    }

    #[tokio::test]
    async fn test_sync_listeners_fire_in_priority_order() {
        let d = dispatcher(Duration::from_secs(5));
        let log = Log::default();
        d.register_many(vec![
            record("e", "low", -1, Mode::Sync, &log),
            record("e", "high", 10, Mode::Sync, &log),
            record("e", "mid-a", 5, Mode::Sync, &log),
            record("e", "mid-b", 5, Mode::Sync, &log),
        ])
        .await
        .unwrap();

        d.emit("e", (), &CancellationToken::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["high", "mid-a", "mid-b", "low"]);
    }

    #[tokio::test]
    async fn test_emit_without_listeners_is_noop() {
        let d = dispatcher(Duration::from_secs(5));
        d.emit("nobody.listens", 1u8, &CancellationToken::new())
            .await
            .unwrap();
        assert!(d.event_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_payload_reaches_listener() {
        let d = dispatcher(Duration::from_secs(5));
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        d.register(ListenerSpec::builder("user.created").build(move |ev: Event| {
            let seen = Arc::clone(&seen_in);
            async move {
                *seen.lock().unwrap() = ev.payload::<String>().cloned();
                assert_eq!(ev.name(), "user.created");
                Ok::<(), ListenerError>(())
            }
        }))
        .await
        .unwrap();

        d.emit("user.created", String::from("ada"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn test_once_listener_fires_once_and_disappears() {
        let d = dispatcher(Duration::from_secs(5));
        let once_hits = Arc::new(AtomicUsize::new(0));
        let sync_once_hits = Arc::new(AtomicUsize::new(0));
        let regular_hits = Arc::new(AtomicUsize::new(0));

        let once = d
            .register(counting("e", Mode::Async, true, &once_hits))
            .await
            .unwrap();
        d.register(counting("e", Mode::Sync, true, &sync_once_hits))
            .await
            .unwrap();
        d.register(counting("e", Mode::Sync, false, &regular_hits))
            .await
            .unwrap();

        let ctx = CancellationToken::new();
        for _ in 0..3 {
            d.emit("e", (), &ctx).await.unwrap();
        }

        assert_eq!(once_hits.load(Ordering::SeqCst), 1);
        assert_eq!(sync_once_hits.load(Ordering::SeqCst), 1);
        assert_eq!(regular_hits.load(Ordering::SeqCst), 3);
        assert_eq!(d.listener_count("e").await, 1);
        assert!(d.unregister(&once).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_once_listener_stays_armed() {
        let d = dispatcher(Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        d.register(ListenerSpec::builder("e").once().build(move |_ev: Event| {
            let calls = Arc::clone(&calls_in);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err::<(), ListenerError>("first attempt".into());
                }
                Ok(())
            }
        }))
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        assert!(d.emit("e", (), &ctx).await.is_err());
        assert!(d.has_listeners("e").await);

        d.emit("e", (), &ctx).await.unwrap();
        d.emit("e", (), &ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!d.has_listeners("e").await);
    }

    #[tokio::test]
    async fn test_concurrent_emits_invoke_once_listener_at_most_once() {
        let d = dispatcher(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = Arc::clone(&hits);
        d.register(ListenerSpec::builder("e").async_mode().once().build(move |_ev: Event| {
            let hits = Arc::clone(&hits_in);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<(), ListenerError>(())
            }
        }))
        .await
        .unwrap();

        let mut joins = Vec::new();
        for _ in 0..8 {
            let d = Arc::clone(&d);
            joins.push(tokio::spawn(async move {
                d.emit("e", (), &CancellationToken::new()).await
            }));
        }
        for j in joins {
            j.await.unwrap().unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!d.has_listeners("e").await);
    }

    #[tokio::test]
    async fn test_sync_error_is_fail_fast() {
        let d = dispatcher(Duration::from_secs(5));
        let lower_sync = Arc::new(AtomicUsize::new(0));
        let lower_async = Arc::new(AtomicUsize::new(0));

        d.register(failing("e", 1, Mode::Sync, "X")).await.unwrap();
        d.register(counting("e", Mode::Sync, false, &lower_sync))
            .await
            .unwrap();
        d.register(counting("e", Mode::Async, false, &lower_async).with_priority(-1))
            .await
            .unwrap();

        let err = d.emit("e", (), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "X");
        assert!(matches!(err, DispatchError::Listener { .. }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lower_sync.load(Ordering::SeqCst), 0);
        assert_eq!(lower_async.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fail_fast_still_cleans_up_in_flight_once_listener() {
        let d = dispatcher(Duration::from_secs(5));
        d.register(
            ListenerSpec::builder("e")
                .with_priority(10)
                .async_mode()
                .once()
                .build(|_ev: Event| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<(), ListenerError>(())
                }),
        )
        .await
        .unwrap();
        d.register(failing("e", 5, Mode::Sync, "boom")).await.unwrap();

        let started = tokio::time::Instant::now();
        let err = d.emit("e", (), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(started.elapsed() < Duration::from_millis(30));
        assert_eq!(d.listener_count("e").await, 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(d.listener_count("e").await, 1);
    }

    #[tokio::test]
    async fn test_async_timeout_is_reported_quickly() {
        let d = dispatcher(Duration::from_millis(50));
        let log = Log::default();
        d.register(record("e", "x", 10, Mode::Sync, &log)).await.unwrap();
        d.register(sleeping("e", 5, Duration::from_secs(10))).await.unwrap();

        let started = tokio::time::Instant::now();
        let err = d.emit("e", (), &CancellationToken::new()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert_eq!(err.event(), Some("e"));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
        assert_eq!(*log.lock().unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_timeout_does_not_affect_siblings() {
        let d = dispatcher(Duration::from_millis(50));
        let fast = Arc::new(AtomicUsize::new(0));
        d.register(sleeping("e", 5, Duration::from_secs(10))).await.unwrap();
        d.register(counting("e", Mode::Async, false, &fast)).await.unwrap();

        let err = d.emit("e", (), &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(fast.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_listener_observes_cancellation() {
        let d = dispatcher(Duration::from_millis(30));
        let observed = Arc::new(AtomicBool::new(false));
        let observed_in = Arc::clone(&observed);
        d.register(ListenerSpec::builder("e").async_mode().build(move |ev: Event| {
            let observed = Arc::clone(&observed_in);
            async move {
                ev.cancellation().cancelled().await;
                observed.store(true, Ordering::SeqCst);
                Ok::<(), ListenerError>(())
            }
        }))
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        let err = d.emit("e", (), &ctx).await.unwrap_err();
        assert!(err.is_timeout());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(observed.load(Ordering::SeqCst));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_caller_cancellation_ends_wait() {
        let d = dispatcher(Duration::from_secs(5));
        d.register(sleeping("e", 0, Duration::from_secs(10))).await.unwrap();

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = d.emit("e", (), &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::Canceled { .. }));
    }

    #[tokio::test]
    async fn test_deadline_ends_wait() {
        let d = dispatcher(Duration::from_secs(5));
        d.register(sleeping("e", 0, Duration::from_secs(10))).await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(30);
        let err = d
            .emit_with_deadline("e", (), &CancellationToken::new(), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DeadlineExceeded { .. }));
        assert_eq!(err.as_label(), "listener_deadline_exceeded");
    }

    #[tokio::test]
    async fn test_highest_priority_async_error_wins() {
        let d = dispatcher(Duration::from_secs(5));
        d.register(
            ListenerSpec::builder("e")
                .with_priority(5)
                .async_mode()
                .build(|_ev: Event| async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Err::<(), ListenerError>("slow-high".into())
                }),
        )
        .await
        .unwrap();
        d.register(failing("e", 1, Mode::Async, "fast-low")).await.unwrap();

        let err = d.emit("e", (), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "slow-high");
    }

    #[tokio::test]
    async fn test_async_listeners_run_concurrently() {
        let d = dispatcher(Duration::from_secs(1));
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        for _ in 0..2 {
            let barrier = Arc::clone(&barrier);
            d.register(ListenerSpec::builder("e").async_mode().build(move |_ev: Event| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok::<(), ListenerError>(())
                }
            }))
            .await
            .unwrap();
        }

        d.emit("e", (), &CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_listeners_are_reported() {
        let d = dispatcher(Duration::from_secs(5));
        let lower = Arc::new(AtomicUsize::new(0));
        d.register(
            ListenerSpec::builder("sync")
                .with_name("bomb")
                .with_priority(1)
                .build(|_ev: Event| async {
                    if true {
                        panic!("kaboom");
                    }
                    Ok::<(), ListenerError>(())
                }),
        )
        .await
        .unwrap();
        d.register(counting("sync", Mode::Sync, false, &lower)).await.unwrap();

        let err = d.emit("sync", (), &CancellationToken::new()).await.unwrap_err();
        match err {
            DispatchError::Panicked { listener, info, .. } => {
                assert_eq!(&*listener, "bomb");
                assert_eq!(info, "kaboom");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(lower.load(Ordering::SeqCst), 0);

        d.register(ListenerSpec::builder("async").async_mode().build(|_ev: Event| async {
            if true {
                panic!("async kaboom");
            }
            Ok::<(), ListenerError>(())
        }))
        .await
        .unwrap();
        let err = d.emit("async", (), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "listener_panicked");
    }

    #[tokio::test]
    async fn test_listener_added_during_emit_is_not_seen_by_that_emit() {
        let d = dispatcher(Duration::from_secs(5));
        let late = Arc::new(AtomicUsize::new(0));
        let d_in = Arc::clone(&d);
        let late_in = Arc::clone(&late);
        d.register(ListenerSpec::builder("e").once().build(move |_ev: Event| {
            let d = Arc::clone(&d_in);
            let late = Arc::clone(&late_in);
            async move {
                d.register(counting("e", Mode::Sync, false, &late))
                    .await
                    .map(|_| ())
                    .map_err(ListenerError::from)
            }
        }))
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        d.emit("e", (), &ctx).await.unwrap();
        assert_eq!(late.load(Ordering::SeqCst), 0);

        d.emit("e", (), &ctx).await.unwrap();
        assert_eq!(late.load(Ordering::SeqCst), 1);
        assert_eq!(d.listener_count("e").await, 1);
    }

    #[tokio::test]
    async fn test_dropped_emit_rearms_sync_once_listener() {
        let d = dispatcher(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = Arc::clone(&hits);
        d.register(ListenerSpec::builder("e").once().build(move |_ev: Event| {
            let hits = Arc::clone(&hits_in);
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Ok::<(), ListenerError>(())
            }
        }))
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        let first = tokio::time::timeout(Duration::from_millis(10), d.emit("e", (), &ctx)).await;
        assert!(first.is_err());
        assert!(d.has_listeners("e").await);

        for _ in 0..3 {
            d.emit("e", (), &ctx).await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!d.has_listeners("e").await);
    }

    #[tokio::test]
    async fn test_dropped_emit_cancels_and_rearms_async_once_listener() {
        let d = dispatcher(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicBool::new(false));
        let hits_in = Arc::clone(&hits);
        let stopped_in = Arc::clone(&stopped);
        d.register(ListenerSpec::builder("e").async_mode().once().build(move |ev: Event| {
            let hits = Arc::clone(&hits_in);
            let stopped = Arc::clone(&stopped_in);
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) > 0 {
                    return Ok(());
                }
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(()),
                    _ = ev.cancellation().cancelled() => {
                        stopped.store(true, Ordering::SeqCst);
                        Err::<(), ListenerError>("stopped".into())
                    }
                }
            }
        }))
        .await
        .unwrap();

        let ctx = CancellationToken::new();
        let first = tokio::time::timeout(Duration::from_millis(10), d.emit("e", (), &ctx)).await;
        assert!(first.is_err());

        for _ in 0..50 {
            if stopped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(stopped.load(Ordering::SeqCst));
        assert!(!ctx.is_cancelled());
        assert!(d.has_listeners("e").await);

        d.emit("e", (), &ctx).await.unwrap();
        d.emit("e", (), &ctx).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!d.has_listeners("e").await);
    }

    #[tokio::test]
    async fn test_once_listener_removing_itself_does_not_fail_emit() {
        let d = dispatcher(Duration::from_secs(5));
        let own: Arc<OnceLock<ListenerHandle>> = Arc::default();
        let d_in = Arc::clone(&d);
        let own_in = Arc::clone(&own);
        let handle = d
            .register(ListenerSpec::builder("e").once().build(move |_ev: Event| {
                let d = Arc::clone(&d_in);
                let own = Arc::clone(&own_in);
                async move {
                    match own.get() {
                        Some(h) => d.unregister(h).await.map_err(ListenerError::from),
                        None => Ok(()),
                    }
                }
            }))
            .await
            .unwrap();
        assert!(own.set(handle).is_ok());

        d.emit("e", (), &CancellationToken::new()).await.unwrap();
        assert!(!d.has_listeners("e").await);
    }

    #[tokio::test]
    async fn test_register_unregister_round_trip() {
        let d = dispatcher(Duration::from_secs(5));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = d
            .register(counting("e", Mode::Sync, false, &hits))
            .await
            .unwrap();

        d.unregister(&h).await.unwrap();
        assert!(!d.has_listeners("e").await);

        d.emit("e", (), &CancellationToken::new()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(d.unregister(&h).await.unwrap_err().is_not_found());
    }
}

//! # Listener registry - per-event ordered subscriptions.
//!
//! Holds, per event name, the listeners sorted by descending priority (stable on ties,
//! i.e. registration order).
//!
//! ## Architecture
//! ```text
//! RwLock<HashMap<event, Arc<Vec<Arc<Registration>>>>>
//!          │
//!          ├─► add()/remove()        write lock, copy-on-write of one event's Vec
//!          └─► snapshot()            read lock, Arc clone of one event's Vec, lock released
//! ```
//!
//! ## Rules
//! - Mutations replace the per-event `Vec` (`Arc::make_mut`) under the write lock, so a
//!   snapshot handed out earlier is never mutated: readers see a full prior sequence or a
//!   full post-mutation sequence, never a mix.
//! - Dispatch never holds the lock while listeners run; once-cleanup is a separate
//!   write-locked pass ([`Registry::remove_many`]) after the snapshot was taken.
//! - A registration id appears at most once; ids are never reused.
//! - An event whose last listener is removed is dropped from the map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::DispatchError;
use crate::listeners::{ListenerHandle, ListenerOptions, ListenerRef, ListenerSpec};

/// Consistent, immutable view of one event's listeners in dispatch order.
pub(crate) type Snapshot = Arc<Vec<Arc<Registration>>>;

/// One registered listener.
pub(crate) struct Registration {
    id: u64,
    event: Arc<str>,
    pub(crate) listener: ListenerRef,
    pub(crate) options: ListenerOptions,
    /// Taken by the emit that invokes a once-listener.
    claimed: AtomicBool,
}

impl Registration {
    pub(crate) fn handle(&self) -> ListenerHandle {
        ListenerHandle::new(self.id, Arc::clone(&self.event))
    }

    pub(crate) fn name(&self) -> &str {
        self.listener.name()
    }

    /// Claims the right to invoke this listener.
    ///
    /// Always succeeds for regular listeners. For once-listeners only one in-flight
    /// invocation may hold the claim.
    pub(crate) fn try_claim(&self) -> bool {
        if !self.options.once {
            return true;
        }
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Re-arms a once-listener whose invocation did not succeed.
    pub(crate) fn release(&self) {
        if self.options.once {
            self.claimed.store(false, Ordering::Release);
        }
    }
}

/// Invocation right on one registration, held for the whole walk and wait of an emit.
///
/// Dropping a claim that did not fire re-arms a once-listener. Dropping a fired claim
/// before [`Claim::settle`] schedules the removal that the emit could not finish, so a
/// dropped emit future never strands a once-listener in the claimed state.
pub(crate) struct Claim {
    reg: Arc<Registration>,
    registry: Arc<Registry>,
    fired: bool,
    settled: bool,
}

impl Claim {
    /// Takes the claim on `reg`, or `None` if another emit holds it.
    pub(crate) fn acquire(reg: &Arc<Registration>, registry: &Arc<Registry>) -> Option<Self> {
        reg.try_claim().then(|| Self {
            reg: Arc::clone(reg),
            registry: Arc::clone(registry),
            fired: false,
            settled: false,
        })
    }

    pub(crate) fn registration(&self) -> &Arc<Registration> {
        &self.reg
    }

    /// Marks the invocation as succeeded.
    pub(crate) fn fire(mut self) -> Self {
        self.fired = true;
        self
    }

    /// Handle to remove after success, for once-listeners.
    pub(crate) fn once_handle(&self) -> Option<ListenerHandle> {
        (self.fired && self.reg.options.once).then(|| self.reg.handle())
    }

    /// Ends the claim after its once-removal has run.
    pub(crate) fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if self.settled || !self.reg.options.once {
            return;
        }
        if !self.fired {
            self.reg.release();
            return;
        }
        let handle = self.reg.handle();
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let registry = Arc::clone(&self.registry);
                rt.spawn(async move {
                    registry.remove_many(std::slice::from_ref(&handle)).await;
                });
            }
            Err(_) => {
                tracing::warn!(listener = %handle, "no runtime to remove fired once-listener; re-arming");
                self.reg.release();
            }
        }
    }
}

/// Registry of listeners keyed by event name.
pub(crate) struct Registry {
    listeners: RwLock<HashMap<Arc<str>, Snapshot>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers one spec.
    pub(crate) async fn add_one(&self, spec: ListenerSpec) -> Result<ListenerHandle, DispatchError> {
        let (event, listener, options) = spec.validate()?;
        let mut map = self.listeners.write().await;
        Ok(self.insert_locked(&mut map, event, listener, options))
    }

    /// Registers all specs, or none of them.
    ///
    /// Every spec is validated before the write lock is taken; the first invalid one
    /// aborts the whole call and the registry stays unchanged.
    pub(crate) async fn add(
        &self,
        specs: Vec<ListenerSpec>,
    ) -> Result<Vec<ListenerHandle>, DispatchError> {
        let validated = specs
            .into_iter()
            .map(ListenerSpec::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = self.listeners.write().await;
        Ok(validated
            .into_iter()
            .map(|(event, listener, options)| self.insert_locked(&mut map, event, listener, options))
            .collect())
    }

    /// Inserts after the last listener with priority >= the new one (stable on ties).
    fn insert_locked(
        &self,
        map: &mut HashMap<Arc<str>, Snapshot>,
        event: Arc<str>,
        listener: ListenerRef,
        options: ListenerOptions,
    ) -> ListenerHandle {
        let reg = Arc::new(Registration {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event: Arc::clone(&event),
            listener,
            options,
            claimed: AtomicBool::new(false),
        });
        let handle = reg.handle();

        let list = Arc::make_mut(map.entry(event).or_default());
        let pos = list.partition_point(|r| r.options.priority >= options.priority);
        list.insert(pos, reg);
        handle
    }

    /// Removes one registration, preserving the order of the others.
    pub(crate) async fn remove(&self, handle: &ListenerHandle) -> Result<(), DispatchError> {
        let mut map = self.listeners.write().await;
        Self::remove_locked(&mut map, handle)
    }

    /// Removes several registrations in one write-locked pass.
    ///
    /// Handles that are already gone are skipped. Returns how many were removed.
    pub(crate) async fn remove_many(&self, handles: &[ListenerHandle]) -> usize {
        if handles.is_empty() {
            return 0;
        }
        let mut map = self.listeners.write().await;
        handles
            .iter()
            .filter(|h| match Self::remove_locked(&mut map, h) {
                Ok(()) => true,
                Err(_) => {
                    tracing::trace!(listener = %h, "once-listener already removed");
                    false
                }
            })
            .count()
    }

    fn remove_locked(
        map: &mut HashMap<Arc<str>, Snapshot>,
        handle: &ListenerHandle,
    ) -> Result<(), DispatchError> {
        let not_found = || DispatchError::ListenerNotFound {
            event: handle.event_arc(),
        };

        let list = map.get_mut(handle.event()).ok_or_else(not_found)?;
        let pos = list
            .iter()
            .position(|r| r.id == handle.id())
            .ok_or_else(not_found)?;

        let list = Arc::make_mut(list);
        list.remove(pos);
        if list.is_empty() {
            map.remove(handle.event());
        }
        Ok(())
    }

    /// Returns the current listener sequence for `event`, if any.
    pub(crate) async fn snapshot(&self, event: &str) -> Option<Snapshot> {
        self.listeners.read().await.get(event).cloned()
    }

    /// True if `event` has at least one listener.
    pub(crate) async fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .read()
            .await
            .get(event)
            .is_some_and(|l| !l.is_empty())
    }

    /// Number of listeners registered for `event`.
    pub(crate) async fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .await
            .get(event)
            .map_or(0, |l| l.len())
    }

    /// Returns sorted list of event names with at least one listener.
    pub(crate) async fn event_names(&self) -> Vec<String> {
        let map = self.listeners.read().await;
        let mut names: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }
}

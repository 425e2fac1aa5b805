//! Lifecycle listener fan-out.
//!
//! Listeners are notified synchronously, in registration order, on the
//! thread that performed the mutation. Callbacks are expected to be fast
//! and must not block: nothing times them out.

use crate::plugin::record::PluginRecord;
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle event kinds delivered to listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Record inserted into the registry
    Added,
    /// Record removed from the registry
    Removed,
    /// Init hook succeeded
    Initialized,
    /// Destroy hook succeeded
    Destroyed,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::Added => write!(f, "added"),
            LifecycleEvent::Removed => write!(f, "removed"),
            LifecycleEvent::Initialized => write!(f, "initialized"),
            LifecycleEvent::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Observer of plugin lifecycle events.
///
/// Every method defaults to a no-op so observers only implement what they
/// care about.
pub trait LifecycleListener: Send + Sync {
    /// A record was added to the registry.
    fn plugin_added(&self, _record: &Arc<PluginRecord>) {}

    /// A record was removed from the registry.
    fn plugin_removed(&self, _record: &Arc<PluginRecord>) {}

    /// A record's plugin was initialized.
    fn plugin_initialized(&self, _record: &Arc<PluginRecord>) {}

    /// A record's plugin was destroyed.
    fn plugin_destroyed(&self, _record: &Arc<PluginRecord>) {}
}

/// Shared, copy-on-write list of distinct listeners.
///
/// Dispatch iterates a snapshot, so a callback that adds or removes
/// listeners affects only later events.
#[derive(Clone, Default)]
pub struct ListenerSet {
    inner: Arc<RwLock<Arc<Vec<Arc<dyn LifecycleListener>>>>>,
}

impl ListenerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Returns `false` if the same listener is already present.
    pub fn add(&self, listener: Arc<dyn LifecycleListener>) -> bool {
        let mut guard = self.inner.write();
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
        true
    }

    /// Remove a listener. Returns `false` if it was not present.
    pub fn remove(&self, listener: &Arc<dyn LifecycleListener>) -> bool {
        let mut guard = self.inner.write();
        if !guard.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        let next: Vec<_> = guard
            .iter()
            .filter(|l| !same_listener(l, listener))
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Deliver one event to every listener.
    pub fn notify(&self, event: LifecycleEvent, record: &Arc<PluginRecord>) {
        let snapshot = self.inner.read().clone();
        tracing::trace!(
            plugin = %record.name(),
            %event,
            listeners = snapshot.len(),
            "Dispatching lifecycle event"
        );
        for listener in snapshot.iter() {
            match event {
                LifecycleEvent::Added => listener.plugin_added(record),
                LifecycleEvent::Removed => listener.plugin_removed(record),
                LifecycleEvent::Initialized => listener.plugin_initialized(record),
                LifecycleEvent::Destroyed => listener.plugin_destroyed(record),
            }
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Identity comparison, ignoring vtable differences.
fn same_listener(a: &Arc<dyn LifecycleListener>, b: &Arc<dyn LifecycleListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

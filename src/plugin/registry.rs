//! Plugin registry for managing plugins.
//!
//! Handles discovery, registration, exclusions, lifecycle and shutdown.

use crate::core::{Error, Result};
use crate::plugin::interface::ConverterPlugin;
use crate::plugin::listener::{LifecycleEvent, LifecycleListener, ListenerSet};
use crate::plugin::loader::PluginLoader;
use crate::plugin::record::PluginRecord;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Outcome of one discovery pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Candidates turned into records
    pub registered: usize,
    /// Candidates that failed to materialize or were rejected
    pub skipped: usize,
}

#[derive(Default)]
struct Inner {
    /// Ordered by display name, then id
    records: BTreeMap<(String, String), Arc<PluginRecord>>,
    /// Ids between the duplicate check and insertion
    pending: HashSet<String>,
    exclusions: HashSet<String>,
    closed: bool,
}

impl Inner {
    fn find(&self, id: &str) -> Option<&Arc<PluginRecord>> {
        self.records.values().find(|r| r.id() == id)
    }
}

/// Registry owning every discovered plugin.
///
/// The registry is passive: it runs on whichever thread calls it. The
/// record collection is guarded by one registry-wide lock, which is never
/// held while plugin hooks or listeners run.
///
/// # Example
///
/// ```rust,ignore
/// let registry = PluginRegistry::new();
/// registry.set_exclusions(settings.exclusions());
/// registry.add_listener(catalog);
/// registry.discover(&mut ManifestLoader::new(paths.plugin_dir.clone()));
///
/// registry.enable("org.example.PngShrinker")?;
/// // ...
/// registry.teardown();
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    inner: Mutex<Inner>,
    listeners: ListenerSet,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every candidate the loader yields.
    ///
    /// Failed candidates are logged and skipped; they never abort the pass.
    pub fn discover(&self, loader: &mut dyn PluginLoader) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for candidate in loader.candidates() {
            let result = candidate.and_then(|plugin| self.register(plugin));
            match result {
                Ok(_) => report.registered += 1,
                Err(e) => {
                    tracing::warn!("Skipping plugin candidate: {}", e);
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            registered = report.registered,
            skipped = report.skipped,
            "Plugin discovery finished"
        );
        report
    }

    /// Register a plugin instance.
    ///
    /// Excluded plugins are stored without being initialized. Others are
    /// initialized immediately; an init failure is logged and the record
    /// stays `Registered`. The record is then inserted and an `added` event
    /// fires. Fails only for duplicate ids or after [`teardown`](Self::teardown).
    pub fn register(&self, plugin: Box<dyn ConverterPlugin>) -> Result<Arc<PluginRecord>> {
        let id = plugin.implementation_id();

        let excluded = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(Error::RegistryClosed);
            }
            if inner.pending.contains(&id) || inner.find(&id).is_some() {
                tracing::warn!("Plugin already registered: {}", id);
                return Err(Error::DuplicatePlugin(id));
            }
            inner.pending.insert(id.clone());
            inner.exclusions.contains(&id)
        };

        let record = PluginRecord::new(plugin, self.listeners.clone(), excluded);

        if excluded {
            tracing::info!(plugin = %record.name(), "Plugin disabled by the user");
        } else if let Err(e) = record.initialize() {
            tracing::error!(
                plugin = %record.name(),
                "Plugin could not be initialized: {}",
                e
            );
        }

        let inserted = {
            let mut inner = self.inner.lock();
            inner.pending.remove(&id);
            if inner.closed {
                false
            } else {
                inner.records.insert(record.sort_key(), record.clone());
                true
            }
        };

        if !inserted {
            // Teardown ran while this plugin was initializing.
            if let Err(e) = record.close() {
                tracing::warn!(plugin = %record.name(), "Late shutdown failed: {}", e);
            }
            return Err(Error::RegistryClosed);
        }

        tracing::debug!(
            plugin = %record.name(),
            id = %record.id(),
            state = %record.state(),
            "Plugin registered"
        );
        self.listeners.notify(LifecycleEvent::Added, &record);
        Ok(record)
    }

    /// Snapshot of all records, ordered by display name.
    pub fn plugins(&self) -> Vec<Arc<PluginRecord>> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Look up a record by implementation id.
    pub fn get(&self, id: &str) -> Option<Arc<PluginRecord>> {
        self.inner.lock().find(id).cloned()
    }

    /// Get plugin count.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Check if no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Replace the exclusion set. Only affects later registrations.
    pub fn set_exclusions<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exclusions: HashSet<String> = ids.into_iter().map(Into::into).collect();
        tracing::debug!(count = exclusions.len(), "Plugin exclusions updated");
        self.inner.lock().exclusions = exclusions;
    }

    /// Current exclusion set, sorted.
    pub fn exclusions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock().exclusions.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Subscribe to lifecycle events. Adding the same listener twice is a no-op.
    pub fn add_listener(&self, listener: Arc<dyn LifecycleListener>) -> bool {
        self.listeners.add(listener)
    }

    /// Unsubscribe a listener.
    pub fn remove_listener(&self, listener: &Arc<dyn LifecycleListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Initialize a record by id.
    pub fn initialize(&self, id: &str) -> Result<()> {
        self.require(id)?.initialize()
    }

    /// Enable a record by id.
    ///
    /// Keeping a single plugin enabled is up to the caller, see
    /// [`PluginSelection`](crate::plugin::PluginSelection).
    pub fn enable(&self, id: &str) -> Result<()> {
        self.require(id)?.enable()
    }

    /// Disable a record by id.
    pub fn disable(&self, id: &str) -> Result<()> {
        self.require(id)?.disable()
    }

    /// Destroy a record by id.
    pub fn destroy(&self, id: &str) -> Result<()> {
        self.require(id)?.destroy()
    }

    /// Destroy a record and drop it from the registry.
    ///
    /// Hook failures are logged; the record is removed regardless.
    pub fn remove(&self, id: &str) -> Result<Arc<PluginRecord>> {
        let record = {
            let mut inner = self.inner.lock();
            let key = inner
                .find(id)
                .map(|r| r.sort_key())
                .ok_or_else(|| Error::PluginNotFound(id.to_string()))?;
            inner
                .records
                .remove(&key)
                .ok_or_else(|| Error::PluginNotFound(id.to_string()))?
        };

        if let Err(e) = record.destroy() {
            tracing::warn!(plugin = %record.name(), "Destroy on removal failed: {}", e);
        }
        tracing::info!(plugin = %record.name(), "Plugin removed");
        self.listeners.notify(LifecycleEvent::Removed, &record);
        Ok(record)
    }

    /// Check whether [`teardown`](Self::teardown) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Disable and destroy every plugin. Idempotent.
    ///
    /// Returns `true` if this call performed the shutdown. Individual hook
    /// failures are logged and do not stop the remaining records. Afterwards
    /// every record refuses `initialize` and `enable` with
    /// [`Error::RegistryClosed`].
    pub fn teardown(&self) -> bool {
        let records = {
            let mut inner = self.inner.lock();
            if inner.closed {
                tracing::info!("Plugin registry already shut down. Skipping.");
                return false;
            }
            inner.closed = true;
            inner.records.values().cloned().collect::<Vec<_>>()
        };

        tracing::info!(
            count = records.len(),
            "Shutting down the plugin registry and all registered plugins"
        );
        for record in records {
            if let Err(e) = record.close() {
                tracing::warn!(plugin = %record.name(), "Shutdown failed: {}", e);
            }
        }
        true
    }

    fn require(&self, id: &str) -> Result<Arc<PluginRecord>> {
        self.get(id)
            .ok_or_else(|| Error::PluginNotFound(id.to_string()))
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PluginRegistry")
            .field("plugins", &inner.records.len())
            .field("exclusions", &inner.exclusions.len())
            .field("closed", &inner.closed)
            .field("listeners", &self.listeners)
            .finish()
    }
}

//! Plugin selection.
//!
//! Keeps at most one plugin enabled and routes dropped content to it.

use crate::core::{Error, Result};
use crate::plugin::interface::DropPayload;
use crate::plugin::listener::LifecycleListener;
use crate::plugin::record::PluginRecord;
use crate::plugin::registry::PluginRegistry;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Slot = Mutex<Option<Arc<PluginRecord>>>;

/// The currently selected plugin.
///
/// Selecting a plugin disables the previous one and enables the new one.
/// If the selected record is destroyed or removed, the selection clears.
pub struct PluginSelection {
    registry: Arc<PluginRegistry>,
    selected: Arc<Slot>,
    /// Serializes select/clear so two plugins are never enabled together
    switch: Mutex<()>,
}

impl PluginSelection {
    /// Create a selection bound to `registry` and subscribe it to lifecycle events.
    pub fn attach(registry: Arc<PluginRegistry>) -> Self {
        let selected: Arc<Slot> = Arc::new(Mutex::new(None));
        registry.add_listener(Arc::new(SelectionWatcher {
            selected: Arc::downgrade(&selected),
        }));

        Self {
            registry,
            selected,
            switch: Mutex::new(()),
        }
    }

    /// Currently selected record.
    pub fn selected(&self) -> Option<Arc<PluginRecord>> {
        self.selected.lock().clone()
    }

    /// Select the plugin with the given id.
    ///
    /// A failure to disable the previous plugin is logged; a failure to
    /// enable the new one is returned. The new plugin stays selected either
    /// way.
    pub fn select(&self, id: &str) -> Result<()> {
        let record = self
            .registry
            .get(id)
            .ok_or_else(|| Error::PluginNotFound(id.to_string()))?;

        let _switch = self.switch.lock();
        let previous = self.selected.lock().replace(record.clone());

        if let Some(previous) = previous.filter(|p| !Arc::ptr_eq(p, &record)) {
            if let Err(e) = previous.disable() {
                tracing::error!(
                    plugin = %previous.name(),
                    "Could not disable deselected plugin: {}",
                    e
                );
            }
        }

        record.enable().map_err(|e| {
            tracing::error!(plugin = %record.name(), "Could not enable selected plugin: {}", e);
            e
        })?;
        tracing::info!(plugin = %record.name(), "Plugin selected");
        Ok(())
    }

    /// Disable and deselect the current plugin.
    pub fn clear(&self) -> Result<()> {
        let _switch = self.switch.lock();
        let previous = self.selected.lock().take();
        match previous {
            Some(record) => record.disable(),
            None => Ok(()),
        }
    }

    /// Whether the selected plugin accepts the payload.
    pub fn can_import(&self, payload: &DropPayload) -> bool {
        self.selected()
            .is_some_and(|record| record.can_import(payload))
    }

    /// Convert the payload with the selected plugin.
    pub fn import(&self, payload: &DropPayload) -> Result<bool> {
        let record = self.selected().ok_or(Error::NoSelection)?;
        record.import(payload)
    }
}

impl std::fmt::Debug for PluginSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSelection")
            .field("selected", &self.selected().map(|r| r.id().to_string()))
            .finish()
    }
}

/// Clears the selection when the selected record goes away.
struct SelectionWatcher {
    selected: Weak<Slot>,
}

impl SelectionWatcher {
    fn forget(&self, record: &Arc<PluginRecord>) {
        let Some(selected) = self.selected.upgrade() else {
            return;
        };
        let mut slot = selected.lock();
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, record)) {
            tracing::debug!(plugin = %record.name(), "Selected plugin went away");
            *slot = None;
        }
    }
}

impl LifecycleListener for SelectionWatcher {
    fn plugin_removed(&self, record: &Arc<PluginRecord>) {
        self.forget(record);
    }

    fn plugin_destroyed(&self, record: &Arc<PluginRecord>) {
        self.forget(record);
    }
}

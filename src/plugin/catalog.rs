//! Plugin catalog backing the settings view.
//!
//! Mirrors the registry through lifecycle events and lets the user switch
//! individual plugins on or off.

use crate::core::{Error, Result};
use crate::plugin::listener::LifecycleListener;
use crate::plugin::record::PluginRecord;
use crate::plugin::registry::PluginRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One displayed catalog row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub id: String,
    pub name: String,
    pub author: String,
    pub author_email: String,
    pub description: String,
    pub version: String,
    pub website: String,
    pub initialized: bool,
    pub excluded: bool,
}

impl CatalogRow {
    fn of(record: &PluginRecord) -> Self {
        let desc = record.descriptor();
        Self {
            id: record.id().to_string(),
            name: desc.name.clone(),
            author: desc.author_name.clone(),
            author_email: desc.author_email.clone(),
            description: desc.description.clone(),
            version: desc.version.clone(),
            website: desc.website.clone(),
            initialized: record.is_initialized(),
            excluded: record.is_excluded(),
        }
    }
}

/// Catalog of every registered plugin, ordered by display name.
#[derive(Default)]
pub struct PluginCatalog {
    records: RwLock<Vec<Arc<PluginRecord>>>,
    /// Bumped on every lifecycle event so views know to refresh
    revision: AtomicU64,
}

impl PluginCatalog {
    /// Create a catalog seeded from `registry` and subscribed to its events.
    pub fn attach(registry: &PluginRegistry) -> Arc<Self> {
        let catalog = Arc::new(Self::default());
        registry.add_listener(catalog.clone());
        for record in registry.plugins() {
            catalog.insert(record);
        }
        catalog
    }

    /// Current rows.
    pub fn rows(&self) -> Vec<CatalogRow> {
        self.records
            .read()
            .iter()
            .map(|r| CatalogRow::of(r))
            .collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Change counter.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }

    /// Switch a plugin on (initialize) or off (disable, then destroy).
    ///
    /// Switching off is final: a destroyed plugin cannot be initialized
    /// again in this session.
    pub fn set_initialized(&self, id: &str, initialized: bool) -> Result<()> {
        let record = self
            .records
            .read()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| Error::PluginNotFound(id.to_string()))?;

        if initialized {
            record.initialize()
        } else {
            record.destroy()
        }
    }

    fn insert(&self, record: Arc<PluginRecord>) {
        let mut records = self.records.write();
        if records.iter().any(|r| r.id() == record.id()) {
            return;
        }
        let key = record.sort_key();
        let pos = records.partition_point(|r| r.sort_key() < key);
        records.insert(pos, record);
        self.bump();
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::Relaxed);
    }
}

impl LifecycleListener for PluginCatalog {
    fn plugin_added(&self, record: &Arc<PluginRecord>) {
        self.insert(record.clone());
    }

    fn plugin_removed(&self, record: &Arc<PluginRecord>) {
        self.records.write().retain(|r| r.id() != record.id());
        self.bump();
    }

    fn plugin_initialized(&self, _record: &Arc<PluginRecord>) {
        self.bump();
    }

    fn plugin_destroyed(&self, _record: &Arc<PluginRecord>) {
        self.bump();
    }
}

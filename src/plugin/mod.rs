//! Plugin Module
//!
//! Provides the plugin lifecycle runtime:
//! - Plugin interface and descriptors
//! - Records and the lifecycle state machine
//! - Registry with discovery, exclusions and shutdown
//! - Listener fan-out, selection and catalog consumers

pub mod catalog;
pub mod interface;
pub mod listener;
pub mod loader;
pub mod record;
pub mod registry;
pub mod selection;

#[cfg(test)]
pub(crate) mod probe;

pub use catalog::{CatalogRow, PluginCatalog};
pub use interface::{ConverterPlugin, DropPayload, PluginDescriptor, PluginError, PluginResult};
pub use listener::{LifecycleEvent, LifecycleListener, ListenerSet};
pub use loader::{Candidate, ManifestLoader, PluginFactory, PluginLoader, PluginManifest, StaticLoader};
pub use record::{LifecycleOp, PluginRecord, PluginState};
pub use registry::{DiscoveryReport, PluginRegistry};
pub use selection::PluginSelection;

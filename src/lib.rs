//! # Drop Converter
//!
//! Plugin runtime for a drag-and-drop converter:
//! - **Plugins**: lifecycle-managed converter plugins with descriptors
//! - **Registry**: discovery, exclusions, lifecycle events and shutdown
//! - **Consumers**: single-plugin selection and a settings catalog
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drop_converter::config::{ConverterPaths, Settings};
//! use drop_converter::monitoring::init_logging;
//! use drop_converter::plugin::{ManifestLoader, PluginRegistry, PluginSelection};
//! use std::sync::Arc;
//!
//! fn main() -> drop_converter::Result<()> {
//!     let paths = ConverterPaths::user_default()?;
//!     paths.ensure()?;
//!     let mut settings = Settings::load(&paths.settings_file)?;
//!     init_logging(&settings.logging)?;
//!
//!     let registry = Arc::new(PluginRegistry::new());
//!     registry.set_exclusions(settings.exclusions());
//!     let selection = PluginSelection::attach(registry.clone());
//!
//!     let mut loader = ManifestLoader::new(&paths.plugin_dir);
//!     registry.discover(&mut loader);
//!     if let Some(first) = registry.plugins().iter().find(|r| r.is_initialized()) {
//!         selection.select(first.id())?;
//!     }
//!
//!     settings.record_disabled(&registry.plugins());
//!     settings.store(&paths.settings_file)?;
//!     registry.teardown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod monitoring;
pub mod plugin;

pub use core::error::{Error, Result};

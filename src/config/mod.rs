//! Configuration Module
//!
//! Directory layout and persistent user settings.

pub mod paths;
pub mod settings;

pub use paths::ConverterPaths;
pub use settings::{Settings, WindowPosition};

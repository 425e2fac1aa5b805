//! Converter directory layout.

use crate::core::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the per-user base directory.
pub const BASE_DIR_NAME: &str = ".drop_converter";

/// Locations used by the converter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConverterPaths {
    /// Base directory
    pub base_dir: PathBuf,
    /// Plugin manifests
    pub plugin_dir: PathBuf,
    /// Log output
    pub logging_dir: PathBuf,
    /// Settings file
    pub settings_file: PathBuf,
}

impl ConverterPaths {
    /// Layout rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            plugin_dir: base_dir.join("plugins"),
            logging_dir: base_dir.join("logging"),
            settings_file: base_dir.join("settings.json"),
            base_dir,
        }
    }

    /// Layout under the user's home directory.
    pub fn user_default() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
        Ok(Self::new(home.join(BASE_DIR_NAME)))
    }

    /// Create missing directories and check they are writable.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.base_dir, &self.plugin_dir, &self.logging_dir] {
            ensure_dir(dir)?;
        }
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::debug!("Created directory {}", dir.display());
    }

    let metadata = std::fs::metadata(dir)?;
    if !metadata.is_dir() {
        return Err(Error::Config(format!("{} is not a directory", dir.display())));
    }
    if metadata.permissions().readonly() {
        return Err(Error::Config(format!("{} is not writable", dir.display())));
    }
    Ok(())
}

//! Persistent user settings.

use crate::core::Result;
use crate::monitoring::LoggerConfig;
use crate::plugin::record::PluginRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Screen position of the drop window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPosition {
    UpperLeft,
    Upper,
    UpperRight,
    Right,
    #[default]
    LowerRight,
    Lower,
    LowerLeft,
    Left,
}

impl WindowPosition {
    /// Window origin for a frame of `frame` size on a screen of `screen` size.
    pub fn align(self, frame: (i32, i32), screen: (i32, i32)) -> (i32, i32) {
        let (fw, fh) = frame;
        let (sw, sh) = screen;
        let center_x = sw / 2 - fw / 2;
        let center_y = sh / 2 - fh / 2;

        match self {
            WindowPosition::UpperLeft => (0, 0),
            WindowPosition::Upper => (center_x, 0),
            WindowPosition::UpperRight => (sw - fw, 0),
            WindowPosition::Right => (sw - fw, center_y),
            WindowPosition::LowerRight => (sw - fw, sh - fh),
            WindowPosition::Lower => (center_x, sh - fh),
            WindowPosition::LowerLeft => (0, sh - fh),
            WindowPosition::Left => (0, center_y),
        }
    }
}

/// User settings stored as JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ids of plugins that must not be initialized
    pub disabled_plugins: Vec<String>,
    /// Preferred look and feel, system default when unset
    pub look_and_feel: Option<String>,
    pub window_position: WindowPosition,
    pub logging: LoggerConfig,
}

impl Settings {
    /// Load settings, creating the file with defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.store(path)?;
            tracing::info!("Created settings file {}", path.display());
            return Ok(settings);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write settings as pretty JSON.
    pub fn store(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Exclusion set for the plugin registry.
    pub fn exclusions(&self) -> Vec<String> {
        self.disabled_plugins
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Remember every record that is not initialized as disabled.
    ///
    /// Must run before registry teardown, which destroys everything.
    /// An empty slice leaves the setting untouched.
    pub fn record_disabled(&mut self, records: &[Arc<PluginRecord>]) {
        if records.is_empty() {
            return;
        }
        self.disabled_plugins = records
            .iter()
            .filter(|r| !r.is_initialized())
            .map(|r| r.id().to_string())
            .collect();
    }
}

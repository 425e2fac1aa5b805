//! Plugin interface definition.
//!
//! Defines the capability every converter plugin implements and the
//! metadata the runtime extracts from it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Static display and author metadata about a plugin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDescriptor {
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Plugin name
    pub name: String,
    /// Description
    pub description: String,
    /// Version
    pub version: String,
    /// Homepage URL
    pub website: String,
}

impl PluginDescriptor {
    /// Create a descriptor carrying only a display name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set author name.
    pub fn with_author(mut self, author: &str) -> Self {
        self.author_name = author.to_string();
        self
    }

    /// Set author email.
    pub fn with_email(mut self, email: &str) -> Self {
        self.author_email = email.to_string();
        self
    }

    /// Set description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Set version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Set website.
    pub fn with_website(mut self, website: &str) -> Self {
        self.website = website.to_string();
        self
    }

    /// Extract the descriptor of a plugin.
    ///
    /// Uses the plugin's own metadata when it has any, otherwise a
    /// descriptor named after [`ConverterPlugin::display_name`].
    pub fn of(plugin: &dyn ConverterPlugin) -> Self {
        plugin
            .describe()
            .unwrap_or_else(|| Self::new(&plugin.display_name()))
    }
}

/// Content dropped onto the converter (or pasted from the clipboard).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropPayload {
    /// Offered MIME types, most specific first
    pub mime_types: Vec<String>,
    /// Dropped files
    pub files: Vec<PathBuf>,
    /// Dropped text
    pub text: Option<String>,
}

impl DropPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of dropped files.
    pub fn files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            mime_types: vec!["text/uri-list".to_string()],
            files: files.into_iter().map(Into::into).collect(),
            text: None,
        }
    }

    /// Payload of dropped plain text.
    pub fn text(text: &str) -> Self {
        Self {
            mime_types: vec!["text/plain".to_string()],
            files: Vec::new(),
            text: Some(text.to_string()),
        }
    }

    /// Add an offered MIME type.
    pub fn with_mime_type(mut self, mime: &str) -> Self {
        self.mime_types.push(mime.to_string());
        self
    }

    /// Check whether a MIME type is offered.
    pub fn offers(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime)
    }

    /// Check whether nothing was dropped.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.text.is_none()
    }
}

/// Result type for plugin hooks.
pub type PluginResult<T> = std::result::Result<T, PluginError>;

/// Failure reported by a plugin hook.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// A lifecycle hook (init/enable/disable/destroy) failed
    #[error("Initialization failed: {0}")]
    Initialization(String),
    /// Converting dropped content failed
    #[error("Conversion failed: {0}")]
    Conversion(String),
}

impl PluginError {
    /// Create a lifecycle failure.
    pub fn initialization(message: &str) -> Self {
        PluginError::Initialization(message.to_string())
    }

    /// Create a conversion failure.
    pub fn conversion(message: &str) -> Self {
        PluginError::Conversion(message.to_string())
    }

    /// Failure message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            PluginError::Initialization(m) | PluginError::Conversion(m) => m,
        }
    }
}

/// Capability every converter plugin implements.
///
/// The four lifecycle hooks are only ever called by the runtime through a
/// [`PluginRecord`](crate::plugin::PluginRecord), which guarantees each
/// transition runs at most once and never concurrently.
pub trait ConverterPlugin: Send {
    /// Called once after discovery. Acts as the plugin's constructor.
    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Called once at shutdown. Acts as the plugin's destructor.
    fn destroy(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Called each time the user selects this plugin.
    fn enable(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Called each time the user deselects this plugin.
    fn disable(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Explicit metadata, if the plugin provides any.
    fn describe(&self) -> Option<PluginDescriptor> {
        None
    }

    /// Stable implementation identifier used for ordering ties and exclusions.
    fn implementation_id(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Fallback display name when no metadata is present.
    fn display_name(&self) -> String {
        self.implementation_id()
    }

    /// Whether the plugin can handle the payload.
    ///
    /// Polled frequently while content hovers over the drop target, so it
    /// must stay cheap.
    fn can_import(&self, _payload: &DropPayload) -> bool {
        false
    }

    /// Convert the payload. Returns `true` once the content was handled.
    fn import_data(&mut self, _payload: &DropPayload) -> PluginResult<bool> {
        Ok(false)
    }
}

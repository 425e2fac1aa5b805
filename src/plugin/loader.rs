//! Plugin loaders.
//!
//! A loader yields a lazy, finite sequence of candidates. Each candidate is
//! either a materialized plugin instance or a discovery failure; the
//! registry logs failures and keeps going.

use crate::core::{Error, Result};
use crate::plugin::interface::ConverterPlugin;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One discovery result.
pub type Candidate = Result<Box<dyn ConverterPlugin>>;

/// Source of newly discovered plugin instances.
pub trait PluginLoader {
    /// Candidates discovered by this loader. May be empty.
    fn candidates(&mut self) -> Box<dyn Iterator<Item = Candidate> + '_>;
}

/// Loader over a fixed list of candidates, drained on discovery.
#[derive(Default)]
pub struct StaticLoader {
    items: Vec<Candidate>,
}

impl StaticLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin instance.
    pub fn with_plugin(mut self, plugin: Box<dyn ConverterPlugin>) -> Self {
        self.items.push(Ok(plugin));
        self
    }

    /// Add a candidate that failed to materialize.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.items.push(Err(Error::Discovery(message.to_string())));
        self
    }

    /// Number of pending candidates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no candidate is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PluginLoader for StaticLoader {
    fn candidates(&mut self) -> Box<dyn Iterator<Item = Candidate> + '_> {
        Box::new(self.items.drain(..))
    }
}

/// Manifest listing the implementations a plugin package provides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Implementation identifiers
    pub implementations: Vec<String>,
}

/// Constructor for one plugin implementation.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn ConverterPlugin> + Send + Sync>;

/// Loader that reads `*.json` manifests from a plugin root directory.
///
/// Every implementation listed in a manifest is instantiated through the
/// factory registered under the same identifier.
///
/// ```text
/// plugins/
/// ├── images.json   {"implementations": ["org.example.PngShrinker"]}
/// └── archive.json  {"implementations": ["org.example.Zipper", "org.example.Tar"]}
/// ```
pub struct ManifestLoader {
    root: PathBuf,
    factories: HashMap<String, PluginFactory>,
}

impl ManifestLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            factories: HashMap::new(),
        }
    }

    /// Register the factory for an implementation identifier.
    ///
    /// The factory's plugin should report `implementation` as its
    /// [`implementation_id`](ConverterPlugin::implementation_id): records,
    /// and therefore persisted exclusions, are keyed by that id. A mismatch
    /// is logged at discovery.
    pub fn with_factory<F>(mut self, implementation: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ConverterPlugin> + Send + Sync + 'static,
    {
        self.factories
            .insert(implementation.to_string(), Box::new(factory));
        self
    }

    /// Plugin root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest files under the root, in file name order.
    fn manifest_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            tracing::debug!("Plugin directory does not exist: {}", self.root.display());
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn instantiate(&self, manifest_path: &Path) -> Vec<Candidate> {
        let manifest = match load_manifest(manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                return vec![Err(Error::Discovery(format!(
                    "{}: {}",
                    manifest_path.display(),
                    e
                )))]
            }
        };

        manifest
            .implementations
            .iter()
            .map(|implementation| match self.factories.get(implementation) {
                Some(factory) => {
                    let plugin = factory();
                    let id = plugin.implementation_id();
                    if id != *implementation {
                        tracing::warn!(
                            manifest = %manifest_path.display(),
                            listed = %implementation,
                            actual = %id,
                            "Plugin id differs from its manifest entry; exclusions apply to the actual id"
                        );
                    }
                    Ok(plugin)
                }
                None => Err(Error::Discovery(format!(
                    "{}: unknown implementation {}",
                    manifest_path.display(),
                    implementation
                ))),
            })
            .collect()
    }
}

impl PluginLoader for ManifestLoader {
    fn candidates(&mut self) -> Box<dyn Iterator<Item = Candidate> + '_> {
        let paths = match self.manifest_paths() {
            Ok(paths) => paths,
            Err(e) => {
                return Box::new(std::iter::once(Err(Error::Discovery(format!(
                    "Cannot scan {}: {}",
                    self.root.display(),
                    e
                )))))
            }
        };

        let this: &Self = self;
        Box::new(
            paths
                .into_iter()
                .flat_map(move |path| this.instantiate(&path)),
        )
    }
}

/// Load a plugin manifest from a file.
pub fn load_manifest(path: &Path) -> Result<PluginManifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest: PluginManifest = serde_json::from_str(&content)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::probe::ProbePlugin;
    use tempfile::TempDir;

    fn loader_in(dir: &Path) -> ManifestLoader {
        ManifestLoader::new(dir)
            .with_factory("org.example.Png", || Box::new(ProbePlugin::new("org.example.Png")))
            .with_factory("org.example.Zip", || Box::new(ProbePlugin::new("org.example.Zip")))
    }

    fn ids(loader: &mut dyn PluginLoader) -> Vec<std::result::Result<String, String>> {
        loader
            .candidates()
            .map(|c| c.map(|p| p.implementation_id()).map_err(|e| e.to_string()))
            .collect()
    }

    #[test]
    fn test_static_loader_drains() {
        let mut loader = StaticLoader::new()
            .with_plugin(Box::new(ProbePlugin::new("a")))
            .with_failure("broken archive")
            .with_plugin(Box::new(ProbePlugin::new("b")));
        assert_eq!(loader.len(), 3);

        let results = ids(&mut loader);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok("a".to_string()));
        assert!(results[1].is_err());
        assert!(loader.is_empty());
        assert!(ids(&mut loader).is_empty());
    }

    #[test]
    fn test_manifest_loader_missing_root() {
        let temp = TempDir::new().unwrap();
        let mut loader = loader_in(&temp.path().join("absent"));
        assert!(ids(&mut loader).is_empty());
    }

    #[test]
    fn test_manifest_loader_instantiates_listed_plugins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("bundle.json"),
            r#"{ "implementations": ["org.example.Zip", "org.example.Png"] }"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("README.txt"), "not a manifest").unwrap();

        let mut loader = loader_in(temp.path());
        assert_eq!(
            ids(&mut loader),
            vec![
                Ok("org.example.Zip".to_string()),
                Ok("org.example.Png".to_string())
            ]
        );
    }

    #[test]
    fn test_manifest_loader_reports_failures_and_continues() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.json"), "{ invalid json }").unwrap();
        std::fs::write(
            temp.path().join("b.json"),
            r#"{ "implementations": ["org.example.Missing", "org.example.Png"] }"#,
        )
        .unwrap();

        let mut loader = loader_in(temp.path());
        let results = ids(&mut loader);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert!(results[1]
            .as_ref()
            .unwrap_err()
            .contains("unknown implementation org.example.Missing"));
        assert_eq!(results[2], Ok("org.example.Png".to_string()));
    }

    #[test]
    fn test_manifest_entry_with_mismatched_id() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("alias.json"),
            r#"{ "implementations": ["org.example.Alias"] }"#,
        )
        .unwrap();

        let mut loader = ManifestLoader::new(temp.path())
            .with_factory("org.example.Alias", || Box::new(ProbePlugin::new("org.example.Png")));

        assert_eq!(ids(&mut loader), vec![Ok("org.example.Png".to_string())]);
    }

    #[test]
    fn test_load_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");
        std::fs::write(&path, r#"{ "implementations": ["x"] }"#).unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.implementations, vec!["x".to_string()]);
        assert!(load_manifest(&temp.path().join("none.json")).is_err());
    }
}

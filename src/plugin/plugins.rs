//! Collection of plugin folders.
//!
//! This module provides the `Plugins` struct which wraps every plugin found
//! in a plugins folder and offers the batch operations the multi-plugin
//! commands need: discovery, manifest access and parallel iteration.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use rayon::prelude::*;

use super::{Manifest, Plugin};

/// A collection of plugins, sorted by folder path.
#[derive(Debug, Default)]
pub struct Plugins(Vec<Plugin>);

impl From<Vec<Plugin>> for Plugins {
    fn from(mut plugins: Vec<Plugin>) -> Self {
        plugins.sort_by(|a, b| a.root_path.cmp(&b.root_path));
        Self(plugins)
    }
}

impl IntoParallelIterator for Plugins {
    type Iter = rayon::vec::IntoIter<Plugin>;
    type Item = Plugin;

    fn into_par_iter(self) -> Self::Iter {
        self.0.into_par_iter()
    }
}

impl<'a> IntoParallelIterator for &'a Plugins {
    type Iter = rayon::slice::Iter<'a, Plugin>;
    type Item = &'a Plugin;

    fn into_par_iter(self) -> Self::Iter {
        self.0.par_iter()
    }
}

impl<'a> IntoIterator for &'a Plugins {
    type Item = &'a Plugin;
    type IntoIter = std::slice::Iter<'a, Plugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Plugins {
    /// Load every immediate subdirectory of `dir` as a plugin.
    ///
    /// Plain files in `dir` are ignored. Every subdirectory must contain a
    /// `package.json`.
    ///
    /// # Errors
    ///
    /// Fails if `dir` cannot be listed or any plugin folder lacks a readable
    /// manifest.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("\"{}\" is not a valid directory", dir.display());
        }

        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

        let mut plugins = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read {}", dir.display()))?
                .path();

            if path.is_dir() {
                plugins.push(Plugin::load(&path)?);
            }
        }

        Ok(plugins.into())
    }

    /// Like [`Self::discover`] but rejects an empty plugins folder.
    ///
    /// # Errors
    ///
    /// Fails on discovery errors or when no plugin folder exists.
    pub fn discover_non_empty(dir: &Path) -> Result<Self> {
        let plugins = Self::discover(dir)?;

        if plugins.is_empty() {
            bail!("plugins folder \"{}\" is empty", dir.display());
        }

        Ok(plugins)
    }

    /// Iterate over the manifests in folder order.
    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.0.iter().map(|p| &p.manifest)
    }

    /// Borrow the plugins as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Plugin] {
        &self.0
    }

    /// Number of plugins in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Print one line per plugin.
    pub fn print_summary(&self) {
        println!(
            "{} {}",
            "📂 Plugins:".bold(),
            self.0.len().to_string().bright_white()
        );

        for plugin in &self.0 {
            println!("  {plugin}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_manifest(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), format!(r#"{{ "name": "{name}" }}"#)).unwrap();
    }

    #[test]
    fn test_discover_sorted_and_ignores_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(&tmp.path().join("zeta"), "zeta");
        write_manifest(&tmp.path().join("alpha"), "alpha");
        fs::write(tmp.path().join("README.md"), "notes").unwrap();

        let plugins = Plugins::discover(tmp.path()).unwrap();
        let names: Vec<_> = plugins.as_slice().iter().map(Plugin::folder_name).collect();

        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(plugins.manifests().count(), 2);
    }

    #[test]
    fn test_discover_requires_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(&tmp.path().join("ok"), "ok");
        fs::create_dir_all(tmp.path().join("broken")).unwrap();

        let err = Plugins::discover(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("package.json required"));
    }

    #[test]
    fn test_discover_non_empty() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(Plugins::discover(tmp.path()).unwrap().is_empty());

        let err = Plugins::discover_non_empty(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_discover_invalid_directory() {
        let err = Plugins::discover(&PathBuf::from("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("is not a valid directory"));
    }
}

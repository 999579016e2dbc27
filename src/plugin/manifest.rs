//! `package.json` parsing.
//!
//! Only the keys the scripts care about are modeled: the three dependency
//! categories, the `scripts` table and the package name. Everything else in
//! the file is ignored.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// File name of the manifest inside every plugin folder.
pub const MANIFEST_FILE: &str = "package.json";

/// Map of package name to version constraint.
pub type DependencyMap = BTreeMap<String, String>;

/// The parts of a `package.json` used by the tooling.
///
/// Categories are `Option` so that "not declared" and "declared but empty"
/// stay distinguishable when merging.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name (`name` key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Runtime dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyMap>,

    /// Build-time dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<DependencyMap>,

    /// Peer dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<DependencyMap>,

    /// Script name to shell command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// Read `package.json` from a folder.
    ///
    /// # Errors
    ///
    /// Fails when the folder has no manifest, or when the file cannot be read
    /// or is not valid JSON of the expected shape.
    pub fn read(folder: &Path) -> Result<Self> {
        let path = manifest_path(folder);

        if !path.is_file() {
            bail!("{MANIFEST_FILE} required in {}", folder.display());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error when the text is malformed.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Look up a script command by name.
    #[must_use]
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts
            .as_ref()
            .and_then(|scripts| scripts.get(name))
            .map(String::as_str)
    }
}

/// Path of the manifest inside `folder`.
#[must_use]
pub fn manifest_path(folder: &Path) -> PathBuf {
    folder.join(MANIFEST_FILE)
}

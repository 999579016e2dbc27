//! A single plugin folder.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use super::Manifest;

/// A plugin folder together with its parsed manifest.
#[derive(Clone, Debug)]
pub struct Plugin {
    /// Folder containing `package.json` and the build output
    pub root_path: PathBuf,

    /// Parsed `package.json`
    pub manifest: Manifest,
}

impl Plugin {
    /// Create a plugin from an already parsed manifest.
    #[must_use]
    pub const fn new(root_path: PathBuf, manifest: Manifest) -> Self {
        Self {
            root_path,
            manifest,
        }
    }

    /// Read the manifest of `root_path` and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates [`Manifest::read`] failures.
    pub fn load(root_path: &Path) -> Result<Self> {
        let manifest = Manifest::read(root_path)?;

        Ok(Self::new(root_path.to_path_buf(), manifest))
    }

    /// Folder name of the plugin.
    ///
    /// This is what the vault's plugin folder and release archives are named
    /// after, so it deliberately ignores the manifest `name`.
    #[must_use]
    pub fn folder_name(&self) -> String {
        folder_name(&self.root_path)
    }

    /// The shell command registered under `script` in the manifest.
    ///
    /// # Errors
    ///
    /// Fails when the manifest declares no such script.
    pub fn script(&self, script: &str) -> Result<&str> {
        self.manifest.script(script).ok_or_else(|| {
            anyhow!(
                "script \"{script}\" is not declared in {}",
                self.root_path.join(super::MANIFEST_FILE).display()
            )
        })
    }
}

/// Name of the folder `path` points to, for labels.
///
/// Paths ending in `.` or `..` are resolved against the filesystem first.
/// Falls back to the whole path when it cannot be resolved or has no name
/// (`/`).
#[must_use]
pub fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            fs::canonicalize(path)
                .ok()?
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| path.display().to_string())
}

/// Name of the folder `path` points to, for files named after it.
///
/// Like [`folder_name`], but a path that needs resolving and cannot be
/// resolved, or that has no name at all, is an error.
///
/// # Errors
///
/// Fails if `path` must be canonicalized and that fails, or if it names the
/// filesystem root.
pub fn resolved_folder_name(path: &Path) -> Result<String> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }

    let resolved =
        fs::canonicalize(path).with_context(|| format!("Failed to resolve {}", path.display()))?;

    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("\"{}\" has no folder name", path.display()))
}

impl Display for Plugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(name) = &self.manifest.name {
            write!(f, "📦 {name} ({})", self.root_path.display())
        } else {
            write!(f, "📦 {}", self.root_path.display())
        }
    }
}

//! Configuration file support for persistent settings.
//!
//! This module provides support for loading configuration from a TOML file
//! located at `~/.config/obsidian-dev/config.toml` (or the platform-specific
//! equivalent). Configuration file values serve as defaults that can be
//! overridden by CLI arguments.
//!
//! # Layering
//!
//! The precedence order is: **CLI argument > config file > hardcoded default**.
//!
//! # Example config
//!
//! ```toml
//! plugins = "~/dev/Plugins"
//! root = "~/dev"
//! vault = "~/Notes"
//!
//! [commands]
//! install = "npm install"
//! build = "npm run build"
//! dev_script = "dev"
//!
//! [watch]
//! install = "npm install --force"
//! prefer = "highest"
//! confirm_abort = true
//! quiet = true
//!
//! [clean]
//! use_trash = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::merger::TieBreak;

/// Top-level configuration file structure.
///
/// All fields are `Option<T>` so we can detect which values are present in the
/// config file and apply layered configuration (CLI > config file > defaults).
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default folder holding the plugin folders (`--path`)
    pub plugins: Option<PathBuf>,

    /// Default shared install root (`--root`)
    pub root: Option<PathBuf>,

    /// Default vault (`--vault`)
    pub vault: Option<PathBuf>,

    /// External commands
    #[serde(default)]
    pub commands: FileCommandConfig,

    /// Watch options
    #[serde(default)]
    pub watch: FileWatchConfig,

    /// Cleanup options
    #[serde(default)]
    pub clean: FileCleanConfig,
}

/// External command options from the configuration file.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileCommandConfig {
    /// Install command for `build` and `deploy`
    pub install: Option<String>,

    /// Build command
    pub build: Option<String>,

    /// Manifest script started by the watch commands
    pub dev_script: Option<String>,
}

/// Watch options from the configuration file.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileWatchConfig {
    /// Install command for the watch commands
    pub install: Option<String>,

    /// Version tie-break for merged manifests (`"highest"` or `"lowest"`)
    pub prefer: Option<TieBreak>,

    /// Whether Ctrl+C asks for confirmation
    pub confirm_abort: Option<bool>,

    /// Whether install and dev process output is discarded
    pub quiet: Option<bool>,
}

/// Cleanup options from the configuration file.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileCleanConfig {
    /// Whether `node_modules/` goes to the system trash
    pub use_trash: Option<bool>,
}

/// Expand a leading `~` in a path to the user's home directory.
///
/// Paths that don't start with `~` are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

impl FileConfig {
    /// Returns the path where the configuration file is expected.
    ///
    /// The configuration file is located at `<config_dir>/obsidian-dev/config.toml`,
    /// where `<config_dir>` is the platform-specific configuration directory
    /// (e.g., `~/.config` on Linux, `%APPDATA%` on Windows).
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("obsidian-dev").join("config.toml"))
    }

    /// Load configuration from the default config file location.
    ///
    /// If the config file doesn't exist, returns a default (empty) configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but cannot be read
    /// - The config file exists but contains invalid TOML or unexpected fields
    pub fn load() -> anyhow::Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };

        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file at {}: {e}", path.display())
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file at {}: {e}", path.display())
        })?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_config() {
        let config = FileConfig::default();

        assert!(config.plugins.is_none());
        assert!(config.root.is_none());
        assert!(config.vault.is_none());
        assert!(config.commands.install.is_none());
        assert!(config.commands.build.is_none());
        assert!(config.commands.dev_script.is_none());
        assert!(config.watch.install.is_none());
        assert!(config.watch.prefer.is_none());
        assert!(config.watch.confirm_abort.is_none());
        assert!(config.watch.quiet.is_none());
        assert!(config.clean.use_trash.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
plugins = "~/dev/Plugins"
root = "~/dev"
vault = "/notes"

[commands]
install = "pnpm install"
build = "pnpm build"
dev_script = "watch"

[watch]
install = "pnpm install --force"
prefer = "lowest"
confirm_abort = false
quiet = false

[clean]
use_trash = true
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.plugins, Some(PathBuf::from("~/dev/Plugins")));
        assert_eq!(config.root, Some(PathBuf::from("~/dev")));
        assert_eq!(config.vault, Some(PathBuf::from("/notes")));
        assert_eq!(config.commands.install.as_deref(), Some("pnpm install"));
        assert_eq!(config.commands.build.as_deref(), Some("pnpm build"));
        assert_eq!(config.commands.dev_script.as_deref(), Some("watch"));
        assert_eq!(
            config.watch.install.as_deref(),
            Some("pnpm install --force")
        );
        assert_eq!(config.watch.prefer, Some(TieBreak::Lowest));
        assert_eq!(config.watch.confirm_abort, Some(false));
        assert_eq!(config.watch.quiet, Some(false));
        assert_eq!(config.clean.use_trash, Some(true));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[watch]
prefer = "highest"
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();

        assert!(config.plugins.is_none());
        assert_eq!(config.watch.prefer, Some(TieBreak::Highest));
        assert!(config.watch.install.is_none());
        assert!(config.commands.build.is_none());
    }

    #[test]
    fn test_parse_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();

        assert!(config.plugins.is_none());
        assert!(config.vault.is_none());
    }

    #[test]
    fn test_malformed_config_errors() {
        assert!(toml::from_str::<FileConfig>("[watch]\nprefer = \"newest\"\n").is_err());
        assert!(toml::from_str::<FileConfig>("[clean]\nuse_trash = \"yes\"\n").is_err());
        assert!(toml::from_str::<FileConfig>("unknown_key = 1\n").is_err());
    }

    #[test]
    fn test_config_path_returns_expected_suffix() {
        if let Some(p) = FileConfig::config_path() {
            assert!(p.ends_with("obsidian-dev/config.toml"));
        }
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FileConfig::load_from(&tmp.path().join("config.toml")).unwrap();

        assert!(config.plugins.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "vault = \"/notes\"\n").unwrap();

        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.vault, Some(PathBuf::from("/notes")));

        std::fs::write(&path, "vault = [").unwrap();
        let err = FileConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let expanded = expand_tilde(&PathBuf::from("~/Plugins"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("Plugins"));
        }
    }

    #[test]
    fn test_expand_tilde_absolute_path_unchanged() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_tilde(&path), path);
    }

    #[test]
    fn test_expand_tilde_relative_path_unchanged() {
        let path = PathBuf::from("relative/path");
        assert_eq!(expand_tilde(&path), path);
    }
}

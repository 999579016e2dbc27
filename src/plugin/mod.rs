//! Plugin folder discovery and manifest reading.
//!
//! ## Main Parts
//!
//! - [`Manifest`] - The parsed `package.json` of a plugin
//! - [`Plugin`] - A plugin folder and its manifest
//! - [`Plugins`] - Every plugin in a plugins folder

pub mod manifest;
#[allow(clippy::module_inception)]
pub mod plugin;
pub mod plugins;

pub use manifest::{DependencyMap, MANIFEST_FILE, Manifest, manifest_path};
pub use plugin::{Plugin, folder_name, resolved_folder_name};
pub use plugins::Plugins;

//! Generated file cleanup.
//!
//! This module removes the files a plugin build or install leaves behind:
//! compiled output, cached data, lockfiles, release archives and the
//! `node_modules/` directory. Every operation is idempotent; missing targets
//! are simply skipped.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use colored::Colorize;
use humansize::{DECIMAL, format_size};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::CleanOptions;
use crate::plugin::{MANIFEST_FILE, Plugins, resolved_folder_name};

/// Generated files removed from a plugin folder.
pub const FILES_TO_DELETE: [&str; 5] = [
    "main.js",
    "styles.css",
    "data.json",
    "package-lock.json",
    "build.zip",
];

/// Dependency directory removed from plugin and root folders.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Files written into the shared install root by the multi-plugin watch.
pub const ROOT_FILES_TO_DELETE: [&str; 2] = [MANIFEST_FILE, "package-lock.json"];

/// What a cleanup removed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CleanReport {
    /// Removed files and directories
    pub removed: Vec<PathBuf>,

    /// Bytes freed
    pub freed: u64,
}

impl CleanReport {
    fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.freed += other.freed;
    }
}

/// Result of cleaning a whole plugins folder.
#[derive(Debug, Default, Serialize)]
pub struct CleanAllReport {
    /// Combined report of everything that was removed
    pub report: CleanReport,

    /// Per-plugin failures, formatted for display
    pub errors: Vec<String>,
}

/// Remove generated files from one plugin folder.
///
/// Deletes [`FILES_TO_DELETE`], the `<folder>.zip` release archive and the
/// dependency directory when present.
///
/// # Arguments
///
/// * `plugin_dir` - The plugin folder to clean, possibly given as `.`
/// * `options` - Whether `node_modules/` goes to the trash
///
/// # Returns
///
/// - `Ok(CleanReport)` - Removed paths and bytes freed, empty when there was
///   nothing to remove
/// - `Err(anyhow::Error)` - If an existing target could not be removed
///
/// # Errors
///
/// Fails if an existing target cannot be removed.
pub fn clean(plugin_dir: &Path, options: &CleanOptions) -> Result<CleanReport> {
    let archive = format!("{}.zip", resolved_folder_name(plugin_dir)?);

    let files = FILES_TO_DELETE
        .iter()
        .copied()
        .chain(std::iter::once(archive.as_str()));

    remove_targets(plugin_dir, files, options)
}

/// Remove the shared install artifacts from the root folder.
///
/// # Errors
///
/// Fails if an existing target cannot be removed.
pub fn clean_root(root: &Path, options: &CleanOptions) -> Result<CleanReport> {
    remove_targets(root, ROOT_FILES_TO_DELETE.iter().copied(), options)
}

/// Clean every plugin in parallel, then the root folder.
///
/// Failures of individual plugins are collected instead of aborting the
/// other cleanups.
///
/// # Arguments
///
/// * `plugins` - The plugins to clean
/// * `root` - The shared install root, cleaned with [`clean_root`]
/// * `options` - Whether `node_modules/` goes to the trash
///
/// # Returns
///
/// The combined report, with removed paths sorted, and one message per
/// folder that could not be cleaned.
pub fn clean_all(plugins: &Plugins, root: &Path, options: &CleanOptions) -> CleanAllReport {
    let combined = Arc::new(Mutex::new(CleanReport::default()));
    let errors = Arc::new(Mutex::new(Vec::new()));

    plugins.into_par_iter().for_each(|plugin| {
        match clean(&plugin.root_path, options) {
            Ok(report) => lock(&combined).merge(report),
            Err(e) => lock(&errors).push(format!(
                "Failed to clean {}: {e:#}",
                plugin.root_path.display()
            )),
        }
    });

    match clean_root(root, options) {
        Ok(report) => lock(&combined).merge(report),
        Err(e) => lock(&errors).push(format!("Failed to clean {}: {e:#}", root.display())),
    }

    let mut report = std::mem::take(&mut *lock(&combined));
    report.removed.sort();

    CleanAllReport {
        report,
        errors: std::mem::take(&mut *lock(&errors)),
    }
}

/// Print the outcome of a cleanup.
pub fn print_summary(report: &CleanReport, errors: &[String]) {
    if !errors.is_empty() {
        println!("\n{}", "⚠️  Some errors occurred during cleanup:".yellow());
        for error in errors {
            eprintln!("  {}", error.red());
        }
    }

    if report.removed.is_empty() && errors.is_empty() {
        println!("{}", "✨ Nothing to clean!".green());
        return;
    }

    println!("\n{}", "📊 Cleanup Summary:".bold());
    println!(
        "  ✅ Removed: {} items",
        report.removed.len().to_string().green()
    );
    println!(
        "  💾 Total space freed: {}",
        format_size(report.freed, DECIMAL).bright_green().bold()
    );
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn remove_targets<'a>(
    dir: &Path,
    files: impl Iterator<Item = &'a str>,
    options: &CleanOptions,
) -> Result<CleanReport> {
    let mut report = CleanReport::default();

    for file in files {
        let path = dir.join(file);

        if path.is_file() {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;

            report.freed += size;
            report.removed.push(path);
        }
    }

    let dependencies = dir.join(DEPENDENCY_DIR);
    if dependencies.is_dir() {
        let size = calculate_directory_size(&dependencies);
        remove_dir(&dependencies, options.use_trash)?;

        report.freed += size;
        report.removed.push(dependencies);
    }

    Ok(report)
}

fn remove_dir(path: &Path, use_trash: bool) -> Result<()> {
    if use_trash {
        trash::delete(path)
            .with_context(|| format!("Failed to move {} to the trash", path.display()))
    } else {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))
    }
}

/// Total size of all files below `path`, skipping unreadable entries.
fn calculate_directory_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

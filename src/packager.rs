//! Release builds.
//!
//! [`build`] installs and builds a plugin, then zips its release files into
//! `<plugin>/<plugin>.zip`. [`deploy`] runs the same build and copies the
//! release files into a folder named after the plugin instead.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::config::CommandOptions;
use crate::plugin::resolved_folder_name;
use crate::process::run_command;

/// Files that make up a plugin release.
pub const RELEASE_FILES: [&str; 3] = ["main.js", "styles.css", "manifest.json"];

/// Outcome of packaging a plugin.
#[derive(Debug, Serialize)]
pub struct Package {
    /// The archive, or `None` when there was nothing to pack
    pub archive: Option<PathBuf>,

    /// File names added to the archive
    pub files: Vec<String>,
}

/// Install dependencies and build the plugin in `project_dir`.
///
/// # Arguments
///
/// * `project_dir` - The plugin folder the commands run in
/// * `commands` - Install and build commands, and whether their output is shown
///
/// # Errors
///
/// Fails if `project_dir` is not a directory or either command exits
/// unsuccessfully.
pub fn run_build(project_dir: &Path, commands: &CommandOptions) -> Result<()> {
    if !project_dir.is_dir() {
        bail!("\"{}\" is not a valid directory", project_dir.display());
    }

    run_command(&commands.install, project_dir, commands.quiet)?;
    run_command(&commands.build, project_dir, commands.quiet)
}

/// Build the plugin and pack its release files.
///
/// # Arguments
///
/// * `project_dir` - The plugin folder to build
/// * `commands` - Install and build commands
///
/// # Returns
///
/// - `Ok(Package)` - The archive and the files it holds, or no archive when
///   the build produced none of [`RELEASE_FILES`]
/// - `Err(anyhow::Error)` - If a command failed or the archive could not be
///   written
///
/// # Errors
///
/// Fails if the build fails or the archive cannot be written.
pub fn build(project_dir: &Path, commands: &CommandOptions) -> Result<Package> {
    run_build(project_dir, commands)?;
    package_outputs(project_dir)
}

/// Zip the existing release files of `project_dir`.
///
/// The archive is named after the folder and holds the files at its root.
/// When none of the release files exist no archive is written.
///
/// # Errors
///
/// Fails if a release file cannot be read or the archive cannot be written.
pub fn package_outputs(project_dir: &Path) -> Result<Package> {
    let files: Vec<String> = existing_release_files(project_dir)
        .map(ToString::to_string)
        .collect();

    if files.is_empty() {
        return Ok(Package {
            archive: None,
            files,
        });
    }

    let archive = archive_path(project_dir)?;
    let out = File::create(&archive)
        .with_context(|| format!("Failed to create {}", archive.display()))?;

    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in &files {
        let path = project_dir.join(file);
        let mut input =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;

        zip.start_file(file.as_str(), options)?;
        io::copy(&mut input, &mut zip)
            .with_context(|| format!("Failed to add {} to the archive", path.display()))?;
    }

    zip.finish()
        .with_context(|| format!("Failed to write {}", archive.display()))?;

    Ok(Package {
        archive: Some(archive),
        files,
    })
}

/// Where [`package_outputs`] writes the archive.
///
/// # Arguments
///
/// * `project_dir` - The plugin folder, possibly given as `.` or `..`
///
/// # Returns
///
/// - `Ok(PathBuf)` - `<project_dir>/<folder name>.zip`
/// - `Err(anyhow::Error)` - If the folder name cannot be resolved
///
/// # Errors
///
/// Fails if `project_dir` ends in `.` or `..` and cannot be resolved.
pub fn archive_path(project_dir: &Path) -> Result<PathBuf> {
    Ok(project_dir.join(format!("{}.zip", resolved_folder_name(project_dir)?)))
}

/// Build the plugin and copy its release files to `dest_root/<plugin>/`.
///
/// # Arguments
///
/// * `project_dir` - The plugin folder to build
/// * `dest_root` - Existing folder receiving the `<plugin>` folder
/// * `commands` - Install and build commands
///
/// # Returns
///
/// - `Ok(Vec<PathBuf>)` - Destination paths of the copied files
/// - `Err(anyhow::Error)` - If the build or a copy failed
///
/// # Errors
///
/// Fails if `dest_root` is not a directory, the build fails or a copy fails.
pub fn deploy(
    project_dir: &Path,
    dest_root: &Path,
    commands: &CommandOptions,
) -> Result<Vec<PathBuf>> {
    if !dest_root.is_dir() {
        bail!("\"{}\" is not a valid directory", dest_root.display());
    }

    run_build(project_dir, commands)?;
    let name = resolved_folder_name(project_dir)?;
    copy_release_files(project_dir, &dest_root.join(name))
}

/// Copy the existing release files of `project_dir` into `target`.
///
/// # Errors
///
/// Fails if `target` cannot be created or a copy fails.
pub fn copy_release_files(project_dir: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    existing_release_files(project_dir)
        .map(|file| {
            let src = project_dir.join(file);
            let dest = target.join(file);

            fs::copy(&src, &dest).with_context(|| {
                format!("Failed to copy {} to {}", src.display(), dest.display())
            })?;

            Ok(dest)
        })
        .collect()
}

fn existing_release_files(project_dir: &Path) -> impl Iterator<Item = &'static str> + '_ {
    RELEASE_FILES
        .into_iter()
        .filter(move |file| project_dir.join(file).is_file())
}

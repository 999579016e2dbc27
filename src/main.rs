//! # obsidian-dev
//!
//! Developer scripts for a folder of Obsidian plugin projects.
//!
//! ## Features
//!
//! - Watch one plugin, or every plugin of a folder, and mirror the build output
//!   into a vault while the dev build runs
//! - Install the merged dependencies of all plugins once into a shared root
//! - Build a plugin and zip its release files
//! - Clean build output, lockfiles, archives and `node_modules/`
//! - Persistent configuration via `~/.config/obsidian-dev/config.toml`
//!
//! ## Usage
//!
//! ```bash
//! # Watch every plugin in ./Plugins into a vault
//! obsidian-dev watch-all --vault ~/Notes
//!
//! # Build and zip a single plugin
//! obsidian-dev build Plugins/obsidian-canvas-util
//!
//! # Clean everything
//! obsidian-dev clean-all
//! ```

mod cli;

use std::path::Path;

use anyhow::{Ok, Result, bail};
use clap::Parser;
use cli::{Cli, Command, vault_dir};
use colored::Colorize;
use obsidian_dev::{
    cleaner,
    config::FileConfig,
    merger::{self, TieBreak},
    messages::Message,
    orchestrator::Orchestrator,
    output::{BuildOutput, CleanOutput, DeployOutput},
    packager,
    plugin::{Plugins, folder_name},
};
use std::process::exit;

/// Entry point for the obsidian-dev application.
///
/// This function handles all errors gracefully by calling [`inner_main`] and printing
/// any errors to stderr before exiting with a non-zero status code.
fn main() {
    if let Err(err) = inner_main() {
        eprintln!("{} {err:#}", "Error:".red());

        exit(1);
    }
}

/// Main application logic that can return errors.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Loads the persistent configuration file (if present)
/// 3. Runs the selected subcommand
/// 4. If `--json` is active, emits JSON instead of human-readable output
///
/// # Errors
///
/// Precondition failures (invalid paths, missing manifests, empty plugin
/// folders) and failing external commands are returned as errors.
fn inner_main() -> Result<()> {
    let args = Cli::parse();
    let json_mode = args.json;

    let file_config = FileConfig::load().unwrap_or_else(|e| {
        if !json_mode {
            eprintln!("{} {e}", "Warning: Failed to load config file:".yellow());
        }
        FileConfig::default()
    });

    match args.command {
        Command::Watch {
            source,
            dest,
            watch,
        } => {
            let options = watch.watch_options(&file_config, TieBreak::default(), json_mode);
            let orchestrator = Orchestrator::single(&source, &dest, options)?;
            run_watch(orchestrator, json_mode)
        }
        Command::WatchAll {
            vault,
            folders,
            merge,
            watch,
        } => {
            let vault = vault_dir(vault.as_ref(), &file_config)?;
            let prefer = merge.tie_break(&file_config);
            let options = watch.watch_options(&file_config, prefer, json_mode);
            let orchestrator = Orchestrator::multi(
                &folders.plugins_dir(&file_config),
                &vault,
                &folders.root_dir(&file_config),
                options,
            )?;

            if !json_mode {
                println!(
                    "{} {}",
                    "📂 Plugins:".bold(),
                    orchestrator.plugins().len().to_string().bright_white()
                );
                for watch in orchestrator.plugins() {
                    println!("  {}", watch.plugin());
                }
            }

            run_watch(orchestrator, json_mode)
        }
        Command::Build { dir, commands } => {
            let package = packager::build(&dir, &commands.command_options(&file_config))?;

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&BuildOutput::from(package))?);
            } else if let Some(archive) = &package.archive {
                for file in &package.files {
                    println!("Added {file} to {}", folder_name(archive));
                }
                println!("{}", "✅ Zipping complete.".green());
            } else {
                println!("{}", "✨ No release files to zip".yellow());
            }

            Ok(())
        }
        Command::Deploy {
            source,
            dest,
            commands,
        } => {
            let copied = packager::deploy(&source, &dest, &commands.command_options(&file_config))?;

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&DeployOutput { copied })?);
            } else {
                let name = folder_name(&source);
                for path in &copied {
                    println!("Copied {} to {name}", folder_name(path));
                }
                println!("{}", "✅ Files deployed successfully".green());
            }

            Ok(())
        }
        Command::Clean { dir, clean } => {
            require_dir(&dir)?;
            let report = cleaner::clean(&dir, &clean.clean_options(&file_config))?;

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&CleanOutput::from(report))?);
            } else {
                cleaner::print_summary(&report, &[]);
            }

            Ok(())
        }
        Command::CleanAll { folders, clean } => {
            let plugins_dir = folders.plugins_dir(&file_config);
            let root = folders.root_dir(&file_config);
            require_dir(&plugins_dir)?;
            require_dir(&root)?;

            let plugins = Plugins::discover(&plugins_dir)?;
            if !json_mode {
                plugins.print_summary();
                println!("\n{}", "🧹 Starting cleanup...".cyan());
            }

            let result = cleaner::clean_all(&plugins, &root, &clean.clean_options(&file_config));
            let failed = !result.errors.is_empty();

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&CleanOutput::from(result))?);
            } else {
                cleaner::print_summary(&result.report, &result.errors);
            }

            if failed {
                bail!("some folders could not be cleaned");
            }

            Ok(())
        }
        Command::Merge {
            path,
            output,
            merge,
        } => {
            let plugins_dir = cli::plugins_dir(path.as_ref(), &file_config);
            let plugins = Plugins::discover_non_empty(&plugins_dir)?;
            let merged = merger::merge(plugins.manifests(), merge.tie_break(&file_config));

            match output {
                Some(file) => {
                    std::fs::write(&file, merged.to_json()?)?;
                    if !json_mode {
                        println!(
                            "{} {}",
                            "✅ Merged manifest written to".green(),
                            file.display()
                        );
                    }
                }
                None => println!("{}", merged.to_json()?),
            }

            Ok(())
        }
    }
}

/// Install, start and watch until Ctrl+C.
fn run_watch(mut orchestrator: Orchestrator, json_mode: bool) -> Result<()> {
    let (tx, interrupts) = crossbeam_channel::unbounded();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    orchestrator.watch(&interrupts, |message: &Message| {
        if json_mode {
            println!("{}", message.to_json());
        } else {
            println!("{}", message.render());
        }
    })
}

fn require_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("\"{}\" is not a valid directory", path.display());
    }
    Ok(())
}

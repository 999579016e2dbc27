use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use obsidian_dev::{
    config::{
        AbortPolicy, CleanOptions, CommandOptions, FileConfig, WatchOptions, file::expand_tilde,
    },
    merger::TieBreak,
};

/// Plugins folder used when neither `--path` nor the config file name one.
const DEFAULT_PLUGINS_DIR: &str = "./Plugins";

/// Shared install root used when neither `--root` nor the config file name one.
const DEFAULT_ROOT_DIR: &str = ".";

#[derive(Args)]
pub(crate) struct FolderArgs {
    /// Path to the folder with Obsidian plugins [default: ./Plugins]
    #[arg(long)]
    path: Option<PathBuf>,

    /// Path to the root folder where node_modules will be installed [default: .]
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Stop on the first Ctrl+C instead of asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Show the output of the install and dev commands
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Args)]
pub(crate) struct MergeArgs {
    /// Which version to keep when plugins pin different versions
    #[arg(long, value_enum)]
    prefer: Option<TieBreak>,
}

#[derive(Args)]
pub(crate) struct CommandArgs {
    /// Command that installs dependencies [default: npm install]
    #[arg(long)]
    install: Option<String>,

    /// Command that builds the plugin [default: npm run build]
    #[arg(long)]
    build: Option<String>,

    /// Hide the output of the install and build commands
    #[arg(short = 'q', long)]
    quiet: bool,
}

#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Move node_modules to the system trash instead of deleting it
    #[arg(long)]
    trash: bool,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Install, start the dev build and mirror one plugin's output into a folder
    Watch {
        /// Plugin folder
        source: PathBuf,

        /// Folder receiving main.js, styles.css, data.json and manifest.json
        dest: PathBuf,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Install shared dependencies and mirror every plugin into a vault
    WatchAll {
        /// Path to the Obsidian vault
        #[arg(long)]
        vault: Option<PathBuf>,

        #[command(flatten)]
        folders: FolderArgs,

        #[command(flatten)]
        merge: MergeArgs,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Build a plugin and zip its release files
    Build {
        /// Plugin folder
        dir: PathBuf,

        #[command(flatten)]
        commands: CommandArgs,
    },

    /// Build a plugin and copy its release files to DEST/<plugin>
    Deploy {
        /// Plugin folder
        source: PathBuf,

        /// Folder receiving the plugin folder
        dest: PathBuf,

        #[command(flatten)]
        commands: CommandArgs,
    },

    /// Delete build output, lockfiles, archives and node_modules of a plugin
    Clean {
        /// Plugin folder
        dir: PathBuf,

        #[command(flatten)]
        clean: CleanArgs,
    },

    /// Clean every plugin and the shared install root
    CleanAll {
        #[command(flatten)]
        folders: FolderArgs,

        #[command(flatten)]
        clean: CleanArgs,
    },

    /// Print or write the merged package.json of all plugins
    Merge {
        /// Path to the folder with Obsidian plugins [default: ./Plugins]
        #[arg(long)]
        path: Option<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        merge: MergeArgs,
    },
}

#[derive(Parser)]
#[command(name = "obsidian-dev", version)]
#[command(about = "Install, build, package, clean and live-sync Obsidian plugin folders")]
pub(crate) struct Cli {
    /// Output results as JSON instead of human-readable text
    #[arg(long, global = true)]
    pub(crate) json: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Resolve a path from CLI, then config file, then default.
fn layered_path(cli: Option<&PathBuf>, file: Option<&PathBuf>, default: &str) -> PathBuf {
    cli.cloned()
        .or_else(|| file.map(|p| expand_tilde(p)))
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Resolve the plugins folder from CLI, then config file, then default.
pub(crate) fn plugins_dir(cli: Option<&PathBuf>, config: &FileConfig) -> PathBuf {
    layered_path(cli, config.plugins.as_ref(), DEFAULT_PLUGINS_DIR)
}

impl FolderArgs {
    pub(crate) fn plugins_dir(&self, config: &FileConfig) -> PathBuf {
        plugins_dir(self.path.as_ref(), config)
    }

    pub(crate) fn root_dir(&self, config: &FileConfig) -> PathBuf {
        layered_path(self.root.as_ref(), config.root.as_ref(), DEFAULT_ROOT_DIR)
    }
}

impl MergeArgs {
    pub(crate) fn tie_break(&self, config: &FileConfig) -> TieBreak {
        self.prefer.or(config.watch.prefer).unwrap_or_default()
    }
}

impl CommandArgs {
    pub(crate) fn command_options(&self, config: &FileConfig) -> CommandOptions {
        let defaults = CommandOptions::default();

        CommandOptions {
            install: self
                .install
                .clone()
                .or_else(|| config.commands.install.clone())
                .unwrap_or(defaults.install),
            build: self
                .build
                .clone()
                .or_else(|| config.commands.build.clone())
                .unwrap_or(defaults.build),
            dev_script: config
                .commands
                .dev_script
                .clone()
                .unwrap_or(defaults.dev_script),
            quiet: self.quiet,
        }
    }
}

impl CleanArgs {
    pub(crate) fn clean_options(&self, config: &FileConfig) -> CleanOptions {
        CleanOptions {
            use_trash: self.trash || config.clean.use_trash.unwrap_or(false),
        }
    }
}

impl WatchArgs {
    pub(crate) fn watch_options(
        &self,
        config: &FileConfig,
        prefer: TieBreak,
        json: bool,
    ) -> WatchOptions {
        let defaults = WatchOptions::default();
        let confirm = !self.yes && config.watch.confirm_abort.unwrap_or(true);

        WatchOptions {
            commands: CommandOptions {
                install: config
                    .watch
                    .install
                    .clone()
                    .unwrap_or(defaults.commands.install),
                dev_script: config
                    .commands
                    .dev_script
                    .clone()
                    .unwrap_or(defaults.commands.dev_script),
                quiet: !self.verbose && config.watch.quiet.unwrap_or(true),
                ..defaults.commands
            },
            prefer,
            abort: if confirm {
                AbortPolicy::Confirm
            } else {
                AbortPolicy::Immediate
            },
            json,
        }
    }
}

/// Resolve the vault from CLI or config file.
pub(crate) fn vault_dir(cli: Option<&PathBuf>, config: &FileConfig) -> Result<PathBuf> {
    match cli.cloned().or_else(|| config.vault.as_deref().map(expand_tilde)) {
        Some(vault) => Ok(vault),
        None => bail!("--vault is required (or set `vault` in the config file)"),
    }
}

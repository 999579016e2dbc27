//! External command configuration.
//!
//! This module defines the shell commands used to install dependencies and
//! build a plugin, and the manifest script started by the watch commands.

/// Default dependency install command for one-shot builds.
pub const DEFAULT_INSTALL: &str = "npm install";

/// Default build command.
pub const DEFAULT_BUILD: &str = "npm run build";

/// Default manifest script launched in the background while watching.
pub const DEFAULT_DEV_SCRIPT: &str = "dev";

/// Commands run against a plugin folder.
#[derive(Clone, Debug)]
pub struct CommandOptions {
    /// Shell command that installs dependencies
    pub install: String,

    /// Shell command that produces the build output
    pub build: String,

    /// Name of the manifest script started in the background by watches
    pub dev_script: String,

    /// Whether to discard the output of external commands
    pub quiet: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            install: DEFAULT_INSTALL.to_string(),
            build: DEFAULT_BUILD.to_string(),
            dev_script: DEFAULT_DEV_SCRIPT.to_string(),
            quiet: false,
        }
    }
}

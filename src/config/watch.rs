//! Watch configuration.
//!
//! This module defines the options shared by the single and multi-plugin
//! watch commands.

use crate::merger::TieBreak;

use super::CommandOptions;

/// Default install command for watch sessions.
///
/// Merged manifests of several plugins often disagree on peer dependencies,
/// which plain `npm install` refuses.
pub const DEFAULT_WATCH_INSTALL: &str = "npm install --force";

/// What an interrupt (Ctrl+C) does while watching.
///
/// Both watch commands use the same policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum AbortPolicy {
    /// Ask for confirmation and keep watching on "no"
    #[default]
    Confirm,

    /// Stop at the first interrupt
    Immediate,
}

/// Options for a watch run.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    /// Install and dev commands; `commands.install` is the watch install command
    pub commands: CommandOptions,

    /// Version tie-break for merged manifests
    pub prefer: TieBreak,

    /// Interrupt handling
    pub abort: AbortPolicy,

    /// Emit watch messages as JSON lines
    pub json: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            commands: CommandOptions {
                install: DEFAULT_WATCH_INSTALL.to_string(),
                quiet: true,
                ..CommandOptions::default()
            },
            prefer: TieBreak::default(),
            abort: AbortPolicy::default(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_options_default() {
        let options = WatchOptions::default();

        assert_eq!(options.commands.install, "npm install --force");
        assert!(options.commands.quiet);
        assert_eq!(options.prefer, TieBreak::Highest);
        assert_eq!(options.abort, AbortPolicy::Confirm);
        assert!(!options.json);
    }
}

//! Configuration types and options for the application.
//!
//! This module contains all configuration structures used throughout the application,
//! including the persistent config file and the resolved options for external
//! commands, watching and cleanup.

pub mod clean;
pub mod commands;
pub mod file;
pub mod watch;

pub use clean::CleanOptions;
pub use commands::CommandOptions;
pub use file::FileConfig;
pub use watch::{AbortPolicy, WatchOptions};

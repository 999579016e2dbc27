//! # obsidian-dev
//!
//! Developer tooling for a folder of Obsidian plugin projects: live-sync of
//! build output into a vault, dependency merging, packaging and cleanup.
//!
//! This library provides the core functionality for the obsidian-dev CLI tool.
//! The binary only parses arguments, layers configuration and prints results.

pub mod cleaner;
pub mod config;
pub mod merger;
pub mod messages;
pub mod orchestrator;
pub mod output;
pub mod packager;
pub mod plugin;
pub mod process;
pub mod sync;

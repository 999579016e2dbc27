//! Watch entrypoints.
//!
//! An [`Orchestrator`] drives one or more plugins through
//! `Idle -> Installing -> BuildRunning -> Watching -> Stopped | Aborted`:
//!
//! 1. install dependencies (per plugin, or once into a shared root for the
//!    multi-plugin variant, from the merged manifests)
//! 2. start each plugin's dev script in the background
//! 3. start a [`WatchSession`] per plugin feeding a [`MessageQueue`]
//! 4. print queued messages until interrupted
//!
//! Both variants handle interrupts with the same [`AbortPolicy`].

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Result, bail};
use crossbeam_channel::{Receiver, select};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;

use crate::config::{AbortPolicy, CommandOptions, WatchOptions};
use crate::merger::{self, DependencySet};
use crate::messages::{Message, MessageQueue};
use crate::plugin::{Plugin, Plugins};
use crate::process::{BackgroundTask, run_command};
use crate::sync::WatchSession;

/// Vault subfolder holding installed plugins.
pub const VAULT_PLUGINS_DIR: &str = ".obsidian/plugins";

/// Lifecycle of a watched plugin.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PluginState {
    /// Nothing started yet
    Idle,
    /// Dependencies are being installed
    Installing,
    /// The dev script runs in the background
    BuildRunning,
    /// Build output is mirrored into the destination
    Watching,
    /// Watch released by the program
    Stopped,
    /// Watch released after a user interrupt
    Aborted,
}

impl Display for PluginState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Idle => "idle",
            Self::Installing => "installing",
            Self::BuildRunning => "build running",
            Self::Watching => "watching",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// One plugin under orchestration.
pub struct PluginWatch {
    plugin: Plugin,
    destination: PathBuf,
    state: PluginState,
    dev_task: Option<BackgroundTask>,
    session: Option<WatchSession>,
}

impl PluginWatch {
    /// Track `plugin`, mirroring its output into `destination`.
    #[must_use]
    pub const fn new(plugin: Plugin, destination: PathBuf) -> Self {
        Self {
            plugin,
            destination,
            state: PluginState::Idle,
            dev_task: None,
            session: None,
        }
    }

    /// The plugin being watched.
    #[must_use]
    pub const fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    /// Folder receiving the build output.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PluginState {
        self.state
    }

    /// Handle of the background dev process, once started.
    pub const fn dev_task_mut(&mut self) -> Option<&mut BackgroundTask> {
        self.dev_task.as_mut()
    }

    fn start_dev(&mut self, commands: &CommandOptions) -> Result<()> {
        let command = self.plugin.script(&commands.dev_script)?.to_string();
        self.dev_task = Some(BackgroundTask::spawn(
            &command,
            &self.plugin.root_path,
            commands.quiet,
        )?);
        self.state = PluginState::BuildRunning;

        Ok(())
    }

    fn start_watch(&mut self, queue: &MessageQueue) -> Result<()> {
        let copied = queue.sender();
        let modified = queue.sender();
        let label = crate::plugin::folder_name(&self.destination);

        let session = WatchSession::start(
            &self.plugin.root_path,
            &self.destination,
            |event| copied.push(Message::synced(event)),
            move |outcome| match outcome {
                Ok(event) => modified.push(Message::synced(&event)),
                Err(e) => modified.push(Message::sync_failed(label.as_str(), &e)),
            },
        )?;

        self.session = Some(session);
        self.state = PluginState::Watching;

        Ok(())
    }

    fn stop(&mut self, final_state: PluginState, out: &mut impl FnMut(&Message)) {
        if let Some(session) = self.session.take()
            && let Err(e) = session.stop()
        {
            out(&Message::sync_failed(self.plugin.folder_name(), &e));
        }

        if let Some(task) = self.dev_task.as_mut() {
            let text = match task.try_status() {
                Ok(None) => format!(
                    "dev process of {} still running (pid {})",
                    self.plugin.folder_name(),
                    task.id()
                ),
                Ok(Some(status)) => {
                    format!("dev process of {} exited ({status})", self.plugin.folder_name())
                }
                Err(e) => format!(
                    "dev process of {} could not be queried: {e}",
                    self.plugin.folder_name()
                ),
            };
            out(&Message::status(text));
        }

        self.state = final_state;
    }
}

/// Sequencer for the watch commands.
pub struct Orchestrator {
    plugins: Vec<PluginWatch>,
    install_dir: PathBuf,
    merged: Option<DependencySet>,
    options: WatchOptions,
    queue: MessageQueue,
    confirm: Box<dyn FnMut() -> bool>,
}

impl Orchestrator {
    /// Watch a single plugin folder into `destination`.
    ///
    /// Dependencies are installed inside the plugin folder.
    ///
    /// # Errors
    ///
    /// Fails if either path is not a directory or the plugin has no manifest.
    pub fn single(source: &Path, destination: &Path, options: WatchOptions) -> Result<Self> {
        require_dir(source)?;
        require_dir(destination)?;

        let plugin = Plugin::load(source)?;

        Ok(Self::new(
            vec![PluginWatch::new(plugin, destination.to_path_buf())],
            source.to_path_buf(),
            None,
            options,
        ))
    }

    /// Watch every plugin of `plugins_dir` into the vault's plugin folders.
    ///
    /// The plugins' dependency tables are merged into one manifest that is
    /// installed in `root`.
    ///
    /// # Errors
    ///
    /// Fails if a path is not a directory, the vault has no plugins folder,
    /// the plugins folder is empty or a plugin has no manifest.
    pub fn multi(
        plugins_dir: &Path,
        vault: &Path,
        root: &Path,
        options: WatchOptions,
    ) -> Result<Self> {
        require_dir(plugins_dir)?;
        require_dir(vault)?;
        require_dir(root)?;

        let vault_plugins = vault.join(VAULT_PLUGINS_DIR);
        require_dir(&vault_plugins)?;

        let plugins = Plugins::discover_non_empty(plugins_dir)?;
        let merged = merger::merge(plugins.manifests(), options.prefer);

        let watches = plugins
            .as_slice()
            .iter()
            .map(|plugin| {
                let destination = vault_plugins.join(plugin.folder_name());
                PluginWatch::new(plugin.clone(), destination)
            })
            .collect();

        Ok(Self::new(watches, root.to_path_buf(), Some(merged), options))
    }

    fn new(
        plugins: Vec<PluginWatch>,
        install_dir: PathBuf,
        merged: Option<DependencySet>,
        options: WatchOptions,
    ) -> Self {
        Self {
            plugins,
            install_dir,
            merged,
            options,
            queue: MessageQueue::new(),
            confirm: Box::new(confirm_abort),
        }
    }

    /// Replace the interactive abort confirmation.
    #[must_use]
    pub fn with_confirm(mut self, confirm: impl FnMut() -> bool + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// The plugins under orchestration.
    #[must_use]
    pub fn plugins(&self) -> &[PluginWatch] {
        &self.plugins
    }

    /// Mutable access, for example to await or kill dev processes.
    pub fn plugins_mut(&mut self) -> &mut [PluginWatch] {
        &mut self.plugins
    }

    /// The merged manifest of the multi-plugin variant.
    #[must_use]
    pub const fn merged(&self) -> Option<&DependencySet> {
        self.merged.as_ref()
    }

    /// The queue watch callbacks report to.
    #[must_use]
    pub const fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Run the whole sequence until interrupted.
    ///
    /// # Errors
    ///
    /// Fails on any install, dev script or watch setup error.
    pub fn watch(
        &mut self,
        interrupts: &Receiver<()>,
        mut out: impl FnMut(&Message),
    ) -> Result<()> {
        self.install(&mut out)?;
        self.start(&mut out)?;
        self.run(interrupts, &mut out);

        Ok(())
    }

    /// Write the merged manifest (multi-plugin only) and install dependencies.
    ///
    /// # Errors
    ///
    /// Fails if the manifest cannot be written or the install command fails.
    pub fn install(&mut self, out: &mut impl FnMut(&Message)) -> Result<()> {
        if let Some(merged) = &self.merged {
            let path = merged.write_manifest(&self.install_dir)?;
            out(&Message::status(format!(
                "Wrote merged manifest to {}",
                path.display()
            )));
        }

        for watch in &mut self.plugins {
            watch.state = PluginState::Installing;
        }

        out(&Message::status("Installing npm dependencies..."));

        let spinner = self.spinner("Installing npm dependencies...");
        let commands = &self.options.commands;
        let result = run_command(&commands.install, &self.install_dir, commands.quiet);
        spinner.finish_and_clear();
        result?;

        out(&Message::status("Finished installing npm dependencies"));

        Ok(())
    }

    /// Start every dev script and watch session.
    ///
    /// On failure the plugins started so far are stopped again, reporting
    /// their dev processes, before the error is returned.
    ///
    /// # Errors
    ///
    /// Fails if a plugin lacks the dev script, a process cannot be spawned,
    /// a destination cannot be created or a watch cannot be set up.
    pub fn start(&mut self, out: &mut impl FnMut(&Message)) -> Result<()> {
        if let Err(e) = self.start_all(out) {
            self.shutdown(PluginState::Stopped, out);
            return Err(e);
        }

        Ok(())
    }

    fn start_all(&mut self, out: &mut impl FnMut(&Message)) -> Result<()> {
        for watch in &mut self.plugins {
            watch.start_dev(&self.options.commands)?;

            fs::create_dir_all(&watch.destination)?;
            watch.start_watch(&self.queue)?;

            out(&Message::status(format!(
                "Watching {} -> {}",
                watch.plugin.root_path.display(),
                watch.destination.display()
            )));
        }

        Ok(())
    }

    /// Print queued messages until an interrupt stops the watch.
    ///
    /// A closed `interrupts` channel also stops the watch.
    pub fn run(&mut self, interrupts: &Receiver<()>, out: &mut impl FnMut(&Message)) {
        drain_until_cancelled(
            &self.queue,
            interrupts,
            self.options.abort,
            out,
            &mut self.confirm,
        );

        self.shutdown(PluginState::Aborted, out);
        out(&Message::status("Watch aborted"));
    }

    /// Release every watch without a user interrupt.
    pub fn stop(&mut self, out: &mut impl FnMut(&Message)) {
        self.shutdown(PluginState::Stopped, out);
    }

    fn shutdown(&mut self, final_state: PluginState, out: &mut impl FnMut(&Message)) {
        for watch in &mut self.plugins {
            watch.stop(final_state, out);
        }

        for message in self.queue.drain() {
            out(&message);
        }
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if self.options.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Forward queued messages to `out` until the watch should stop.
///
/// Every interrupt consults `policy`; with [`AbortPolicy::Confirm`] the
/// `confirm` callback decides. Messages still queued when the loop ends are
/// flushed.
pub fn drain_until_cancelled(
    queue: &MessageQueue,
    interrupts: &Receiver<()>,
    policy: AbortPolicy,
    out: &mut impl FnMut(&Message),
    confirm: &mut impl FnMut() -> bool,
) {
    loop {
        select! {
            recv(queue.receiver()) -> message => {
                if let Ok(message) = message {
                    out(&message);
                }
            }
            recv(interrupts) -> signal => {
                let stop = signal.is_err()
                    || match policy {
                        AbortPolicy::Immediate => true,
                        AbortPolicy::Confirm => confirm(),
                    };

                if stop {
                    break;
                }
            }
        }
    }

    for message in queue.drain() {
        out(&message);
    }
}

fn confirm_abort() -> bool {
    Confirm::new("Abort watch?")
        .with_default(true)
        .prompt()
        .unwrap_or(true)
}

fn require_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("\"{}\" is not a valid directory", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_drain_immediate_stops_on_first_interrupt() {
        let queue = MessageQueue::new();
        let (tx, rx) = unbounded();
        queue.push(Message::status("one"));
        queue.push(Message::status("two"));
        tx.send(()).unwrap();

        let mut seen = Vec::new();
        drain_until_cancelled(
            &queue,
            &rx,
            AbortPolicy::Immediate,
            &mut |m: &Message| seen.push(m.clone()),
            &mut || panic!("no confirmation expected"),
        );

        assert_eq!(seen, vec![Message::status("one"), Message::status("two")]);
    }

    #[test]
    fn test_drain_confirm_keeps_watching_on_no() {
        let queue = MessageQueue::new();
        let (tx, rx) = unbounded();
        tx.send(()).unwrap();
        tx.send(()).unwrap();

        let mut answers = vec![true, false];
        let mut asked = 0;
        drain_until_cancelled(
            &queue,
            &rx,
            AbortPolicy::Confirm,
            &mut |_: &Message| {},
            &mut || {
                asked += 1;
                answers.pop().unwrap_or(true)
            },
        );

        assert_eq!(asked, 2);
    }

    #[test]
    fn test_drain_stops_when_interrupts_close() {
        let queue = MessageQueue::new();
        let (tx, rx) = unbounded::<()>();
        drop(tx);

        let mut count = 0;
        drain_until_cancelled(
            &queue,
            &rx,
            AbortPolicy::Confirm,
            &mut |_: &Message| count += 1,
            &mut || false,
        );

        assert_eq!(count, 0);
    }

    #[test]
    fn test_single_requires_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");

        let err = Orchestrator::single(&missing, tmp.path(), WatchOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("is not a valid directory"));

        let err = Orchestrator::single(tmp.path(), tmp.path(), WatchOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("package.json required"));
    }

    #[test]
    fn test_multi_requires_vault_plugins_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let plugins = tmp.path().join("Plugins");
        let vault = tmp.path().join("Vault");
        fs::create_dir_all(&plugins).unwrap();
        fs::create_dir_all(&vault).unwrap();

        let err = Orchestrator::multi(&plugins, &vault, tmp.path(), WatchOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains(".obsidian"));

        fs::create_dir_all(vault.join(VAULT_PLUGINS_DIR)).unwrap();
        let err = Orchestrator::multi(&plugins, &vault, tmp.path(), WatchOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_with_confirm_replaces_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("package.json"), "{}").unwrap();
        let asked = Rc::new(Cell::new(false));
        let flag = Rc::clone(&asked);

        let mut orchestrator = Orchestrator::single(tmp.path(), tmp.path(), WatchOptions::default())
            .unwrap()
            .with_confirm(move || {
                flag.set(true);
                true
            });

        assert!((orchestrator.confirm)());
        assert!(asked.get());
        assert_eq!(orchestrator.plugins()[0].state(), PluginState::Idle);
    }

    #[test]
    fn test_plugin_state_display() {
        assert_eq!(PluginState::BuildRunning.to_string(), "build running");
        assert_eq!(PluginState::Aborted.to_string(), "aborted");
    }
}

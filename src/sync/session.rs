//! Long-running copy-on-change session.
//!
//! A [`WatchSession`] performs an initial [`sync_once`] and then subscribes
//! to filesystem notifications for the source folder. Notifications are
//! delivered on the watcher's own thread, which also performs the copies and
//! invokes the modification callback, so starting a session never blocks
//! the caller beyond the initial sync.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{ModifyKind, RenameMode},
};

use super::files::{SyncEvent, SyncKind, copy_if_changed, sync_once, watched_file_name};

/// An active watch bound to one source and destination folder.
///
/// Dropping the session releases the OS watch handle as well; [`Self::stop`]
/// does it explicitly and reports failures.
pub struct WatchSession {
    watcher: RecommendedWatcher,
    source: PathBuf,
    destination: PathBuf,
}

impl WatchSession {
    /// Sync once, then keep `destination` up to date with `source`.
    ///
    /// `on_copied` runs on the calling thread for every file copied by the
    /// initial sync. `on_modified` runs on the notification thread for every
    /// later copy, and receives an `Err` when a changed file could not be
    /// copied (for example because it vanished). Such failures do not end
    /// the session.
    ///
    /// # Errors
    ///
    /// Fails if the initial sync fails or the watcher cannot be set up.
    pub fn start<C, M>(
        source: &Path,
        destination: &Path,
        mut on_copied: C,
        mut on_modified: M,
    ) -> Result<Self>
    where
        C: FnMut(&SyncEvent),
        M: FnMut(Result<SyncEvent>) + Send + 'static,
    {
        for event in sync_once(source, destination)? {
            on_copied(&event);
        }

        let dest = destination.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for outcome in handle_event(&event, &dest) {
                        on_modified(outcome);
                    }
                }
                Err(e) => on_modified(Err(anyhow!("watch error: {e}"))),
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(source, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", source.display()))?;

        Ok(Self {
            watcher,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        })
    }

    /// Folder being watched.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Folder receiving the copies.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Unsubscribe from notifications and release the watch.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to remove the watch.
    pub fn stop(mut self) -> Result<()> {
        self.watcher
            .unwatch(&self.source)
            .with_context(|| format!("Failed to stop watching {}", self.source.display()))
    }
}

/// Whether the event can mean new content at its path.
///
/// The old name of a rename no longer holds the file, so it is skipped.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
        EventKind::Modify(_) | EventKind::Create(_) => true,
        _ => false,
    }
}

/// Copy every watched file named by `event` whose content changed.
pub(crate) fn handle_event(event: &Event, destination: &Path) -> Vec<Result<SyncEvent>> {
    if !is_content_change(&event.kind) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter_map(|path| {
            let name = watched_file_name(path)?;

            copy_change(path, &destination.join(name), destination).transpose()
        })
        .collect()
}

fn copy_change(path: &Path, target: &Path, destination: &Path) -> Result<Option<SyncEvent>> {
    if !path.is_file() {
        return Err(anyhow!(
            "{} disappeared before it could be copied",
            path.display()
        ));
    }

    let copied = copy_if_changed(path, target)?;

    Ok(copied.then(|| SyncEvent {
        kind: SyncKind::Modified,
        source: path.to_path_buf(),
        destination: destination.to_path_buf(),
    }))
}

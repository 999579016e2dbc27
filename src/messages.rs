//! Watch status messages.
//!
//! Watch callbacks run on notification threads; the foreground loop prints
//! what they report. [`MessageQueue`] connects the two with an unbounded
//! multi-producer channel, so messages come out in the order they were
//! pushed and the consumer blocks instead of polling.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::Local;
use colored::Colorize;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;

use crate::sync::{SyncEvent, SyncKind};

/// One line of watch output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Message {
    /// Progress of the orchestrator itself
    Status {
        /// Human-readable status
        text: String,
    },

    /// A file was copied into a plugin folder
    Synced {
        /// Destination plugin folder name
        plugin: String,
        /// Initial copy or copy after a change
        kind: SyncKind,
        /// Copied file name
        file: String,
    },

    /// A changed file could not be copied
    SyncFailed {
        /// Destination plugin folder name
        plugin: String,
        /// Error description
        error: String,
    },
}

impl Message {
    /// Status message.
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }

    /// Message for a copied file, labelled with the destination folder.
    #[must_use]
    pub fn synced(event: &SyncEvent) -> Self {
        Self::Synced {
            plugin: crate::plugin::folder_name(&event.destination),
            kind: event.kind,
            file: event.file_name(),
        }
    }

    /// Message for a failed copy.
    pub fn sync_failed(plugin: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::SyncFailed {
            plugin: plugin.into(),
            error: format!("{error:#}"),
        }
    }

    /// Line printed in human mode, prefixed with the local time.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{} {self}",
            Local::now().format("%H:%M:%S").to_string().dimmed()
        )
    }

    /// Line printed in `--json` mode.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Status { text } => write!(f, "{}", text.cyan()),
            Self::Synced { plugin, kind, file } => {
                let verb = match kind {
                    SyncKind::Copied => "copied".bold(),
                    SyncKind::Modified => "modified".magenta(),
                };
                write!(f, "[{}] {verb} {}", plugin.yellow(), file.blue())
            }
            Self::SyncFailed { plugin, error } => write!(
                f,
                "[{}] {} {}",
                plugin.yellow(),
                "sync failed:".red(),
                error.red()
            ),
        }
    }
}

/// Producer half of a [`MessageQueue`].
#[derive(Clone, Debug)]
pub struct MessageSender(Sender<Message>);

impl MessageSender {
    /// Append a message.
    ///
    /// Messages pushed after the queue is gone are dropped.
    pub fn push(&self, message: Message) {
        let _ = self.0.send(message);
    }
}

/// Ordered queue of watch messages.
#[derive(Debug)]
pub struct MessageQueue {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self { sender, receiver }
    }

    /// A producer handle that can be moved into callbacks.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        MessageSender(self.sender.clone())
    }

    /// Append a message from the owning thread.
    pub fn push(&self, message: Message) {
        let _ = self.sender.send(message);
    }

    /// The consumer side, for `select!`.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver<Message> {
        &self.receiver
    }

    /// Pop the oldest message without blocking.
    #[must_use]
    pub fn try_pop(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued message.
    #[must_use]
    pub fn drain(&self) -> Vec<Message> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;

    fn event(kind: SyncKind, file: &str) -> SyncEvent {
        SyncEvent {
            kind,
            source: PathBuf::from("/plugins/canvas-util").join(file),
            destination: PathBuf::from("/vault/.obsidian/plugins/canvas-util"),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.push(Message::status("first"));
        queue.sender().push(Message::status("second"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(Message::status("first")));
        assert_eq!(queue.drain(), vec![Message::status("second")]);
        assert!(queue.is_empty());
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_concurrent_producers_keep_per_thread_order() {
        let queue = MessageQueue::new();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for i in 0..100 {
                        sender.push(Message::status(format!("{t}:{i}")));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let messages = queue.drain();
        assert_eq!(messages.len(), 400);

        for t in 0..4 {
            let seen: Vec<usize> = messages
                .iter()
                .filter_map(|m| match m {
                    Message::Status { text } => text
                        .strip_prefix(&format!("{t}:"))
                        .and_then(|i| i.parse().ok()),
                    _ => None,
                })
                .collect();
            assert_eq!(seen, (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_synced_message() {
        let message = Message::synced(&event(SyncKind::Modified, "main.js"));

        assert_eq!(
            message,
            Message::Synced {
                plugin: "canvas-util".to_string(),
                kind: SyncKind::Modified,
                file: "main.js".to_string(),
            }
        );
    }

    #[test]
    fn test_plain_rendering() {
        colored::control::set_override(false);

        let copied = Message::synced(&event(SyncKind::Copied, "styles.css"));
        let failed = Message::sync_failed("canvas-util", &anyhow::anyhow!("gone"));

        assert_eq!(copied.to_string(), "[canvas-util] copied styles.css");
        assert_eq!(failed.to_string(), "[canvas-util] sync failed: gone");
        assert!(copied.render().ends_with("[canvas-util] copied styles.css"));
    }

    #[test]
    fn test_json_rendering() {
        let message = Message::synced(&event(SyncKind::Copied, "main.js"));

        assert_eq!(
            message.to_json(),
            r#"{"event":"synced","plugin":"canvas-util","kind":"copied","file":"main.js"}"#
        );
    }
}

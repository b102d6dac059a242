//! `tippytap watch` command implementation.
//!
//! Opens a file the way the editor would: a host bridge over a watched
//! file store on one side, an editor session on the other. Nothing edits
//! the document locally, so every change the session reports is external
//! and is resolved by the chosen policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, ValueEnum};
use tokio::sync::mpsc;

use tippytap_bridge::{FileTextStore, HostBridge, Message};
use tippytap_config::Config;
use tippytap_sync::{EditorSession, MemoryEditor, SessionSettings, ViewMode};

use crate::error::CliError;
use crate::output::Output;

/// What to do with an external change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ChangePolicy {
    /// Print the diff against the text the watch started with.
    Report,
    /// Take the change as the new synced text.
    Accept,
    /// Write the synced text back over the change.
    Reject,
}

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Path to the markdown file.
    file: PathBuf,

    /// How to resolve external changes.
    #[arg(long, value_enum, default_value_t = ChangePolicy::Report)]
    on_change: ChangePolicy,
}

impl WatchArgs {
    /// Execute the watch command. Runs until the file can no longer be
    /// watched.
    pub(crate) async fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        let settings = SessionSettings {
            debounce: config.editor.debounce(),
            suppression_window: config.sync.suppression_window(),
            max_lcs_cells: config.diff.max_lcs_cells,
        };

        let store = Arc::new(FileTextStore::new(&self.file));
        let bridge = HostBridge::new(store);
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();

        let mut watcher = Watcher {
            session: EditorSession::new(MemoryEditor::new(false), settings),
            policy: self.on_change,
            output,
            to_host: editor_tx,
        };
        watcher.send_to_host(Message::Ready)?;

        output_started(&watcher.output, &self.file, self.on_change);
        tokio::select! {
            result = bridge.run(editor_rx, host_tx) => result?,
            result = watcher.run(host_rx) => result?,
        }
        Ok(())
    }
}

fn output_started(output: &Output, file: &Path, policy: ChangePolicy) {
    output.info(&format!(
        "Watching {} (external changes: {})",
        file.display(),
        match policy {
            ChangePolicy::Report => "report",
            ChangePolicy::Accept => "accept",
            ChangePolicy::Reject => "reject",
        }
    ));
}

/// Editor side of the watch.
struct Watcher {
    session: EditorSession<MemoryEditor>,
    policy: ChangePolicy,
    output: Output,
    to_host: mpsc::UnboundedSender<Message>,
}

impl Watcher {
    async fn run(&mut self, mut from_host: mpsc::UnboundedReceiver<Message>) -> Result<(), CliError> {
        while let Some(message) = from_host.recv().await {
            self.handle(message, Instant::now())?;
        }
        Ok(())
    }

    fn handle(&mut self, message: Message, now: Instant) -> Result<(), CliError> {
        let was_pending = self.session.view_mode() == ViewMode::Diff;
        let is_init = matches!(message, Message::Init { .. });

        if let Some(reply) = self.session.handle_host(message, now) {
            self.send_to_host(reply)?;
        }
        if is_init {
            self.output.success("Document loaded");
            return Ok(());
        }

        let pending = self.session.view_mode() == ViewMode::Diff;
        if !pending {
            if was_pending {
                self.output.info("External change withdrawn");
            }
            return Ok(());
        }

        if let Some(diff) = self.session.controller().pending_diff() {
            self.output.warning("External change:");
            self.output.print_diff(diff)?;
        }
        let reply = match self.policy {
            ChangePolicy::Report => None,
            ChangePolicy::Accept => {
                self.output.success("Accepted");
                self.session.accept(now)
            }
            ChangePolicy::Reject => {
                self.output.success("Rejected, restoring file");
                self.session.reject(now)
            }
        };
        if let Some(reply) = reply {
            self.send_to_host(reply)?;
        }
        Ok(())
    }

    fn send_to_host(&self, message: Message) -> Result<(), CliError> {
        self.to_host
            .send(message)
            .map_err(|_| CliError::Validation("Host bridge stopped".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn watcher(policy: ChangePolicy) -> (Watcher, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = Watcher {
            session: EditorSession::new(MemoryEditor::new(false), SessionSettings::default()),
            policy,
            output: Output::new(),
            to_host: tx,
        };
        (watcher, rx)
    }

    fn init(watcher: &mut Watcher, content: &str, now: Instant) {
        watcher
            .handle(
                Message::Init {
                    content: content.to_owned(),
                },
                now,
            )
            .unwrap();
    }

    fn external(content: &str) -> Message {
        Message::ExternalChange {
            content: content.to_owned(),
        }
    }

    #[test]
    fn test_reject_policy_restores_text() {
        let now = Instant::now();
        let (mut watcher, mut to_host) = watcher(ChangePolicy::Reject);
        init(&mut watcher, "A", now);

        watcher.handle(external("B"), now).unwrap();

        assert_eq!(
            to_host.try_recv().ok(),
            Some(Message::RejectChanges {
                content: "A".to_owned()
            })
        );
        assert_eq!(watcher.session.view_mode(), ViewMode::Rich);
    }

    #[test]
    fn test_accept_policy_updates_synced_text() {
        let now = Instant::now();
        let (mut watcher, mut to_host) = watcher(ChangePolicy::Accept);
        init(&mut watcher, "A", now);

        watcher.handle(external("B"), now).unwrap();

        assert_eq!(
            to_host.try_recv().ok(),
            Some(Message::Update {
                content: "B".to_owned()
            })
        );
        assert_eq!(watcher.session.controller().last_synced(), "B");
    }

    #[test]
    fn test_report_policy_keeps_change_pending() {
        let now = Instant::now();
        let (mut watcher, mut to_host) = watcher(ChangePolicy::Report);
        init(&mut watcher, "A", now);

        watcher.handle(external("B"), now).unwrap();
        assert_eq!(watcher.session.view_mode(), ViewMode::Diff);

        watcher.handle(external("A"), now).unwrap();
        assert_eq!(watcher.session.view_mode(), ViewMode::Rich);
        assert!(to_host.try_recv().is_err());
    }
}

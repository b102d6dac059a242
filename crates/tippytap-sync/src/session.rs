//! Editor side of one open document.
//!
//! The session ties the structured editor to the host: it decodes the
//! text the host sends, encodes and debounces the editor's edits, routes
//! store changes through the reconciliation controller and shows pending
//! external changes as a diff until they are accepted or rejected.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use tippytap_bridge::Message;
use tippytap_markdown::encode;
use tippytap_mermaid::{DiagramRenderer, DiagramViews, LeafId};
use tippytap_model::Node;

use crate::controller::{DEFAULT_SUPPRESSION_WINDOW, ReconciliationController, StoreChange};
use crate::debounce::{DEFAULT_EDIT_DEBOUNCE, EditDebouncer};
use crate::diff::{DEFAULT_MAX_LCS_CELLS, diff_document};
use crate::editor::DocumentEditor;

/// Timing and size settings of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Quiet period before an edit is committed.
    pub debounce: Duration,
    /// Time after our own write during which store changes are ignored.
    pub suppression_window: Duration,
    /// LCS budget for external change diffs.
    pub max_lcs_cells: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_EDIT_DEBOUNCE,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
            max_lcs_cells: DEFAULT_MAX_LCS_CELLS,
        }
    }
}

/// What the session currently shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    /// The structured editor.
    Rich,
    /// The Markdown text.
    Raw,
    /// A pending external change, read-only.
    Diff,
}

/// Input to a running session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A message from the host.
    Host(Message),
    /// The structured editor's document changed.
    Edited(Node),
    /// The raw view's text changed.
    RawEdited(String),
    /// Accept the pending external change.
    Accept,
    /// Reject the pending external change.
    Reject,
}

/// One open document on the editor side.
pub struct EditorSession<E> {
    editor: E,
    controller: ReconciliationController,
    debouncer: EditDebouncer,
    initialized: bool,
    raw_view: bool,
    raw_text: String,
    diff: Option<Node>,
    diagrams: DiagramViews,
    diff_diagrams: DiagramViews,
}

impl<E: DocumentEditor> EditorSession<E> {
    pub fn new(editor: E, settings: SessionSettings) -> Self {
        let diagrams = DiagramViews::new(editor.is_editable());
        Self {
            editor,
            controller: ReconciliationController::new(settings.suppression_window)
                .with_max_lcs_cells(settings.max_lcs_cells),
            debouncer: EditDebouncer::new(settings.debounce),
            initialized: false,
            raw_view: false,
            raw_text: String::new(),
            diff: None,
            diagrams,
            diff_diagrams: DiagramViews::new(false),
        }
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn controller(&self) -> &ReconciliationController {
        &self.controller
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn view_mode(&self) -> ViewMode {
        if self.diff.is_some() {
            ViewMode::Diff
        } else if self.raw_view {
            ViewMode::Raw
        } else {
            ViewMode::Rich
        }
    }

    /// Text shown in the raw view.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// The diff document while an external change is pending.
    pub fn diff_document(&self) -> Option<&Node> {
        self.diff.as_ref()
    }

    /// Diagram views of the editor's document.
    pub fn diagrams(&self) -> &DiagramViews {
        &self.diagrams
    }

    pub fn diagrams_mut(&mut self) -> &mut DiagramViews {
        &mut self.diagrams
    }

    /// Diagram views of the diff document. They are read-only.
    pub fn diff_diagrams(&self) -> &DiagramViews {
        &self.diff_diagrams
    }

    /// Handle one event, returning the message for the host if there is one.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) -> Option<Message> {
        match event {
            SessionEvent::Host(message) => self.handle_host(message, now),
            SessionEvent::Edited(doc) => {
                self.on_edit(doc, now);
                None
            }
            SessionEvent::RawEdited(text) => self.on_raw_edit(text, now),
            SessionEvent::Accept => self.accept(now),
            SessionEvent::Reject => self.reject(now),
        }
    }

    /// Handle a message from the host.
    pub fn handle_host(&mut self, message: Message, now: Instant) -> Option<Message> {
        match message {
            Message::Init { content } => {
                self.init(content);
                None
            }
            Message::ExternalChange { content } => {
                self.on_external_change(&content, now);
                None
            }
            Message::ToggleRawView => {
                self.toggle_raw_view();
                None
            }
            other => {
                tracing::debug!(kind = other.kind(), "Ignoring message not meant for the editor");
                None
            }
        }
    }

    fn init(&mut self, content: String) {
        tracing::debug!(len = content.len(), "Initializing editor");
        self.load(&content);
        self.controller.open(content.clone());
        self.raw_text = content;
        self.debouncer.cancel();
        self.clear_diff();
        self.initialized = true;
    }

    fn on_external_change(&mut self, content: &str, now: Instant) {
        if !self.initialized {
            tracing::debug!("External change before init ignored");
            return;
        }
        match self.controller.on_store_change(content, now) {
            StoreChange::Pending { diff } => {
                let doc = diff_document(&diff);
                self.diff_diagrams.sync(&doc);
                self.diff = Some(doc);
            }
            StoreChange::Withdrawn => self.clear_diff(),
            StoreChange::Suppressed | StoreChange::Unchanged => {}
        }
    }

    fn toggle_raw_view(&mut self) {
        self.raw_view = !self.raw_view;
        if self.raw_view {
            self.raw_text = encode(self.editor.document());
        }
        tracing::debug!(raw = self.raw_view, "Toggled raw view");
    }

    /// The structured editor's document changed.
    ///
    /// Ignored before init and while a diff is shown.
    pub fn on_edit(&mut self, doc: Node, now: Instant) {
        if !self.accepts_edits() {
            return;
        }
        self.editor.set_document(doc);
        self.diagrams.sync(self.editor.document());
        self.debouncer.record(encode(self.editor.document()), now);
    }

    /// The raw view's text changed. Raw edits are committed immediately.
    pub fn on_raw_edit(&mut self, text: String, now: Instant) -> Option<Message> {
        if !self.accepts_edits() {
            return None;
        }
        self.load(&text);
        self.debouncer.cancel();
        let commit = self.controller.commit_local(&text, now);
        self.raw_text = text;
        commit.map(|content| Message::Update { content })
    }

    /// Save a diagram's edit buffer into the document.
    ///
    /// Returns `true` when the document changed; the change is committed
    /// like any other edit.
    pub fn save_diagram(&mut self, leaf: &LeafId, now: Instant) -> bool {
        if !self.accepts_edits() {
            return false;
        }
        let mut doc = self.editor.document().clone();
        if !self.diagrams.save_into(leaf, &mut doc) {
            return false;
        }
        self.on_edit(doc, now);
        true
    }

    /// Commit the debounced edit if it is due.
    pub fn tick(&mut self, now: Instant) -> Option<Message> {
        if self.diff.is_some() {
            return None;
        }
        let markdown = self.debouncer.take_ready(now)?;
        self.commit(&markdown, now)
    }

    /// Commit the debounced edit now, whatever its deadline.
    pub fn flush(&mut self, now: Instant) -> Option<Message> {
        if self.diff.is_some() {
            return None;
        }
        let markdown = self.debouncer.flush()?;
        self.commit(&markdown, now)
    }

    /// When [`tick`](Self::tick) next has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.diff.is_some() {
            return None;
        }
        self.debouncer.deadline()
    }

    /// Accept the pending external change into the editor.
    pub fn accept(&mut self, now: Instant) -> Option<Message> {
        let content = self.controller.accept(now)?;
        tracing::info!("External change accepted");
        self.load(&content);
        self.raw_text.clone_from(&content);
        self.debouncer.cancel();
        self.clear_diff();
        Some(Message::Update { content })
    }

    /// Reject the pending external change, restoring the last synced text.
    pub fn reject(&mut self, now: Instant) -> Option<Message> {
        let content = self.controller.reject(now)?;
        tracing::info!("External change rejected");
        self.clear_diff();
        Some(Message::RejectChanges { content })
    }

    /// Render every diagram waiting for a render, in the editor and the diff.
    pub async fn render_diagrams<R: DiagramRenderer>(&mut self, renderer: &R) -> usize {
        self.diagrams.render_pending(renderer).await + self.diff_diagrams.render_pending(renderer).await
    }

    fn accepts_edits(&self) -> bool {
        if !self.initialized {
            tracing::debug!("Edit before init ignored");
            return false;
        }
        if self.diff.is_some() {
            tracing::debug!("Edit while diff is shown ignored");
            return false;
        }
        true
    }

    fn commit(&mut self, markdown: &str, now: Instant) -> Option<Message> {
        let content = self.controller.commit_local(markdown, now)?;
        self.raw_text.clone_from(&content);
        Some(Message::Update { content })
    }

    fn load(&mut self, markdown: &str) {
        self.editor.set_document(tippytap_mermaid::decode(markdown));
        self.diagrams.sync(self.editor.document());
    }

    fn clear_diff(&mut self) {
        self.diff = None;
        self.diff_diagrams = DiagramViews::new(false);
    }
}

/// Drive a session until the inbound channel closes.
///
/// Sends `ready` first, then handles events as they arrive and commits
/// debounced edits when their timer fires. A pending edit is flushed when
/// the inbound side hangs up. Returns the session for inspection.
pub async fn run<E: DocumentEditor>(
    mut session: EditorSession<E>,
    mut inbound: mpsc::UnboundedReceiver<SessionEvent>,
    outbound: mpsc::UnboundedSender<Message>,
) -> EditorSession<E> {
    if outbound.send(Message::Ready).is_err() {
        return session;
    }

    loop {
        let deadline = session.next_deadline();
        let reply = tokio::select! {
            event = inbound.recv() => {
                let Some(event) = event else {
                    break;
                };
                session.handle_event(event, now())
            }
            () = sleep_until(deadline) => session.tick(now()),
        };

        if let Some(message) = reply
            && outbound.send(message).is_err()
        {
            tracing::debug!("Host disconnected, session stopped");
            return session;
        }
    }

    if let Some(message) = session.flush(now())
        && outbound.send(message).is_err()
    {
        tracing::warn!("Failed to send final edit, host disconnected");
    }
    session
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

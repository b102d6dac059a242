//! Host bridge message protocol.
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "init", "content": "# Title"}
//! {"type": "ready"}
//! ```

use serde::{Deserialize, Serialize};

/// A message between the host (owner of the text store) and the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Host → editor: initial document text.
    Init { content: String },
    /// Editor → host: commit encoded Markdown to the store.
    Update { content: String },
    /// Host → editor: the stored text changed.
    ExternalChange { content: String },
    /// Editor → host: force the store back to this text.
    RejectChanges { content: String },
    /// Editor → host: the editor is initialized and wants `init`.
    Ready,
    /// Host → editor: switch between rich and raw views.
    ToggleRawView,
}

impl Message {
    /// The `type` tag of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Update { .. } => "update",
            Self::ExternalChange { .. } => "externalChange",
            Self::RejectChanges { .. } => "rejectChanges",
            Self::Ready => "ready",
            Self::ToggleRawView => "toggleRawView",
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON message.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

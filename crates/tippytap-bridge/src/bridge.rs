//! Host side of the bridge: relays between a text store and the editor.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::message::Message;
use crate::store::{StoreError, TextStore};

/// Relay between one document's text store and its editor.
///
/// Answers `ready` with `init`, writes `update` and `rejectChanges` to the
/// store, and forwards every store change as `externalChange`. It does not
/// decide which changes are external; the editor side does.
pub struct HostBridge<S> {
    store: Arc<S>,
}

impl<S: TextStore> HostBridge<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle a message from the editor, returning the reply if there is one.
    pub fn handle(&self, message: Message) -> Result<Option<Message>, StoreError> {
        match message {
            Message::Ready => Ok(Some(Message::Init {
                content: self.store.read()?,
            })),
            Message::Update { content } | Message::RejectChanges { content } => {
                self.store.write(&content)?;
                Ok(None)
            }
            other => {
                tracing::debug!(kind = other.kind(), "Ignoring message not meant for the host");
                Ok(None)
            }
        }
    }

    /// Relay messages until the editor side hangs up.
    ///
    /// Store changes are forwarded before further editor messages are
    /// handled, so the editor sees the echo of each write in order.
    pub async fn run(
        &self,
        mut from_editor: mpsc::UnboundedReceiver<Message>,
        to_editor: mpsc::UnboundedSender<Message>,
    ) -> Result<(), StoreError> {
        let (mut changes, _watch) = self.store.subscribe()?;

        loop {
            tokio::select! {
                biased;

                Some(content) = changes.recv() => {
                    if to_editor.send(Message::ExternalChange { content }).is_err() {
                        break;
                    }
                }
                message = from_editor.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    match self.handle(message) {
                        Ok(Some(reply)) => {
                            if to_editor.send(reply).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "Failed to handle editor message"),
                    }
                }
            }
        }

        tracing::debug!("Editor disconnected, bridge stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTextStore;
    use pretty_assertions::assert_eq;

    fn bridge(text: &str) -> HostBridge<MemoryTextStore> {
        HostBridge::new(Arc::new(MemoryTextStore::new(text)))
    }

    #[test]
    fn test_ready_is_answered_with_init() {
        let bridge = bridge("# Doc");
        assert_eq!(
            bridge.handle(Message::Ready).unwrap(),
            Some(Message::Init {
                content: "# Doc".to_owned()
            })
        );
    }

    #[test]
    fn test_update_and_reject_write_the_store() {
        let bridge = bridge("A");

        bridge
            .handle(Message::Update {
                content: "B".to_owned(),
            })
            .unwrap();
        assert_eq!(bridge.store().text(), "B");

        bridge
            .handle(Message::RejectChanges {
                content: "A".to_owned(),
            })
            .unwrap();
        assert_eq!(bridge.store().text(), "A");
    }

    #[test]
    fn test_editor_bound_messages_are_ignored() {
        let bridge = bridge("A");
        assert_eq!(bridge.handle(Message::ToggleRawView).unwrap(), None);
        assert_eq!(
            bridge
                .handle(Message::ExternalChange {
                    content: "B".to_owned()
                })
                .unwrap(),
            None
        );
        assert_eq!(bridge.store().write_count(), 0);
    }

    #[tokio::test]
    async fn test_run_relays_and_echoes_writes() {
        let bridge = bridge("A");
        let (editor_tx, editor_rx) = mpsc::unbounded_channel();
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();

        editor_tx.send(Message::Ready).unwrap();
        editor_tx
            .send(Message::Update {
                content: "B".to_owned(),
            })
            .unwrap();
        editor_tx
            .send(Message::RejectChanges {
                content: "A".to_owned(),
            })
            .unwrap();
        drop(editor_tx);

        bridge.run(editor_rx, host_tx).await.unwrap();

        let mut received = Vec::new();
        while let Ok(message) = host_rx.try_recv() {
            received.push(message);
        }
        assert_eq!(
            received,
            vec![
                Message::Init {
                    content: "A".to_owned()
                },
                Message::ExternalChange {
                    content: "B".to_owned()
                },
                Message::ExternalChange {
                    content: "A".to_owned()
                },
            ]
        );
        assert_eq!(bridge.store().write_count(), 2);
    }
}

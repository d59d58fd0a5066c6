//! Message channel between extension contexts.
//!
//! The background context runs as one task that owns the receiving end of an
//! mpsc channel. Every other context holds a [`Port`]. Each message carries a
//! oneshot sender for its reply. Immediate replies are sent inline; deferred
//! replies are awaited in their own task so the loop keeps accepting messages
//! while storage calls are in flight.

use super::background::{MessageHandler, Reply};
use super::protocol::{Message, MessageResponse, MessageSender};
use crate::config::ExtensionConfig;
use crate::error::{Result, ToolcacheError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// One message in flight.
pub struct Envelope {
    pub message: Value,
    pub sender: MessageSender,
    reply: oneshot::Sender<MessageResponse>,
}

/// Handle to a running background loop. Dropping it stops the loop.
pub struct MessengerHandle {
    tx: mpsc::Sender<Envelope>,
    task: Option<JoinHandle<()>>,
}

impl MessengerHandle {
    /// Connect a context to the background.
    pub fn port(&self, sender: MessageSender) -> Port {
        Port {
            tx: self.tx.clone(),
            sender,
        }
    }

    /// Stop the background loop. Pending and future sends fail with
    /// [`ToolcacheError::ChannelClosed`].
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for MessengerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the background loop for a handler.
pub fn spawn_background<H: MessageHandler>(handler: Arc<H>) -> MessengerHandle {
    let (tx, rx) = mpsc::channel(ExtensionConfig::MESSAGE_CHANNEL_CAPACITY);
    let task = tokio::spawn(run_loop(handler, rx));
    MessengerHandle {
        tx,
        task: Some(task),
    }
}

async fn run_loop<H: MessageHandler>(handler: Arc<H>, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        let Envelope {
            message,
            sender,
            reply,
        } = envelope;

        match handler.handle(&message, &sender) {
            Reply::Immediate(response) => {
                if reply.send(response).is_err() {
                    debug!("Caller went away before an immediate reply");
                }
            }
            Reply::Deferred(future) => {
                tokio::spawn(async move {
                    let response = future.await;
                    if reply.send(response).is_err() {
                        debug!("Caller went away before a deferred reply");
                    }
                });
            }
        }
    }
    debug!("Background message loop stopped");
}

/// A context's connection to the background.
#[derive(Clone)]
pub struct Port {
    tx: mpsc::Sender<Envelope>,
    sender: MessageSender,
}

impl Port {
    pub fn sender(&self) -> &MessageSender {
        &self.sender
    }

    pub async fn send_message(&self, message: &Message) -> Result<MessageResponse> {
        self.send_raw(serde_json::to_value(message)?).await
    }

    /// Send an arbitrary JSON message and wait for the reply.
    pub async fn send_raw(&self, message: Value) -> Result<MessageResponse> {
        let (reply, response) = oneshot::channel();
        let envelope = Envelope {
            message,
            sender: self.sender.clone(),
            reply,
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| ToolcacheError::ChannelClosed)?;
        response.await.map_err(|_| ToolcacheError::ChannelClosed)
    }
}

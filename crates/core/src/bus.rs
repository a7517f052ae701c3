use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::NotificationMessage;

/// Events buffered per subscriber before publishers see backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Builds the bus topic a client platform listens on, e.g.
/// `game:notifications:slack`.
pub fn notification_topic(channel_prefix: &str, client: &str) -> String {
    format!("{channel_prefix}:notifications:{client}")
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("event bus failed to connect: {0}")]
    Connect(String),
    #[error("event bus failed to subscribe to `{topic}`: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("event bus disconnect failed: {0}")]
    Disconnect(String),
}

/// Publish/subscribe collaborator delivering notification envelopes.
///
/// Subscribing hands back the receiving half of a channel; the bus pushes
/// deserialized envelopes into it and the subscriber drains them one at a
/// time. Dropping or disconnecting the bus closes the channel, which lets
/// consumers drain anything already buffered and then stop cleanly.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn connect(&self) -> Result<(), BusError>;
    async fn subscribe(&self, topic: &str)
        -> Result<mpsc::Receiver<NotificationMessage>, BusError>;
    async fn disconnect(&self) -> Result<(), BusError>;
}

/// Bus stand-in for deployments where no broker is wired up. Subscriptions
/// yield an already-closed channel, so consumers start and immediately
/// drain to completion.
#[derive(Default)]
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn connect(&self) -> Result<(), BusError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        _topic: &str,
    ) -> Result<mpsc::Receiver<NotificationMessage>, BusError> {
        let (_sender, receiver) = mpsc::channel(1);
        Ok(receiver)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Process-local bus backed by tokio channels. Used by tests and local
/// single-process runs; production deployments substitute the broker-backed
/// bridge.
#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<NotificationMessage>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fan a message out to every subscriber of `topic`. Subscribers that
    /// went away are pruned rather than treated as errors.
    pub async fn publish(&self, topic: &str, message: NotificationMessage) {
        let senders: Vec<mpsc::Sender<NotificationMessage>> = {
            let subscribers = self.subscribers.lock().expect("bus subscriber map poisoned");
            subscribers.get(topic).cloned().unwrap_or_default()
        };

        for sender in senders {
            if sender.send(message.clone()).await.is_err() {
                let mut subscribers =
                    self.subscribers.lock().expect("bus subscriber map poisoned");
                if let Some(topic_senders) = subscribers.get_mut(topic) {
                    topic_senders.retain(|candidate| !candidate.is_closed());
                }
            }
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn connect(&self) -> Result<(), BusError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<mpsc::Receiver<NotificationMessage>, BusError> {
        let (sender, receiver) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let mut subscribers = self.subscribers.lock().map_err(|_| BusError::Subscribe {
            topic: topic.to_owned(),
            reason: "subscriber map poisoned".to_owned(),
        })?;
        subscribers.entry(topic.to_owned()).or_default().push(sender);
        Ok(receiver)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let mut subscribers =
            self.subscribers.lock().map_err(|_| BusError::Disconnect("subscriber map poisoned".to_owned()))?;
        subscribers.clear();
        Ok(())
    }
}

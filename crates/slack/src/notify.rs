use std::sync::Arc;
use std::time::Duration;

use mudlark_core::bus::{notification_topic, BusError, EventBus};
use mudlark_core::events::{ClientType, NotificationMessage, Priority, Recipient};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::ChatApiError;
use crate::credentials::CredentialResolver;
use crate::crier::RecipientFormatter;
use crate::payload;
use crate::pool::ClientPool;

/// Topic segment this pipeline subscribes under; recipients tagged for
/// other platforms are skipped entirely.
const CLIENT_SEGMENT: &str = "slack";

/// Bootstrap failures only. Everything after `start()` succeeds is
/// recovered per recipient and observable through logs alone.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Error)]
enum DeliveryError {
    #[error("no delivery credentials available")]
    NoCredentials,
    #[error("platform reported no usable DM channel")]
    NoChannel,
    #[error(transparent)]
    Api(#[from] ChatApiError),
    #[error("`{method}` timed out after {seconds}s")]
    Timeout { method: &'static str, seconds: u64 },
}

/// Subscribes to the Slack notification topic and fans each envelope out
/// to its recipients, one at a time. Sequential on purpose: it bounds
/// outbound request concurrency and keeps failure logs attributable to a
/// single recipient.
pub struct NotificationService {
    bus: Arc<dyn EventBus>,
    topic: String,
    pipeline: Arc<DeliveryPipeline>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationService {
    pub fn new(
        bus: Arc<dyn EventBus>,
        channel_prefix: &str,
        resolver: CredentialResolver,
        pool: ClientPool,
        formatter: Option<Arc<dyn RecipientFormatter>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            topic: notification_topic(channel_prefix, CLIENT_SEGMENT),
            pipeline: Arc::new(DeliveryPipeline { resolver, pool, formatter, call_timeout }),
            consumer: Mutex::new(None),
        }
    }

    /// Connects the bus, subscribes, and spawns the single consumer task.
    /// Connect or subscribe failure is fatal and propagates; calling
    /// `start` on an already-running service is a logged no-op.
    pub async fn start(&self) -> Result<(), NotifyError> {
        let mut consumer = self.consumer.lock().await;
        if consumer.is_some() {
            warn!(
                event_name = "notify.slack.already_started",
                topic = %self.topic,
                "notification service already started; ignoring"
            );
            return Ok(());
        }

        self.bus.connect().await?;
        let mut receiver = self.bus.subscribe(&self.topic).await?;
        info!(
            event_name = "notify.slack.started",
            topic = %self.topic,
            "notification service listening for game events"
        );

        let pipeline = Arc::clone(&self.pipeline);
        *consumer = Some(tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                pipeline.handle(message).await;
            }
            info!(
                event_name = "notify.slack.stream_closed",
                "notification subscription closed; consumer exiting"
            );
        }));

        Ok(())
    }

    /// Disconnects the bus and waits for the consumer to drain whatever
    /// was already buffered. New events are not processed afterwards.
    pub async fn stop(&self) -> Result<(), NotifyError> {
        self.bus.disconnect().await?;

        let handle = self.consumer.lock().await.take();
        if let Some(handle) = handle {
            if let Err(join_error) = handle.await {
                error!(
                    event_name = "notify.slack.consumer_panicked",
                    error = %join_error,
                    "notification consumer terminated abnormally"
                );
            }
        }

        info!(event_name = "notify.slack.stopped", "notification service stopped");
        Ok(())
    }
}

struct DeliveryPipeline {
    resolver: CredentialResolver,
    pool: ClientPool,
    formatter: Option<Arc<dyn RecipientFormatter>>,
    call_timeout: Duration,
}

impl DeliveryPipeline {
    /// Fans one envelope out to its Slack recipients. Never fails: every
    /// per-recipient error is logged with the recipient's identifiers and
    /// the loop moves on.
    async fn handle(&self, message: NotificationMessage) {
        info!(
            event_name = "notify.slack.message_received",
            kind = %message.kind,
            recipients = message.recipients.len(),
            "received notification"
        );

        for recipient in &message.recipients {
            if recipient.client_type != ClientType::Slack {
                debug!(
                    event_name = "notify.slack.recipient_skipped",
                    client_type = ?recipient.client_type,
                    user_id = %recipient.user_id,
                    "recipient addressed to another platform"
                );
                continue;
            }

            if let Err(reason) = self.deliver(&message, recipient).await {
                error!(
                    event_name = "notify.slack.delivery_failed",
                    kind = %message.kind,
                    team_id = recipient.team_id.as_deref().unwrap_or("unknown"),
                    user_id = %recipient.user_id,
                    error = %reason,
                    "delivery failed; continuing with remaining recipients"
                );
            }
        }
    }

    async fn deliver(
        &self,
        message: &NotificationMessage,
        recipient: &Recipient,
    ) -> Result<(), DeliveryError> {
        let credentials = self
            .resolver
            .resolve(recipient.team_id.as_deref(), &recipient.user_id)
            .await
            .ok_or(DeliveryError::NoCredentials)?;
        let client = self.pool.get_or_create(&credentials.token);

        let channel_id = self
            .bounded("conversations.open", client.open_dm(&recipient.user_id))
            .await?
            .ok_or(DeliveryError::NoChannel)?;

        let (text, blocks) = match self
            .formatter
            .as_ref()
            .and_then(|formatter| formatter.format_recipient(message, recipient))
        {
            Some(formatted) => (formatted.message, formatted.blocks),
            None => (recipient.message.clone(), recipient.blocks.clone()),
        };

        let shaped = payload::shape(&text, blocks.as_deref());

        match &shaped.blocks {
            Some(shaped_blocks) => {
                self.bounded(
                    "chat.postMessage",
                    client.post_message(&channel_id, &shaped.text, Some(shaped_blocks)),
                )
                .await?;
            }
            None if recipient.priority == Some(Priority::High) => {
                // Urgent plain-text events get a minimal block wrapper.
                let wrapper = [high_priority_block(&message.kind, &shaped.text)];
                self.bounded(
                    "chat.postMessage",
                    client.post_message(&channel_id, &shaped.text, Some(&wrapper)),
                )
                .await?;
            }
            None => {
                self.bounded(
                    "chat.postMessage",
                    client.post_message(&channel_id, &shaped.text, None),
                )
                .await?;
            }
        }

        info!(
            event_name = "notify.slack.delivered",
            kind = %message.kind,
            team_id = recipient.team_id.as_deref().unwrap_or("unknown"),
            user_id = %recipient.user_id,
            role = ?recipient.role,
            from_fallback = credentials.from_fallback,
            "notification delivered"
        );
        Ok(())
    }

    /// Applies the per-call timeout so one unresponsive workspace cannot
    /// stall the rest of a fan-out.
    async fn bounded<T>(
        &self,
        method: &'static str,
        call: impl std::future::Future<Output = Result<T, ChatApiError>>,
    ) -> Result<T, DeliveryError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(DeliveryError::from),
            Err(_) => {
                Err(DeliveryError::Timeout { method, seconds: self.call_timeout.as_secs() })
            }
        }
    }
}

fn high_priority_block(kind: &str, text: &str) -> Value {
    json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!("⚔️ *{}*\n\n{text}", kind.to_uppercase())
        }
    })
}

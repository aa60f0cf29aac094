//! Counterparty notification delivery.
//!
//! The lifecycle controller emits `Notify` effects; this module is the
//! delivery boundary. Delivery is best-effort and strictly post-commit: a
//! failed delivery is logged, never rolled back into the transition.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use prbridge_core::{Actor, Notice, OfferId};

/// A notification addressed to one side of an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient_role: Actor,
    pub recipient_id: Uuid,
    pub offer_id: OfferId,
    pub summary: String,
    pub notice: Notice,
}

/// Delivery backend for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Default notifier: writes the notification to the log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        info!(
            recipient = %notification.recipient_role,
            recipient_id = %notification.recipient_id,
            offer_id = %notification.offer_id,
            "notification: {}",
            notification.summary
        );
        Ok(())
    }
}

/// Test notifier that records everything it delivers.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent.write().await.push(notification);
        Ok(())
    }
}

/// Notifier that POSTs each notification as JSON to a configured endpoint
/// (e.g. an internal fan-out service that emails/pushes to the party).
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        for n in 0..3u32 {
            notifier
                .deliver(Notification {
                    recipient_role: Actor::Brand,
                    recipient_id: Uuid::new_v4(),
                    offer_id: OfferId::new(),
                    summary: format!("notice {}", n),
                    notice: Notice::CollaborationUpsell {
                        offer_id: OfferId::new(),
                    },
                })
                .await
                .unwrap();
        }
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].summary, "notice 0");
        assert_eq!(sent[2].summary, "notice 2");
    }
}

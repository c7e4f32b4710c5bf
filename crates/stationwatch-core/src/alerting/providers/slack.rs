//! Slack incoming-webhook provider

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alerting::provider::{NotificationProvider, SLACK};
use crate::error::{Error, Result};
use crate::models::{AlertLevel, AlertMessage};

/// Environment variable holding the webhook URL
pub const WEBHOOK_URL_ENV: &str = "SLACK_WEBHOOK_URL";

/// Posts alerts to a Slack incoming webhook as an attachment
pub struct SlackProvider {
    client: Client,
    webhook_url: Option<String>,
    channel: Option<String>,
}

impl SlackProvider {
    /// Create a provider. `None` leaves the channel configured off.
    pub fn new(webhook_url: Option<String>, channel: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
            channel,
        })
    }

    fn build_payload(&self, message: &AlertMessage) -> SlackPayload {
        let color = match message.level {
            AlertLevel::Critical | AlertLevel::Error => "#dc3545",
            AlertLevel::Warning => "#ffc107",
            AlertLevel::Info => "#17a2b8",
        };

        let severity_emoji = match message.level {
            AlertLevel::Critical | AlertLevel::Error => "🚨",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Info => "ℹ️",
        };

        SlackPayload {
            channel: self.channel.clone(),
            username: Some("StationWatch".to_string()),
            icon_emoji: Some(":fuelpump:".to_string()),
            attachments: vec![SlackAttachment {
                color: color.to_string(),
                title: format!("{} {}", severity_emoji, message.title),
                text: message.message.clone(),
                fields: vec![
                    SlackField {
                        title: "Level".to_string(),
                        value: message.level.to_string(),
                        short: true,
                    },
                    SlackField {
                        title: "Station".to_string(),
                        value: message.tag().to_string(),
                        short: true,
                    },
                ],
                footer: Some("StationWatch".to_string()),
                ts: Some(message.created_at.timestamp()),
            }],
        }
    }

    async fn post(&self, url: &str, message: &AlertMessage) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(&self.build_payload(message))
            .send()
            .await
            .map_err(|e| Error::delivery(SLACK, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::delivery(SLACK, format!("Slack returned {status}: {body}")));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationProvider for SlackProvider {
    fn name(&self) -> &str {
        SLACK
    }

    async fn send(&self, message: &AlertMessage) -> bool {
        let Some(url) = &self.webhook_url else {
            debug!(alert_id = %message.id, "Slack webhook not configured, skipping");
            return false;
        };

        match self.post(url, message).await {
            Ok(()) => {
                info!(alert_id = %message.id, "Slack notification sent");
                true
            }
            Err(e) => {
                warn!(alert_id = %message.id, error = %e, "Slack notification failed");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<String>,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: String,
    title: String,
    text: String,
    fields: Vec<SlackField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

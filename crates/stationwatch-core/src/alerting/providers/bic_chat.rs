//! Chat webhook provider

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alerting::provider::{NotificationProvider, BIC_CHAT};
use crate::error::Result;
use crate::models::{AlertMessage, StationKind};

/// Environment variable holding the webhook URL
pub const WEBHOOK_URL_ENV: &str = "BIC_CHAT_WEBHOOK_URL";

const BALANCE_BOT_NAME: &str = "Balance Bot";
const BALANCE_BOT_ICON: &str = "https://cryptologos.cc/logos/ethereum-eth-logo.svg";
const UNKNOWN_BOT_ICON: &str = "https://cryptologos.cc/logos/arbitrum-arb-logo.svg";

/// Tag used by scheduled status reports
pub const BALANCE_TAG: &str = "balance";

#[derive(Debug, Serialize, PartialEq)]
struct ChatPayload {
    username: String,
    icon_url: String,
    text: String,
}

/// Posts alerts to a chat webhook as markdown
pub struct BicChatProvider {
    client: Client,
    webhook_url: Option<String>,
}

impl BicChatProvider {
    /// Create a provider. `None` (or a blank URL) leaves the channel configured off.
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
        })
    }

    /// Create a provider reading the URL from `BIC_CHAT_WEBHOOK_URL`
    pub fn from_env(timeout: Duration) -> Result<Self> {
        Self::new(std::env::var(WEBHOOK_URL_ENV).ok(), timeout)
    }

    /// Whether a webhook URL is configured
    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn build_payload(message: &AlertMessage) -> ChatPayload {
        let known = message.tag() == BALANCE_TAG
            || StationKind::ALL.iter().any(|k| k.as_str() == message.tag());

        if !known {
            return ChatPayload {
                username: "Unknown".to_string(),
                icon_url: UNKNOWN_BOT_ICON.to_string(),
                text: "Unknown".to_string(),
            };
        }

        ChatPayload {
            username: BALANCE_BOT_NAME.to_string(),
            icon_url: BALANCE_BOT_ICON.to_string(),
            text: message.message.clone(),
        }
    }
}

#[async_trait::async_trait]
impl NotificationProvider for BicChatProvider {
    fn name(&self) -> &str {
        BIC_CHAT
    }

    async fn send(&self, message: &AlertMessage) -> bool {
        let Some(url) = &self.webhook_url else {
            debug!(alert_id = %message.id, "Chat webhook not configured, skipping");
            return false;
        };

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&Self::build_payload(message))
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                let body = res.text().await.unwrap_or_default();
                info!(alert_id = %message.id, response = %body, "Chat notification sent");
                true
            }
            Ok(res) => {
                warn!(alert_id = %message.id, status = %res.status(), "Chat webhook rejected alert");
                false
            }
            Err(e) => {
                warn!(alert_id = %message.id, error = %e, "Chat webhook request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertLevel;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert(tag: &str) -> AlertMessage {
        AlertMessage::new("Monitor Gas Station", "balance is low", AlertLevel::Warning, tag)
    }

    fn provider(url: Option<String>) -> BicChatProvider {
        BicChatProvider::new(url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_payload_for_station_tag() {
        let payload = BicChatProvider::build_payload(&alert("gas"));
        assert_eq!(
            payload,
            ChatPayload {
                username: BALANCE_BOT_NAME.to_string(),
                icon_url: BALANCE_BOT_ICON.to_string(),
                text: "balance is low".to_string(),
            }
        );
    }

    #[test]
    fn test_rendered_template_title_appears_once() {
        let ctx = crate::alerting::MessageContext {
            network: "sepolia".to_string(),
            env: "staging".to_string(),
            time: "-".to_string(),
        };
        let reading = crate::models::BalanceReading::sentinel(crate::models::Address::ZERO);
        let message = crate::alerting::messages::balance_report("Check Gas Balance", &reading, &ctx);

        let payload = BicChatProvider::build_payload(&message);
        assert_eq!(payload.text.matches("Check Gas Balance").count(), 1);
    }

    #[test]
    fn test_payload_for_unknown_tag() {
        let payload = BicChatProvider::build_payload(&alert("deployment"));
        assert_eq!(payload.username, "Unknown");
        assert_eq!(payload.text, "Unknown");
    }

    #[tokio::test]
    async fn test_missing_url_returns_false() {
        let provider = provider(None);
        assert!(!provider.is_configured());
        assert!(!provider.send(&alert("gas")).await);

        let blank = self::provider(Some("   ".to_string()));
        assert!(!blank.is_configured());
    }

    #[tokio::test]
    async fn test_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/abc"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({ "username": BALANCE_BOT_NAME })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(Some(format!("{}/hooks/abc", server.uri())));
        assert!(provider.send(&alert("faucet")).await);
    }

    #[tokio::test]
    async fn test_error_response_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = provider(Some(server.uri()));
        assert!(!provider.send(&alert("faucet")).await);
    }

    #[tokio::test]
    async fn test_timeout_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let provider = BicChatProvider::new(Some(server.uri()), Duration::from_millis(100)).unwrap();
        assert!(!provider.send(&alert("faucet")).await);
    }
}

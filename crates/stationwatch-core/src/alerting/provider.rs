//! Notification provider abstraction

use crate::models::AlertMessage;

/// Registry key of the chat webhook provider
pub const BIC_CHAT: &str = "bic_chat";

/// Registry key of the Slack webhook provider
pub const SLACK: &str = "slack";

/// A named channel that can deliver an alert.
///
/// `send` reports delivery as a boolean and never fails past this boundary:
/// transport errors, non-success responses and a missing endpoint all
/// return `false`. Each call is one independent attempt with no retry.
#[async_trait::async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Stable identifier, used as the registry key
    fn name(&self) -> &str;

    /// Deliver one alert
    async fn send(&self, message: &AlertMessage) -> bool;
}

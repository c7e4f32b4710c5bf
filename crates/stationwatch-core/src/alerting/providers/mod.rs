//! Concrete notification providers

mod bic_chat;
mod slack;

pub use bic_chat::{BicChatProvider, BALANCE_TAG};
pub use slack::SlackProvider;

/// Environment variables consulted for webhook URLs
pub mod env {
    pub use super::bic_chat::WEBHOOK_URL_ENV as BIC_CHAT_WEBHOOK_URL;
    pub use super::slack::WEBHOOK_URL_ENV as SLACK_WEBHOOK_URL;
}

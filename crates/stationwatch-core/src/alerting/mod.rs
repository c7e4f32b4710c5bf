//! Alerting for StationWatch
//!
//! Capacity evaluation, message templates, notification providers and the
//! dispatcher that fans an alert out to them.

pub mod evaluator;
pub mod messages;
pub mod providers;

mod dispatcher;
mod provider;
mod registry;

pub use dispatcher::{AlertDispatcher, DispatchOutcome};
pub use evaluator::evaluate;
pub use messages::MessageContext;
pub use provider::{NotificationProvider, BIC_CHAT, SLACK};
pub use providers::{BicChatProvider, SlackProvider};
pub use registry::ProviderRegistry;

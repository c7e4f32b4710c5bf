//! Alert fan-out to notification providers

use futures::future::join_all;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::models::AlertMessage;

use super::provider::{NotificationProvider, BIC_CHAT};
use super::registry::ProviderRegistry;

/// Per-provider delivery outcome of one dispatch
pub type DispatchOutcome = BTreeMap<String, bool>;

/// Sends one alert to several providers concurrently.
///
/// Every target gets exactly one attempt. Failures (unknown name, `false`
/// from the provider, a panicking provider) are recorded as `false` for that
/// target and never affect the others. The call returns once every target
/// has settled; a hung channel is bounded by its own client timeout.
pub struct AlertDispatcher {
    registry: Arc<ProviderRegistry>,
    default_targets: Vec<String>,
    broadcast: bool,
}

impl AlertDispatcher {
    /// Create a dispatcher targeting the built-in chat channel by default
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            default_targets: vec![BIC_CHAT.to_string()],
            broadcast: false,
        }
    }

    /// Override the default target list used by [`AlertDispatcher::dispatch`]
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        if !targets.is_empty() {
            self.default_targets = targets;
        }
        self
    }

    /// Make [`AlertDispatcher::dispatch`] send to every registered provider
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// The underlying registry
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Dispatch using the configured selection (broadcast or default targets)
    pub async fn dispatch(&self, message: &AlertMessage) -> DispatchOutcome {
        if self.broadcast {
            self.broadcast(message).await
        } else {
            self.send(message, &self.default_targets).await
        }
    }

    /// Send to the named providers
    pub async fn send<S: AsRef<str>>(&self, message: &AlertMessage, names: &[S]) -> DispatchOutcome {
        let attempts = names.iter().map(|name| {
            let name = name.as_ref();
            async move {
                match self.registry.resolve(name) {
                    Ok(provider) => (name.to_string(), deliver(provider, message).await),
                    Err(e) => {
                        warn!(alert_id = %message.id, provider = name, error = %e, "Skipping target");
                        (name.to_string(), false)
                    }
                }
            }
        });

        let outcome: DispatchOutcome = join_all(attempts).await.into_iter().collect();
        log_outcome(message, &outcome);
        outcome
    }

    /// Send to every registered provider
    pub async fn broadcast(&self, message: &AlertMessage) -> DispatchOutcome {
        let attempts = self.registry.all().into_iter().map(|provider| async move {
            let name = provider.name().to_string();
            (name, deliver(provider, message).await)
        });

        let outcome: DispatchOutcome = join_all(attempts).await.into_iter().collect();
        log_outcome(message, &outcome);
        outcome
    }
}

async fn deliver(provider: Arc<dyn NotificationProvider>, message: &AlertMessage) -> bool {
    debug!(alert_id = %message.id, provider = provider.name(), "Delivering alert");

    match AssertUnwindSafe(provider.send(message)).catch_unwind().await {
        Ok(delivered) => delivered,
        Err(_) => {
            error!(alert_id = %message.id, provider = provider.name(), "Provider panicked during send");
            false
        }
    }
}

fn log_outcome(message: &AlertMessage, outcome: &DispatchOutcome) {
    let delivered = outcome.values().filter(|ok| **ok).count();
    info!(
        alert_id = %message.id,
        title = %message.title,
        delivered,
        targets = outcome.len(),
        "Alert dispatched"
    );
}

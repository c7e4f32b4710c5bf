//! Startup wiring
//!
//! Builds the provider registry, dispatcher, monitors and scheduler from a
//! [`Config`]. Nothing here runs at import time; the binary and the
//! integration tests both go through [`App`].

use std::sync::Arc;
use tracing::{info, warn};

use crate::alerting::{AlertDispatcher, BicChatProvider, NotificationProvider, ProviderRegistry, SlackProvider};
use crate::chain::RpcClient;
use crate::config::{Config, ProvidersConfig, ScheduleConfig};
use crate::error::Result;
use crate::models::StationKind;
use crate::monitor::{ChainHandles, Deployment, StationMonitor, StatusReporter};
use crate::scheduler::Scheduler;

/// Build the registry from the provider configuration.
///
/// Both built-in providers are always registered; one without a webhook URL
/// is registered in its configured-off state and reports `false` on send.
pub fn build_registry(config: &ProvidersConfig) -> Result<ProviderRegistry> {
    let bic_chat = BicChatProvider::new(config.bic_chat_webhook_url.clone(), config.timeout)?;
    let slack = SlackProvider::new(
        config.slack_webhook_url.clone(),
        config.slack_channel.clone(),
        config.timeout,
    )?;

    Ok(ProviderRegistry::with_providers([
        Arc::new(bic_chat) as Arc<dyn NotificationProvider>,
        Arc::new(slack) as Arc<dyn NotificationProvider>,
    ]))
}

/// Fully wired application
pub struct App {
    monitors: Vec<Arc<StationMonitor>>,
    reporter: Arc<StatusReporter>,
    dispatcher: Arc<AlertDispatcher>,
    schedule: ScheduleConfig,
}

impl App {
    /// Wire everything against the configured RPC endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        let rpc = RpcClient::new(config.rpc.url.clone(), config.rpc.timeout)?;
        Self::with_chain(config, ChainHandles::from_rpc(Arc::new(rpc)))
    }

    /// Wire everything against the given chain collaborators
    pub fn with_chain(config: &Config, chain: ChainHandles) -> Result<Self> {
        for warning in config.warnings() {
            warn!("{warning}");
        }

        let registry = Arc::new(build_registry(&config.providers)?);
        let dispatcher = Arc::new(
            AlertDispatcher::new(registry)
                .with_targets(config.providers.targets.clone())
                .with_broadcast(config.providers.broadcast),
        );

        let deployment = Deployment {
            network: config.rpc.network_name.clone(),
            env: config.rpc.env.clone(),
        };

        let monitors = config
            .stations()
            .into_iter()
            .map(|station| {
                Arc::new(StationMonitor::new(
                    station,
                    chain.clone(),
                    dispatcher.clone(),
                    deployment.clone(),
                ))
            })
            .collect();

        let reporter = Arc::new(StatusReporter::new(
            config.status_stations(),
            chain,
            dispatcher.clone(),
            deployment,
        ));

        Ok(Self {
            monitors,
            reporter,
            dispatcher,
            schedule: config.schedule.clone(),
        })
    }

    /// Monitors for every configured station
    pub fn monitors(&self) -> &[Arc<StationMonitor>] {
        &self.monitors
    }

    /// Monitor for one station, if configured
    pub fn monitor(&self, kind: StationKind) -> Option<&Arc<StationMonitor>> {
        self.monitors.iter().find(|m| m.kind() == kind)
    }

    /// The full-status reporter
    pub fn reporter(&self) -> &Arc<StatusReporter> {
        &self.reporter
    }

    /// The shared dispatcher
    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    /// Scheduler with one threshold job per station and the status job
    pub fn scheduler(&self) -> Scheduler {
        let mut scheduler = Scheduler::new();

        for monitor in &self.monitors {
            let monitor = monitor.clone();
            let name = format!("Monitor {} station", monitor.kind());
            scheduler.every(name, self.schedule.monitor_every, move || {
                let monitor = monitor.clone();
                async move {
                    monitor.run_cycle().await;
                }
            });
        }

        let reporter = self.reporter.clone();
        scheduler.every_delayed("Check Balance", self.schedule.status_every, move || {
            let reporter = reporter.clone();
            async move {
                reporter.run_cycle().await;
            }
        });

        info!(
            stations = self.monitors.len(),
            providers = ?self.dispatcher.registry().names(),
            "Application wired"
        );
        scheduler
    }
}

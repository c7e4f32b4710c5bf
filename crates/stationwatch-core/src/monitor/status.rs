//! Scheduled full-status report

use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::alerting::{messages, AlertDispatcher};
use crate::models::{Address, AlertMessage, StationConfig};

use super::{ChainHandles, CycleReport, Delivery, Deployment, SubjectOutcome};

/// Reports every configured balance and deposit unconditionally.
///
/// Runs on its own (typically daily) cadence for passive auditing; one
/// informational message per operator, regardless of thresholds.
pub struct StatusReporter {
    stations: Vec<StationConfig>,
    chain: ChainHandles,
    dispatcher: Arc<AlertDispatcher>,
    deployment: Deployment,
}

impl StatusReporter {
    /// Create a reporter over `stations`
    pub fn new(
        stations: Vec<StationConfig>,
        chain: ChainHandles,
        dispatcher: Arc<AlertDispatcher>,
        deployment: Deployment,
    ) -> Self {
        Self {
            stations,
            chain,
            dispatcher,
            deployment,
        }
    }

    /// Stations covered by the report
    pub fn stations(&self) -> &[StationConfig] {
        &self.stations
    }

    /// Run one report now
    pub async fn run_cycle(&self) -> CycleReport {
        debug!(stations = self.stations.len(), "Check Balance");

        let reports = self.stations.iter().flat_map(|station| {
            station.operators.iter().map(move |operator| async move {
                match AssertUnwindSafe(self.report_operator(station, operator))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!(station = %station.kind, operator = %operator, "Status report panicked");
                        SubjectOutcome::Skipped
                    }
                }
            })
        });

        let report: CycleReport = join_all(reports).await.into_iter().collect();
        info!(
            reported = report.alerted(),
            skipped = report.skipped,
            "Status report finished"
        );
        report
    }

    async fn report_operator(&self, station: &StationConfig, operator: &Address) -> SubjectOutcome {
        let ctx = self.deployment.context();

        let alert: AlertMessage = match &station.entrypoint {
            Some(entrypoint) => match self.chain.deposits.read(entrypoint, operator).await {
                Ok(deposit) => messages::deposit_report(entrypoint, operator, &deposit, &ctx),
                Err(e) => {
                    error!(station = %station.kind, paymaster = %operator, error = %e, "Deposit read failed, reporting as empty");
                    messages::deposit_report(entrypoint, operator, &Default::default(), &ctx)
                }
            },
            None => {
                let reading = self
                    .chain
                    .balances
                    .read(operator, station.monitored_token.as_ref())
                    .await;
                let title = format!("Check {} Balance", station.kind.title());
                messages::balance_report(&title, &reading, &ctx)
            }
        };

        let outcome = self.dispatcher.dispatch(&alert).await;
        SubjectOutcome::Alerted(Delivery {
            subject: *operator,
            title: alert.title,
            outcome,
        })
    }
}

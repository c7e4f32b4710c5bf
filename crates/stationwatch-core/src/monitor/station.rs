//! Threshold cycle for one station

use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::alerting::{evaluate, messages, AlertDispatcher};
use crate::error::Result;
use crate::models::{Address, AlertMessage, StationConfig, StationKind, U256};

use super::{ChainHandles, CycleReport, Delivery, Deployment, SubjectOutcome};

/// Runs evaluation cycles for one station.
///
/// Silent unless an operator is at or below the emergency band: each
/// triggering operator produces exactly one dispatch per cycle. Cycles are
/// not serialized; if the scheduler fires again before a slow cycle has
/// finished, both run.
pub struct StationMonitor {
    station: StationConfig,
    chain: ChainHandles,
    dispatcher: Arc<AlertDispatcher>,
    deployment: Deployment,
}

impl StationMonitor {
    /// Create a monitor for `station`
    pub fn new(
        station: StationConfig,
        chain: ChainHandles,
        dispatcher: Arc<AlertDispatcher>,
        deployment: Deployment,
    ) -> Self {
        Self {
            station,
            chain,
            dispatcher,
            deployment,
        }
    }

    /// Which station this monitor watches
    pub fn kind(&self) -> StationKind {
        self.station.kind
    }

    /// The station configuration
    pub fn station(&self) -> &StationConfig {
        &self.station
    }

    /// Run one cycle now
    pub async fn run_cycle(&self) -> CycleReport {
        let kind = self.station.kind;
        let operator_count = self.station.operators.len();
        debug!(station = %kind, operators = operator_count, "Monitor {} Station", kind.title());

        let unit_cost = match self.resolve_unit_cost().await {
            Ok(cost) => cost,
            Err(e) => {
                error!(station = %kind, error = %e, "Skipping cycle");
                return CycleReport::skip_all(operator_count);
            }
        };

        let checks = self.station.operators.iter().map(|operator| async move {
            match AssertUnwindSafe(self.check_operator(operator, unit_cost))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(station = %kind, operator = %operator, "Operator check panicked");
                    SubjectOutcome::Skipped
                }
            }
        });

        let report: CycleReport = join_all(checks).await.into_iter().collect();

        if report.alerted() > 0 || report.skipped > 0 {
            info!(
                station = %kind,
                evaluated = report.evaluated,
                alerted = report.alerted(),
                skipped = report.skipped,
                "Cycle finished"
            );
        }
        report
    }

    /// Resolve the unit cost for this cycle, fetching the gas price when needed
    async fn resolve_unit_cost(&self) -> Result<U256> {
        self.station.validate_bounds()?;

        let gas_price = if self.station.unit_cost.needs_gas_price() {
            Some(self.chain.gas.gas_price().await?)
        } else {
            None
        };

        self.station.unit_cost.resolve(gas_price)
    }

    async fn check_operator(&self, operator: &Address, unit_cost: U256) -> SubjectOutcome {
        let kind = self.station.kind;

        let (reading, deposit) = match &self.station.entrypoint {
            Some(entrypoint) => {
                let deposit = match self.chain.deposits.read(entrypoint, operator).await {
                    Ok(info) => info,
                    Err(e) => {
                        error!(station = %kind, paymaster = %operator, error = %e, "Deposit read failed, evaluating as empty");
                        Default::default()
                    }
                };
                (deposit.as_reading(*operator), Some(deposit))
            }
            None => {
                let token = self.station.monitored_token.as_ref();
                (self.chain.balances.read(operator, token).await, None)
            }
        };

        let verdict = match evaluate(&reading, unit_cost, self.station.threshold, self.station.emergency) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(station = %kind, operator = %operator, error = %e, "Skipping operator");
                return SubjectOutcome::Skipped;
            }
        };

        debug!(
            station = %kind,
            operator = %operator,
            balance = %reading.formatted(),
            operations = %verdict.operations_remaining,
            bound = %verdict.trigger_bound,
            triggered = verdict.triggered,
            "Evaluated operator"
        );

        if !verdict.triggered {
            return SubjectOutcome::Quiet;
        }

        let ctx = self.deployment.context();
        let alert: AlertMessage = match (&self.station.entrypoint, &deposit) {
            (Some(entrypoint), Some(deposit)) => messages::deposit_alert(
                &self.station,
                entrypoint,
                operator,
                deposit,
                &verdict,
                unit_cost,
                &ctx,
            ),
            _ => messages::threshold_alert(&self.station, &reading, &verdict, unit_cost, &ctx),
        };

        warn!(
            station = %kind,
            operator = %operator,
            operations = %verdict.operations_remaining,
            alert_id = %alert.id,
            "Emergency band reached"
        );

        let outcome = self.dispatcher.dispatch(&alert).await;
        SubjectOutcome::Alerted(Delivery {
            subject: *operator,
            title: alert.title,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitCost;
    use crate::monitor::testing::{recording_dispatcher, FakeChain};
    use alloy_primitives::address;
    use std::time::{Duration, Instant};

    const A: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    const C: Address = address!("cccccccccccccccccccccccccccccccccccccccc");

    fn faucet(operators: &[Address]) -> StationConfig {
        StationConfig {
            kind: StationKind::Faucet,
            operators: operators.to_vec(),
            monitored_token: Some(address!("2222222222222222222222222222222222222222")),
            unit_cost: UnitCost::Fixed { amount: U256::from(100) },
            threshold: 80,
            emergency: 20,
            entrypoint: None,
        }
    }

    fn monitor(station: StationConfig, chain: FakeChain) -> (StationMonitor, Arc<crate::monitor::testing::RecordingProvider>) {
        let (dispatcher, recorder) = recording_dispatcher();
        let monitor = StationMonitor::new(station, chain.handles(), dispatcher, Deployment::default());
        (monitor, recorder)
    }

    #[tokio::test]
    async fn test_only_triggering_operators_alert() {
        let chain = FakeChain::default().balance(A, 2000).balance(B, 1500);
        let (monitor, recorder) = monitor(faucet(&[A, B]), chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.evaluated, 2);
        assert_eq!(report.alerted(), 1);
        assert_eq!(report.deliveries[0].subject, B);
        assert_eq!(report.deliveries[0].outcome["bic_chat"], true);

        let sent = recorder.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Monitor Faucet Station");
        assert_eq!(sent[0].tag(), "faucet");
    }

    #[tokio::test]
    async fn test_quiet_cycle_sends_nothing() {
        let chain = FakeChain::default().balance(A, 10_000).balance(B, 5_000);
        let (monitor, recorder) = monitor(faucet(&[A, B]), chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.evaluated, 2);
        assert_eq!(report.alerted(), 0);
        assert!(recorder.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_fails_loud() {
        // no balance registered for A: the reader returns the sentinel
        let (monitor, recorder) = monitor(faucet(&[A]), FakeChain::default());

        let report = monitor.run_cycle().await;

        assert_eq!(report.alerted(), 1);
        assert_eq!(recorder.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_operator_does_not_block_others() {
        let chain = FakeChain::default()
            .slow_balance(A, 0, Duration::from_millis(300))
            .balance(B, 0);
        let (monitor, recorder) = monitor(faucet(&[A, B]), chain);

        let started = Instant::now();
        let report = monitor.run_cycle().await;

        assert_eq!(report.alerted(), 2);
        assert!(started.elapsed() < Duration::from_millis(600));
        // B finished first even though it is listed second
        let sent = recorder.sent.lock();
        assert!(sent[0].message.contains(&B.to_string()));
    }

    #[tokio::test]
    async fn test_panicking_operator_is_contained() {
        let chain = FakeChain::default().panics_for(A).balance(B, 0).balance(C, 50_000);
        let (monitor, recorder) = monitor(faucet(&[A, B, C]), chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.alerted(), 1);
        assert_eq!(recorder.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_unit_cost_skips_operators() {
        let mut station = faucet(&[A, B]);
        station.unit_cost = UnitCost::Fixed { amount: U256::ZERO };
        let chain = FakeChain::default().balance(A, 0).balance(B, 0);
        let (monitor, recorder) = monitor(station, chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.skipped, 2);
        assert_eq!(report.alerted(), 0);
        assert!(recorder.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_skips_cycle() {
        let mut station = faucet(&[A]);
        station.threshold = 150;
        let (monitor, recorder) = monitor(station, FakeChain::default().balance(A, 0));

        let report = monitor.run_cycle().await;

        assert_eq!(report.skipped, 1);
        assert!(recorder.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_gas_station_uses_gas_price() {
        let station = StationConfig {
            kind: StationKind::Gas,
            operators: vec![A, B],
            monitored_token: None,
            unit_cost: UnitCost::Gas { gas_limit: 100_000 },
            threshold: 50,
            emergency: 50,
            entrypoint: None,
        };
        // unit cost = 1e5 * 1e9 = 1e14; bound = 25 ops
        let chain = FakeChain::default()
            .gas_price(1_000_000_000)
            .balance(A, 25 * 100_000_000_000_000)
            .balance(B, 26 * 100_000_000_000_000);
        let (monitor, recorder) = monitor(station, chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.alerted(), 1);
        assert_eq!(report.deliveries[0].subject, A);
        assert!(recorder.sent.lock()[0].message.contains("native balance"));
    }

    #[tokio::test]
    async fn test_missing_gas_price_skips_cycle() {
        let station = StationConfig {
            kind: StationKind::Redeem,
            operators: vec![A],
            monitored_token: None,
            unit_cost: UnitCost::Gas { gas_limit: 100_000 },
            threshold: 50,
            emergency: 50,
            entrypoint: None,
        };
        let (monitor, recorder) = monitor(station, FakeChain::default().balance(A, 0));

        let report = monitor.run_cycle().await;

        assert_eq!(report.skipped, 1);
        assert!(recorder.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_paymaster_deposit_station() {
        let station = StationConfig {
            kind: StationKind::Paymaster,
            operators: vec![A],
            monitored_token: None,
            unit_cost: UnitCost::Gas { gas_limit: 10 },
            threshold: 100,
            emergency: 10,
            entrypoint: Some(C),
        };
        // unit cost 10 * 1 = 10; deposit 100 -> 10 ops; bound 10
        let chain = FakeChain::default().gas_price(1).deposit(A, 100);
        let (monitor, recorder) = monitor(station, chain);

        let report = monitor.run_cycle().await;

        assert_eq!(report.alerted(), 1);
        let sent = recorder.sent.lock();
        assert_eq!(sent[0].title, "Monitor Paymaster Station");
        assert!(sent[0].message.contains(&format!("in entrypoint {C}")));
    }

    #[tokio::test]
    async fn test_failed_deposit_read_fails_loud() {
        let station = StationConfig {
            kind: StationKind::Paymaster,
            operators: vec![A],
            monitored_token: None,
            unit_cost: UnitCost::Gas { gas_limit: 10 },
            threshold: 0,
            emergency: 0,
            entrypoint: Some(C),
        };
        let (monitor, recorder) = monitor(station, FakeChain::default().gas_price(1));

        let report = monitor.run_cycle().await;

        assert_eq!(report.alerted(), 1);
        assert_eq!(recorder.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        let (monitor, _recorder) = monitor(faucet(&[A]), FakeChain::default().balance(A, 0));
        assert_send(monitor.run_cycle());
    }
}

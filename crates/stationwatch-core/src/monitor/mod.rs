//! Station monitoring cycles
//!
//! A [`StationMonitor`] runs the threshold check for one station; a
//! [`StatusReporter`] runs the scheduled full-status report. Both fan out over
//! operators concurrently and contain every failure at the operator it
//! happened on.

mod station;
mod status;

pub use station::StationMonitor;
pub use status::StatusReporter;

use std::sync::Arc;

use crate::alerting::{DispatchOutcome, MessageContext};
use crate::chain::{BalanceReader, DepositReader, GasPriceOracle, RpcClient};
use crate::models::Address;

/// Handles to the read-only chain collaborators
#[derive(Clone)]
pub struct ChainHandles {
    /// Balance reader
    pub balances: Arc<dyn BalanceReader>,
    /// EntryPoint deposit reader
    pub deposits: Arc<dyn DepositReader>,
    /// Gas price source
    pub gas: Arc<dyn GasPriceOracle>,
}

impl ChainHandles {
    /// Use one RPC client for every collaborator
    pub fn from_rpc(client: Arc<RpcClient>) -> Self {
        Self {
            balances: client.clone(),
            deposits: client.clone(),
            gas: client,
        }
    }
}

/// Network and environment labels printed in messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployment {
    /// Network name
    pub network: String,
    /// Environment label
    pub env: String,
}

impl Deployment {
    pub(crate) fn context(&self) -> MessageContext {
        MessageContext::now(&self.network, &self.env)
    }
}

/// One alert handed to the dispatcher during a cycle
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Operator or paymaster the alert is about
    pub subject: Address,
    /// Alert title
    pub title: String,
    /// Per-provider outcome
    pub outcome: DispatchOutcome,
}

/// Summary of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Subjects that were read and evaluated
    pub evaluated: usize,
    /// Subjects skipped (invalid configuration, unresolvable cost, panic)
    pub skipped: usize,
    /// Alerts dispatched, one per triggering subject
    pub deliveries: Vec<Delivery>,
}

impl CycleReport {
    /// Number of alerts dispatched
    pub fn alerted(&self) -> usize {
        self.deliveries.len()
    }

    fn skip_all(count: usize) -> Self {
        Self {
            skipped: count,
            ..Self::default()
        }
    }
}

/// Per-subject result, folded into a [`CycleReport`]
enum SubjectOutcome {
    Quiet,
    Alerted(Delivery),
    Skipped,
}

impl FromIterator<SubjectOutcome> for CycleReport {
    fn from_iter<I: IntoIterator<Item = SubjectOutcome>>(iter: I) -> Self {
        let mut report = CycleReport::default();
        for outcome in iter {
            match outcome {
                SubjectOutcome::Quiet => report.evaluated += 1,
                SubjectOutcome::Alerted(delivery) => {
                    report.evaluated += 1;
                    report.deliveries.push(delivery);
                }
                SubjectOutcome::Skipped => report.skipped += 1,
            }
        }
        report
    }
}

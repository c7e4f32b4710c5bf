//! # StationWatch
//!
//! Balance and deposit monitor for automated funding accounts.
//!
//! StationWatch samples on-chain balances of operator accounts and the
//! EntryPoint deposit of a paymaster, converts each into the number of
//! operations it can still pay for, and pages operators through one or more
//! notification channels before the account runs dry.
//!
//! ## Architecture
//!
//! - **Chain**: read-only JSON-RPC access to balances, deposits and gas price
//! - **Alerting**: capacity evaluation, provider registry and alert dispatch
//! - **Monitor**: per-station threshold cycles and the full-status report
//! - **Scheduler**: interval jobs driving the monitors
//!
//! ## Quick Start
//!
//! ```bash
//! # Run every station on its cadence
//! BIC_CHAT_WEBHOOK_URL=https://chat.example/hooks/abc stationwatch --config stationwatch.toml run
//!
//! # Run one check now
//! stationwatch --config stationwatch.toml check --station faucet
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod app;
pub mod chain;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod scheduler;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::app::App;
    pub use crate::alerting::{AlertDispatcher, NotificationProvider, ProviderRegistry};
    pub use crate::chain::{BalanceReader, DepositReader, GasPriceOracle, RpcClient};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::monitor::{ChainHandles, Deployment, StationMonitor, StatusReporter};
    pub use crate::scheduler::Scheduler;
}

//! Read-only access to on-chain state
//!
//! The monitors only depend on the traits here. [`RpcClient`] implements all
//! three against a JSON-RPC endpoint.

mod rpc;
mod units;

pub use rpc::RpcClient;
pub use units::format_units;

use crate::error::Result;
use crate::models::{Address, BalanceReading, DepositInfo, U256};

/// Reads account balances
#[async_trait::async_trait]
pub trait BalanceReader: Send + Sync {
    /// Read the balance of `owner`, in `token` when given, native currency otherwise.
    ///
    /// Never fails: non-contract tokens, undecodable responses and transport
    /// errors all yield [`BalanceReading::sentinel`].
    async fn read(&self, owner: &Address, token: Option<&Address>) -> BalanceReading;
}

/// Reads a paymaster's deposit record from an EntryPoint
#[async_trait::async_trait]
pub trait DepositReader: Send + Sync {
    /// Read the deposit of `paymaster` held by `entrypoint`
    async fn read(&self, entrypoint: &Address, paymaster: &Address) -> Result<DepositInfo>;
}

/// Supplies the current gas price
#[async_trait::async_trait]
pub trait GasPriceOracle: Send + Sync {
    /// Current gas price in wei
    async fn gas_price(&self) -> Result<U256>;
}

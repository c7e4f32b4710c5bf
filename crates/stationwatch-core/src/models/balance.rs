//! Balance and deposit readings

use serde::{Deserialize, Serialize};

use super::{Address, U256};

/// Symbol reported when a read fails or the balance is native currency
pub const NATIVE_SYMBOL: &str = "ETH";

/// Decimals of the native currency
pub const NATIVE_DECIMALS: u8 = 18;

/// One balance observation for one operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReading {
    /// The account that was read
    pub operator: Address,
    /// Token symbol (native symbol for native balances)
    pub symbol: String,
    /// Token decimals
    pub decimals: u8,
    /// Balance in the smallest unit
    pub raw_balance: U256,
}

impl BalanceReading {
    /// The zero-value failure sentinel
    pub fn sentinel(operator: Address) -> Self {
        Self {
            operator,
            symbol: NATIVE_SYMBOL.to_string(),
            decimals: NATIVE_DECIMALS,
            raw_balance: U256::ZERO,
        }
    }

    /// A native currency reading
    pub fn native(operator: Address, raw_balance: U256) -> Self {
        Self {
            raw_balance,
            ..Self::sentinel(operator)
        }
    }

    /// Whether this reading has the same shape as the failure sentinel
    pub fn is_sentinel(&self) -> bool {
        self.raw_balance.is_zero() && self.symbol == NATIVE_SYMBOL
    }

    /// Human readable balance, e.g. `1.5`
    pub fn formatted(&self) -> String {
        crate::chain::format_units(self.raw_balance, self.decimals)
    }
}

/// EntryPoint deposit record of a paymaster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositInfo {
    /// Deposit available to pay for operations (wei)
    pub deposit: U256,
    /// Whether the paymaster is staked
    pub staked: bool,
    /// Locked stake (wei)
    pub stake: U256,
    /// Unstake delay in seconds
    pub unstake_delay_sec: u64,
    /// Unix timestamp after which stake can be withdrawn, 0 if never unlocked
    pub withdraw_time: u64,
}

impl DepositInfo {
    /// View the deposit as a native balance of `paymaster`
    pub fn as_reading(&self, paymaster: Address) -> BalanceReading {
        BalanceReading::native(paymaster, self.deposit)
    }
}

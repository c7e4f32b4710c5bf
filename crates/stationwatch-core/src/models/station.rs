//! Station definitions and capacity verdicts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::{Address, U256};

/// Kind of monitored station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    /// Faucet operators paying out a fixed token amount
    Faucet,
    /// Bonus operators paying out a fixed token amount
    Bonus,
    /// Redeem operators paying gas per redemption
    Redeem,
    /// Native gas balance of every operator
    Gas,
    /// Paymaster deposit held by the EntryPoint
    Paymaster,
}

impl StationKind {
    /// All kinds in scheduling order
    pub const ALL: [StationKind; 5] = [
        StationKind::Gas,
        StationKind::Faucet,
        StationKind::Bonus,
        StationKind::Redeem,
        StationKind::Paymaster,
    ];

    /// Stable key, also used as the alert tag
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Faucet => "faucet",
            StationKind::Bonus => "bonus",
            StationKind::Redeem => "redeem",
            StationKind::Gas => "gas",
            StationKind::Paymaster => "paymaster",
        }
    }

    /// Capitalised name for message titles
    pub fn title(&self) -> &'static str {
        match self {
            StationKind::Faucet => "Faucet",
            StationKind::Bonus => "Bonus",
            StationKind::Redeem => "Redeem",
            StationKind::Gas => "Gas",
            StationKind::Paymaster => "Paymaster",
        }
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "faucet" => Ok(StationKind::Faucet),
            "bonus" => Ok(StationKind::Bonus),
            "redeem" => Ok(StationKind::Redeem),
            "gas" => Ok(StationKind::Gas),
            "paymaster" => Ok(StationKind::Paymaster),
            other => Err(Error::config(format!("unknown station kind '{other}'"))),
        }
    }
}

/// How much one operation costs, in the smallest unit of the monitored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitCost {
    /// Fixed token amount per operation
    Fixed {
        /// Token amount in the smallest unit
        amount: U256,
    },
    /// `gas_limit` multiplied by the gas price at evaluation time
    Gas {
        /// Gas used by one operation
        gas_limit: u64,
    },
}

impl UnitCost {
    /// Whether resolving this cost requires a gas price
    pub fn needs_gas_price(&self) -> bool {
        matches!(self, UnitCost::Gas { .. })
    }

    /// Resolve to an integer cost. `gas_price` is ignored for fixed costs.
    pub fn resolve(&self, gas_price: Option<U256>) -> Result<U256> {
        match *self {
            UnitCost::Fixed { amount } => Ok(amount),
            UnitCost::Gas { gas_limit } => {
                let price = gas_price.ok_or_else(|| {
                    Error::data_unavailable("gas price is required to resolve unit cost")
                })?;
                Ok(U256::from(gas_limit).saturating_mul(price))
            }
        }
    }
}

/// Immutable per-station configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Which station this is
    pub kind: StationKind,
    /// Monitored accounts
    pub operators: Vec<Address>,
    /// Token to read, `None` for native currency
    pub monitored_token: Option<Address>,
    /// Cost model for one operation
    pub unit_cost: UnitCost,
    /// Warning band, in operations
    pub threshold: u32,
    /// Percent of the warning band considered critical
    pub emergency: u32,
    /// EntryPoint holding the deposit, set for deposit-style stations
    pub entrypoint: Option<Address>,
}

impl StationConfig {
    /// Whether operators are read as EntryPoint deposits rather than balances
    pub fn is_deposit_station(&self) -> bool {
        self.entrypoint.is_some()
    }

    /// Both percentages must lie in `0..=100`
    pub fn validate_bounds(&self) -> Result<()> {
        if self.threshold > 100 || self.emergency > 100 {
            return Err(Error::invalid_configuration(format!(
                "{} station: threshold ({}) and emergency ({}) must be within 0..=100",
                self.kind, self.threshold, self.emergency
            )));
        }
        Ok(())
    }

    /// Whether `emergency <= threshold`. An inverted pair still evaluates.
    pub fn is_ordered(&self) -> bool {
        self.emergency <= self.threshold
    }
}

/// Result of evaluating one reading against a station's policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityVerdict {
    /// `floor(raw_balance / unit_cost)`
    pub operations_remaining: U256,
    /// `floor(emergency * threshold / 100)`
    pub trigger_bound: U256,
    /// `operations_remaining <= trigger_bound`
    pub triggered: bool,
}

//! Data models for StationWatch

mod alert;
mod balance;
mod station;

pub use alert::*;
pub use balance::*;
pub use station::*;

pub use alloy_primitives::{Address, U256};

//! Markdown message templates

use chrono::{DateTime, Utc};

use crate::chain::format_units;
use crate::models::{
    Address, AlertLevel, AlertMessage, BalanceReading, CapacityVerdict, DepositInfo,
    StationConfig, StationKind, UnitCost, NATIVE_DECIMALS, NATIVE_SYMBOL, U256,
};

use super::providers::BALANCE_TAG;

/// Deployment details printed in every message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    /// Network name, e.g. `arbitrum-sepolia`
    pub network: String,
    /// Environment label, e.g. `production`
    pub env: String,
    /// Rendered timestamp
    pub time: String,
}

impl MessageContext {
    /// Context stamped with the current time
    pub fn now(network: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            env: env.into(),
            time: format_time(Utc::now()),
        }
    }
}

/// `Aug 26, 2024, 01:11 PM`
pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%b %d, %Y, %I:%M %p UTC").to_string()
}

fn format_unix(secs: u64) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map_or_else(|| secs.to_string(), format_time)
}

struct Table(Vec<(String, String)>);

impl Table {
    fn new(ctx: &MessageContext) -> Self {
        Self(vec![
            ("ENV".to_string(), ctx.env.clone()),
            ("Network".to_string(), ctx.network.clone()),
            ("Time".to_string(), ctx.time.clone()),
        ])
    }

    fn row(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    fn render(&self) -> String {
        let mut out = String::from("| Detail | Value |\n|--------|-------|\n");
        for (key, value) in &self.0 {
            out.push_str(&format!("| {key} | {value} |\n"));
        }
        out
    }
}

fn threshold_sentence(station: &StationConfig) -> String {
    format!(
        "below {}% of threshold {}",
        station.emergency, station.threshold
    )
}

fn cost_row(table: Table, station: &StationConfig, unit_cost: U256) -> Table {
    match station.unit_cost {
        UnitCost::Fixed { amount } => table.row(&format!("{} Amount", station.kind.title()), amount),
        UnitCost::Gas { gas_limit } => table.row("Gas Limit", gas_limit).row("Unit Cost (wei)", unit_cost),
    }
}

/// Alert for an operator balance that crossed its station's emergency band
pub fn threshold_alert(
    station: &StationConfig,
    reading: &BalanceReading,
    verdict: &CapacityVerdict,
    unit_cost: U256,
    ctx: &MessageContext,
) -> AlertMessage {
    let asset = match &station.monitored_token {
        Some(token) if !token.is_zero() => reading.symbol.clone(),
        _ => "native".to_string(),
    };
    let refill = station
        .monitored_token
        .as_ref()
        .filter(|t| !t.is_zero())
        .map_or_else(|| NATIVE_SYMBOL.to_string(), ToString::to_string);

    let call = format!(
        "**🚨 Emergency Call**\nThe {asset} balance of operator {op} can handle {ops} ops which is {band}. Please deposit more {refill} to the operator {op}",
        op = reading.operator,
        ops = verdict.operations_remaining,
        band = threshold_sentence(station),
    );

    let mut table = Table::new(ctx)
        .row("Operator", &reading.operator)
        .row("Symbol", &reading.symbol)
        .row("Decimals", reading.decimals)
        .row("Balance", reading.formatted())
        .row("Operations Left", verdict.operations_remaining)
        .row("Threshold", station.threshold)
        .row("Emergency", format!("{}%", station.emergency));
    table = cost_row(table, station, unit_cost);
    if let Some(token) = &station.monitored_token {
        table = table.row("Monitored Token", token);
    }

    let title = format!("Monitor {} Station", station.kind.title());
    AlertMessage::new(
        title.clone(),
        format!("**{title}**\n\n{call}\n\n{}", table.render()),
        AlertLevel::Warning,
        station.kind.as_str(),
    )
}

/// Alert for a paymaster deposit that crossed the emergency band
pub fn deposit_alert(
    station: &StationConfig,
    entrypoint: &Address,
    paymaster: &Address,
    deposit: &DepositInfo,
    verdict: &CapacityVerdict,
    unit_cost: U256,
    ctx: &MessageContext,
) -> AlertMessage {
    let call = format!(
        "**🚨 Emergency Call**\nThe deposit balance of paymaster {paymaster} in entrypoint {entrypoint} can handle {ops} ops which is {band}. Please deposit more {NATIVE_SYMBOL} to the entrypoint {entrypoint}",
        ops = verdict.operations_remaining,
        band = threshold_sentence(station),
    );

    let table = Table::new(ctx)
        .row("Paymaster", paymaster)
        .row("Entrypoint", entrypoint)
        .row("Symbol", NATIVE_SYMBOL)
        .row("Decimals", NATIVE_DECIMALS)
        .row("Deposit", format_units(deposit.deposit, NATIVE_DECIMALS))
        .row("Operations Left", verdict.operations_remaining)
        .row("Threshold", station.threshold)
        .row("Emergency", format!("{}%", station.emergency));
    let table = cost_row(table, station, unit_cost);

    let title = format!("Monitor {} Station", StationKind::Paymaster.title());
    AlertMessage::new(
        title.clone(),
        format!("**{title}**\n\n{call}\n\n{}", table.render()),
        AlertLevel::Warning,
        StationKind::Paymaster.as_str(),
    )
}

/// Scheduled balance report, sent regardless of thresholds
pub fn balance_report(title: &str, reading: &BalanceReading, ctx: &MessageContext) -> AlertMessage {
    let table = Table::new(ctx)
        .row("Operator", &reading.operator)
        .row("Symbol", &reading.symbol)
        .row("Decimals", reading.decimals)
        .row("Balance", reading.formatted());

    AlertMessage::new(
        title,
        format!("** ✅ {title}**\n\n{}", table.render()),
        AlertLevel::Info,
        BALANCE_TAG,
    )
}

/// Scheduled paymaster deposit report
pub fn deposit_report(
    entrypoint: &Address,
    paymaster: &Address,
    deposit: &DepositInfo,
    ctx: &MessageContext,
) -> AlertMessage {
    let title = "Check Paymaster Deposit";
    let table = Table::new(ctx)
        .row("Paymaster", paymaster)
        .row("Entrypoint", entrypoint)
        .row("Symbol", NATIVE_SYMBOL)
        .row("Decimals", NATIVE_DECIMALS)
        .row("Deposit", format_units(deposit.deposit, NATIVE_DECIMALS))
        .row("Staked", deposit.staked)
        .row("Stake", format_units(deposit.stake, NATIVE_DECIMALS))
        .row("Unstake Delay (sec)", deposit.unstake_delay_sec)
        .row("Withdraw Time", format_unix(deposit.withdraw_time));

    AlertMessage::new(
        title,
        format!("** ✅ {title}**\n\n{}", table.render()),
        AlertLevel::Info,
        BALANCE_TAG,
    )
}

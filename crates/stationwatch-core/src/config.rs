//! Configuration management for StationWatch
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `STATIONWATCH__SECTION__KEY` environment variables
//!
//! Webhook URLs fall back to `BIC_CHAT_WEBHOOK_URL` / `SLACK_WEBHOOK_URL`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

use crate::alerting::providers::env;
use crate::alerting::BIC_CHAT;
use crate::error::Result;
use crate::models::{Address, StationConfig, StationKind, UnitCost, U256};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "STATIONWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain RPC endpoint
    pub rpc: RpcConfig,

    /// Faucet station
    pub faucet: Option<TokenStationConfig>,

    /// Bonus station
    pub bonus: Option<TokenStationConfig>,

    /// Redeem station
    pub redeem: Option<GasStationConfig>,

    /// Gas station
    pub gas: Option<GasStationConfig>,

    /// Paymaster station
    pub paymaster: Option<PaymasterStationConfig>,

    /// Notification providers
    pub providers: ProvidersConfig,

    /// Cycle cadences
    pub schedule: ScheduleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub url: String,
    /// Network name printed in messages
    pub network_name: String,
    /// Environment label printed in messages
    pub env: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            network_name: "localhost".to_string(),
            env: "development".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Station paying out a fixed token amount per operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStationConfig {
    /// Operator addresses
    #[serde(default, deserialize_with = "operator_list")]
    pub operators: Vec<Address>,
    /// Token to watch, native currency when absent or blank
    #[serde(default, deserialize_with = "optional_address")]
    pub monitored_token: Option<Address>,
    /// Token amount per operation, in the token's smallest unit
    pub amount: Amount,
    /// Warning band
    pub threshold: u32,
    /// Percent of the warning band considered critical
    pub emergency: u32,
}

/// Station paying gas per operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasStationConfig {
    /// Operator addresses
    #[serde(default, deserialize_with = "operator_list")]
    pub operators: Vec<Address>,
    /// Gas used by one operation
    pub gas_limit: u64,
    /// Warning band
    pub threshold: u32,
    /// Percent of the warning band considered critical
    pub emergency: u32,
}

/// Paymaster deposit held by an EntryPoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymasterStationConfig {
    /// EntryPoint contract
    pub entrypoint: Address,
    /// Paymaster whose deposit is watched
    pub paymaster: Address,
    /// Gas used by one sponsored operation
    pub gas_limit: u64,
    /// Warning band
    pub threshold: u32,
    /// Percent of the warning band considered critical
    pub emergency: u32,
}

/// Notification provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Providers alerts are sent to
    pub targets: Vec<String>,
    /// Send to every registered provider instead of `targets`
    pub broadcast: bool,
    /// Per-request webhook timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Chat webhook URL
    pub bic_chat_webhook_url: Option<String>,
    /// Slack webhook URL
    pub slack_webhook_url: Option<String>,
    /// Slack channel override
    pub slack_channel: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            targets: vec![BIC_CHAT.to_string()],
            broadcast: false,
            timeout: Duration::from_secs(10),
            bic_chat_webhook_url: None,
            slack_webhook_url: None,
            slack_channel: None,
        }
    }
}

/// Cycle cadences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Threshold check cadence for every station
    #[serde(with = "humantime_serde")]
    pub monitor_every: Duration,
    /// Full status report cadence
    #[serde(with = "humantime_serde")]
    pub status_every: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            monitor_every: Duration::from_secs(60),
            status_every: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Operator list: blank entries are skipped, anything else must be a valid address
fn operator_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Address>, D::Error> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_address(raw).map_err(D::Error::custom))
        .collect()
}

fn optional_address<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Address>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_address(raw.trim()).map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

fn parse_address(raw: &str) -> std::result::Result<Address, String> {
    raw.parse::<Address>()
        .map_err(|e| format!("invalid address '{raw}': {e}"))
}

/// Token amount accepted as an integer or a decimal/hex string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Amount(pub U256);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AmountVisitor;

        impl serde::de::Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or an integer string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<Amount, E> {
                Ok(Amount(U256::from(v)))
            }

            fn visit_u128<E: serde::de::Error>(self, v: u128) -> std::result::Result<Amount, E> {
                Ok(Amount(U256::from(v)))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<Amount, E> {
                u64::try_from(v)
                    .map(|v| Amount(U256::from(v)))
                    .map_err(|_| E::custom(format!("amount must be non-negative, got {v}")))
            }

            // Environment overrides too large for i64 arrive as floats
            fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<Amount, E> {
                if v >= 0.0 && v.fract() == 0.0 && v <= MAX_EXACT_FLOAT {
                    Ok(Amount(U256::from(v as u64)))
                } else {
                    Err(E::custom(format!(
                        "amount {v} is not an exact integer; write it as a quoted string in the config file"
                    )))
                }
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<Amount, E> {
                let digits = v.trim().replace('_', "");
                let parsed = match digits.strip_prefix("0x") {
                    Some(hex) => U256::from_str_radix(hex, 16),
                    None => U256::from_str_radix(&digits, 10),
                };
                parsed
                    .map(Amount)
                    .map_err(|e| E::custom(format!("invalid amount '{v}': {e}")))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Largest float every integer up to which is exactly representable
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl Config {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let env = config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("faucet.operators")
            .with_list_parse_key("bonus.operators")
            .with_list_parse_key("redeem.operators")
            .with_list_parse_key("gas.operators")
            .with_list_parse_key("providers.targets");

        let mut config: Config = builder.add_source(env).build()?.try_deserialize()?;
        config.apply_webhook_env();
        Ok(config)
    }

    fn apply_webhook_env(&mut self) {
        if self.providers.bic_chat_webhook_url.is_none() {
            self.providers.bic_chat_webhook_url = std::env::var(env::BIC_CHAT_WEBHOOK_URL).ok();
        }
        if self.providers.slack_webhook_url.is_none() {
            self.providers.slack_webhook_url = std::env::var(env::SLACK_WEBHOOK_URL).ok();
        }
    }

    /// Every configured station, in scheduling order
    pub fn stations(&self) -> Vec<StationConfig> {
        StationKind::ALL
            .into_iter()
            .filter_map(|kind| self.station(kind))
            .collect()
    }

    /// One station, if configured
    pub fn station(&self, kind: StationKind) -> Option<StationConfig> {
        match kind {
            StationKind::Faucet => self.faucet.as_ref().map(|s| token_station(kind, s)),
            StationKind::Bonus => self.bonus.as_ref().map(|s| token_station(kind, s)),
            StationKind::Redeem => self.redeem.as_ref().map(|s| gas_station(kind, s, s.operators.clone())),
            StationKind::Gas => self.gas.as_ref().map(|s| {
                let operators = if s.operators.is_empty() {
                    self.all_operators()
                } else {
                    s.operators.clone()
                };
                gas_station(kind, s, operators)
            }),
            StationKind::Paymaster => self.paymaster.as_ref().map(|p| StationConfig {
                kind,
                operators: vec![p.paymaster],
                monitored_token: None,
                unit_cost: UnitCost::Gas {
                    gas_limit: p.gas_limit,
                },
                threshold: p.threshold,
                emergency: p.emergency,
                entrypoint: Some(p.entrypoint),
            }),
        }
    }

    /// Union of faucet, redeem and bonus operators, first occurrence wins.
    ///
    /// Addresses compare by value, so checksummed and lowercase spellings of
    /// one account collapse into one entry.
    pub fn all_operators(&self) -> Vec<Address> {
        let faucet = self.faucet.iter().flat_map(|s| s.operators.iter());
        let redeem = self.redeem.iter().flat_map(|s| s.operators.iter());
        let bonus = self.bonus.iter().flat_map(|s| s.operators.iter());

        let mut out: Vec<Address> = Vec::new();
        for op in faucet.chain(redeem).chain(bonus) {
            if !out.contains(op) {
                out.push(*op);
            }
        }
        out
    }

    /// Stations covered by the full status report.
    ///
    /// Native balances are reported once through the gas station when it is
    /// configured; token stations and the paymaster are always included.
    pub fn status_stations(&self) -> Vec<StationConfig> {
        let has_gas = self.gas.is_some();
        self.stations()
            .into_iter()
            .filter(|s| {
                let native = s.monitored_token.as_ref().map_or(true, |t| t.is_zero());
                s.kind == StationKind::Gas || s.is_deposit_station() || !native || !has_gas
            })
            .collect()
    }

    /// Non-fatal configuration problems, for logging at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for station in self.stations() {
            let kind = station.kind;
            if let Err(e) = station.validate_bounds() {
                warnings.push(format!("{e}; the station will be skipped every cycle"));
            } else if !station.is_ordered() {
                warnings.push(format!(
                    "{kind} station: emergency ({}) is above threshold ({})",
                    station.emergency, station.threshold
                ));
            }
            if station.unit_cost.resolve(Some(U256::from(1))).unwrap_or_default().is_zero() {
                warnings.push(format!("{kind} station: unit cost is zero; the station will be skipped every cycle"));
            }
            if station.operators.is_empty() {
                warnings.push(format!("{kind} station: no operators configured"));
            }
        }

        if self.providers.bic_chat_webhook_url.is_none() && self.providers.slack_webhook_url.is_none() {
            warnings.push("no webhook URL configured; alerts will only be logged".to_string());
        }

        warnings
    }

    /// Copy with webhook URLs masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |url: &mut Option<String>| {
            if url.is_some() {
                *url = Some("***".to_string());
            }
        };
        mask(&mut copy.providers.bic_chat_webhook_url);
        mask(&mut copy.providers.slack_webhook_url);
        copy
    }
}

fn token_station(kind: StationKind, s: &TokenStationConfig) -> StationConfig {
    StationConfig {
        kind,
        operators: s.operators.clone(),
        monitored_token: s.monitored_token,
        unit_cost: UnitCost::Fixed { amount: s.amount.0 },
        threshold: s.threshold,
        emergency: s.emergency,
        entrypoint: None,
    }
}

fn gas_station(kind: StationKind, s: &GasStationConfig, operators: Vec<Address>) -> StationConfig {
    StationConfig {
        kind,
        operators,
        monitored_token: None,
        unit_cost: UnitCost::Gas {
            gas_limit: s.gas_limit,
        },
        threshold: s.threshold,
        emergency: s.emergency,
        entrypoint: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
[rpc]
url = "https://rpc.example.org"
network_name = "arbitrum-sepolia"
env = "staging"
timeout = "5s"

[faucet]
operators = ["0x1111111111111111111111111111111111111111", "0x2222222222222222222222222222222222222222"]
monitored_token = "0x9999999999999999999999999999999999999999"
amount = "1000000000000000000000"
threshold = 80
emergency = 20

[bonus]
operators = ["0x2222222222222222222222222222222222222222", "0x3333333333333333333333333333333333333333"]
monitored_token = "0x8888888888888888888888888888888888888888"
amount = 500
threshold = 50
emergency = 10

[redeem]
operators = ["0x4444444444444444444444444444444444444444"]
gas_limit = 300000
threshold = 60
emergency = 30

[gas]
gas_limit = 100000
threshold = 100
emergency = 10

[paymaster]
entrypoint = "0x5ff137d4b0fdcd49dca30c7cf57e578a026d2789"
paymaster = "0x7777777777777777777777777777777777777777"
gas_limit = 500000
threshold = 100
emergency = 50

[providers]
targets = ["bic_chat", "slack"]
bic_chat_webhook_url = "https://chat.example.org/hooks/abc"

[schedule]
monitor_every = "30s"
status_every = "12h"
"#;

    fn load_toml(contents: &str) -> crate::error::Result<Config> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Config::load(file.path().to_str())
    }

    fn load_sample() -> Config {
        tokio_test::assert_ok!(load_toml(SAMPLE))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.providers.targets, vec![BIC_CHAT.to_string()]);
        assert!(!config.providers.broadcast);
        assert_eq!(config.schedule.monitor_every, Duration::from_secs(60));
        assert!(config.stations().is_empty());
    }

    #[test]
    fn test_load_file() {
        let config = load_sample();

        assert_eq!(config.rpc.network_name, "arbitrum-sepolia");
        assert_eq!(config.rpc.timeout, Duration::from_secs(5));
        assert_eq!(config.schedule.status_every, Duration::from_secs(12 * 3600));
        assert_eq!(config.providers.targets, vec!["bic_chat", "slack"]);

        let faucet = config.station(StationKind::Faucet).unwrap();
        assert_eq!(
            faucet.unit_cost,
            UnitCost::Fixed {
                amount: U256::from(1_000_000_000_000_000_000_000_u128)
            }
        );
        assert_eq!(
            config.station(StationKind::Bonus).unwrap().unit_cost,
            UnitCost::Fixed { amount: U256::from(500) }
        );
    }

    #[test]
    fn test_stations_in_scheduling_order() {
        let kinds: Vec<_> = load_sample().stations().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, StationKind::ALL.to_vec());
    }

    #[test]
    fn test_gas_station_defaults_to_union_of_operators() {
        let gas = load_sample().station(StationKind::Gas).unwrap();
        assert_eq!(
            gas.operators,
            vec![
                address!("1111111111111111111111111111111111111111"),
                address!("2222222222222222222222222222222222222222"),
                address!("4444444444444444444444444444444444444444"),
                address!("3333333333333333333333333333333333333333"),
            ]
        );
        assert_eq!(gas.unit_cost, UnitCost::Gas { gas_limit: 100_000 });
    }

    #[test]
    fn test_paymaster_station() {
        let paymaster = load_sample().station(StationKind::Paymaster).unwrap();
        assert!(paymaster.is_deposit_station());
        assert_eq!(paymaster.operators, vec![address!("7777777777777777777777777777777777777777")]);
    }

    #[test]
    fn test_status_stations_skip_native_duplicates() {
        let kinds: Vec<_> = load_sample().status_stations().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StationKind::Gas, StationKind::Faucet, StationKind::Bonus, StationKind::Paymaster]
        );
    }

    #[test]
    fn test_warnings() {
        let mut config = load_sample();
        assert!(config.warnings().is_empty(), "{:?}", config.warnings());

        if let Some(bonus) = config.bonus.as_mut() {
            bonus.threshold = 5;
            bonus.emergency = 50;
            bonus.amount = Amount(U256::ZERO);
        }
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("emergency (50) is above threshold (5)"));
        assert!(warnings[1].contains("unit cost is zero"));
    }

    #[test]
    fn test_redacted() {
        let config = load_sample().redacted();
        assert_eq!(config.providers.bic_chat_webhook_url.as_deref(), Some("***"));
    }

    #[test]
    fn test_amount_parsing() {
        let amount: Amount = serde_json::from_str("\"1_000_000\"").unwrap();
        assert_eq!(amount, Amount(U256::from(1_000_000)));
        let amount: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(amount, Amount(U256::from(42)));
        let amount: Amount = serde_json::from_str("\"0xff\"").unwrap();
        assert_eq!(amount, Amount(U256::from(255)));
        let amount: Amount = serde_json::from_str("1e15").unwrap();
        assert_eq!(amount, Amount(U256::from(1_000_000_000_000_000_u64)));
        assert!(serde_json::from_str::<Amount>("1e21").is_err());
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert!(serde_json::from_str::<Amount>("1.5").is_err());
        assert!(serde_json::from_str::<Amount>("\"ten\"").is_err());
    }

    #[test]
    fn test_amount_beyond_u128() {
        // 2^128
        let amount: Amount = serde_json::from_str("\"340282366920938463463374607431768211456\"").unwrap();
        assert_eq!(amount, Amount(U256::from(1) << 128));
    }

    #[test]
    fn test_blank_operators_are_skipped() {
        let config = tokio_test::assert_ok!(load_toml(
            r#"
[redeem]
operators = ["", "0x4444444444444444444444444444444444444444", "   "]
gas_limit = 300000
threshold = 60
emergency = 30
"#
        ));
        let redeem = config.station(StationKind::Redeem).unwrap();
        assert_eq!(redeem.operators, vec![address!("4444444444444444444444444444444444444444")]);
    }

    #[test]
    fn test_invalid_operator_is_a_config_error() {
        let result = load_toml(
            r#"
[redeem]
operators = ["0x4444"]
gas_limit = 300000
threshold = 60
emergency = 30
"#,
        );
        let err = tokio_test::assert_err!(result);
        assert!(err.to_string().contains("invalid address '0x4444'"), "{err}");
    }

    #[test]
    fn test_blank_token_means_native() {
        let config = tokio_test::assert_ok!(load_toml(
            r#"
[faucet]
operators = ["0x1111111111111111111111111111111111111111"]
monitored_token = ""
amount = 1
threshold = 80
emergency = 20
"#
        ));
        assert_eq!(config.station(StationKind::Faucet).unwrap().monitored_token, None);
    }

    #[test]
    fn test_checksummed_and_lowercase_operators_dedupe() {
        let config = tokio_test::assert_ok!(load_toml(
            r#"
[faucet]
operators = ["0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"]
amount = 1
threshold = 80
emergency = 20

[redeem]
operators = ["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", "0x4444444444444444444444444444444444444444"]
gas_limit = 300000
threshold = 60
emergency = 30

[gas]
gas_limit = 21000
threshold = 50
emergency = 10
"#
        ));
        assert_eq!(
            config.all_operators(),
            vec![
                address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
                address!("4444444444444444444444444444444444444444"),
            ]
        );
        assert_eq!(config.station(StationKind::Gas).unwrap().operators.len(), 2);
    }

    #[test]
    fn test_env_list_override() {
        // The sample file sets the same targets, so concurrent loads agree
        std::env::set_var("STATIONWATCH__PROVIDERS__TARGETS", "bic_chat,slack");
        let config = Config::load(None);
        std::env::remove_var("STATIONWATCH__PROVIDERS__TARGETS");

        let config = tokio_test::assert_ok!(config);
        assert_eq!(config.providers.targets, vec!["bic_chat", "slack"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load(Some("/nonexistent/stationwatch.toml")).is_err());
    }
}

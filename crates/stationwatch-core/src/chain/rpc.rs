//! JSON-RPC client for balances, deposits and gas price

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::models::{Address, BalanceReading, DepositInfo};

use super::{BalanceReader, DepositReader, GasPriceOracle};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    interface IEntryPoint {
        function deposits(address account) external view returns (
            uint112 deposit,
            bool staked,
            uint112 stake,
            uint32 unstakeDelaySec,
            uint48 withdrawTime
        );
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Minimal read-only Ethereum JSON-RPC client
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url`; every request is bounded by `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and return its `result`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        response
            .result
            .ok_or_else(|| Error::data_unavailable(format!("{method}: response has no result")))
    }

    async fn call_str(&self, method: &str, params: Value) -> Result<String> {
        let value = self.call(method, params).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::data_unavailable(format!("{method}: expected a hex string")))
    }

    async fn call_bytes(&self, method: &str, params: Value) -> Result<Bytes> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `eth_call` of an ABI-encoded call against `to`, decoding its return data
    async fn eth_call<C: SolCall>(&self, to: &Address, call: &C) -> Result<C::Return> {
        let data = Bytes::from(call.abi_encode());
        let out = self
            .call_bytes("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        C::abi_decode_returns(&out, true)
            .map_err(|e| Error::data_unavailable(format!("{}: {e}", C::SIGNATURE)))
    }

    /// Deployed bytecode at `address`
    pub async fn get_code(&self, address: &Address) -> Result<Bytes> {
        self.call_bytes("eth_getCode", json!([address, "latest"]))
            .await
    }

    /// Native balance of `address` in wei
    pub async fn get_balance(&self, address: &Address) -> Result<U256> {
        let quantity = self
            .call_str("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&quantity)
    }

    async fn read_token(&self, owner: &Address, token: &Address) -> Result<BalanceReading> {
        let balance_call = IERC20::balanceOfCall { owner: *owner };
        let decimals_call = IERC20::decimalsCall {};
        let (balance, symbol, decimals) = tokio::try_join!(
            self.eth_call(token, &balance_call),
            self.read_symbol(token),
            self.eth_call(token, &decimals_call),
        )?;

        Ok(BalanceReading {
            operator: *owner,
            symbol,
            decimals: decimals._0,
            raw_balance: balance._0,
        })
    }

    async fn read_symbol(&self, token: &Address) -> Result<String> {
        let data = Bytes::from(IERC20::symbolCall {}.abi_encode());
        let out = self
            .call_bytes("eth_call", json!([{ "to": token, "data": data }, "latest"]))
            .await?;
        decode_symbol(&out)
    }
}

#[async_trait::async_trait]
impl BalanceReader for RpcClient {
    async fn read(&self, owner: &Address, token: Option<&Address>) -> BalanceReading {
        let Some(token) = token.filter(|t| !t.is_zero()) else {
            return match self.get_balance(owner).await {
                Ok(raw) => BalanceReading::native(*owner, raw),
                Err(e) => {
                    error!(owner = %owner, error = %e, "Error: Get balance");
                    BalanceReading::sentinel(*owner)
                }
            };
        };

        match self.get_code(token).await {
            Ok(code) if !code.is_empty() => {}
            Ok(_) => {
                error!(token = %token, "Invalid token address");
                return BalanceReading::sentinel(*owner);
            }
            Err(e) => {
                error!(token = %token, error = %e, "Error: Get token code");
                return BalanceReading::sentinel(*owner);
            }
        }

        match self.read_token(owner, token).await {
            Ok(reading) => {
                debug!(owner = %owner, token = %token, symbol = %reading.symbol, "Read token balance");
                reading
            }
            Err(e) => {
                error!(owner = %owner, token = %token, error = %e, "Error: Get balance");
                BalanceReading::sentinel(*owner)
            }
        }
    }
}

#[async_trait::async_trait]
impl DepositReader for RpcClient {
    async fn read(&self, entrypoint: &Address, paymaster: &Address) -> Result<DepositInfo> {
        let out = self
            .eth_call(entrypoint, &IEntryPoint::depositsCall { account: *paymaster })
            .await?;

        Ok(DepositInfo {
            deposit: U256::from(out.deposit),
            staked: out.staked,
            stake: U256::from(out.stake),
            unstake_delay_sec: u64::from(out.unstakeDelaySec),
            withdraw_time: u64::try_from(out.withdrawTime).unwrap_or(u64::MAX),
        })
    }
}

#[async_trait::async_trait]
impl GasPriceOracle for RpcClient {
    async fn gas_price(&self) -> Result<U256> {
        let quantity = self.call_str("eth_gasPrice", json!([])).await?;
        parse_quantity(&quantity)
    }
}

/// Parse a hex quantity such as `0x1bc16d674ec80000`
fn parse_quantity(value: &str) -> Result<U256> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| Error::data_unavailable(format!("quantity without 0x prefix: {value}")))?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::data_unavailable(format!("bad quantity {value}: {e}")))
}

/// Decode a `symbol()` return value. Some older tokens return `bytes32`
/// instead of `string`.
fn decode_symbol(data: &[u8]) -> Result<String> {
    if data.len() == 32 {
        let end = data.iter().position(|b| *b == 0).unwrap_or(32);
        return Ok(String::from_utf8_lossy(&data[..end]).into_owned());
    }

    IERC20::symbolCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| Error::data_unavailable(format!("symbol(): {e}")))
}

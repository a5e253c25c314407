//! Token balance lookups against an EVM JSON-RPC endpoint.
//!
//! [`BalanceOracle::query_balance`] reports failures explicitly;
//! [`BalanceOracle::fetch_balance`] is the fail-safe entry point used by the
//! pipeline and collapses any failure to a zero balance after logging it.

use crate::config::ScannerConfig;
use crate::oracle::throttle::RequestThrottle;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, hex, id};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// ERC-20 `balanceOf` signature, hashed into the call selector
const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

/// Source of token balances for candidate addresses.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Query the balance in human-readable units, surfacing any failure.
    async fn query_balance(&self, address: &str) -> Result<f64>;

    /// Query the balance, logging failures and returning zero in their place.
    async fn fetch_balance(&self, address: &str) -> f64 {
        collapse_to_zero(address, self.query_balance(address).await)
    }
}

/// Apply the fail-safe policy: log a failed lookup and treat it as a zero balance.
pub fn collapse_to_zero(address: &str, result: Result<f64>) -> f64 {
    match result {
        Ok(amount) => amount,
        Err(e) => {
            error!("Error fetching balance for {}: {:#}", address, e);
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `balanceOf` client for a single ERC-20/BEP-20 token contract.
pub struct Erc20BalanceClient {
    http_client: Client,
    rpc_url: String,
    contract: Address,
    decimals: u32,
    throttle: Option<RequestThrottle>,
    next_id: AtomicU64,
}

impl Erc20BalanceClient {
    /// Create a client for `contract` served by `rpc_url`.
    pub fn new(http_client: Client, rpc_url: impl Into<String>, contract: &str, decimals: u32) -> Result<Self> {
        let contract = normalize_address(contract).context("Invalid token contract address")?;
        Ok(Self {
            http_client,
            rpc_url: rpc_url.into(),
            contract,
            decimals,
            throttle: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Build a client from configuration, including HTTP timeout and optional throttle.
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        let client = Self::new(http_client, config.rpc_url.clone(), &config.token_contract, config.token_decimals)?;
        Ok(match config.rate_limit_requests_per_second {
            Some(rps) => client.with_throttle(RequestThrottle::new(rps)),
            None => client,
        })
    }

    /// Cap the request rate of this client.
    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    fn call_params(&self, owner: Address) -> serde_json::Value {
        json!([
            {
                "to": format!("0x{}", hex::encode(self.contract)),
                "data": encode_balance_of(owner),
            },
            "latest"
        ])
    }

    /// Issue an `eth_call` for `balanceOf(owner)` and return the raw token amount.
    #[instrument(skip_all, fields(owner = %owner))]
    async fn call_balance_of(&self, owner: Address) -> Result<U256> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_call",
            params: self.call_params(owner),
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .context("RPC request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("RPC endpoint returned {}", response.status()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        if let Some(err) = body.error {
            return Err(anyhow!("RPC error {}: {}", err.code, err.message));
        }

        let result = body.result.ok_or_else(|| anyhow!("RPC response has no result"))?;
        decode_uint256(&result)
    }
}

#[async_trait]
impl BalanceOracle for Erc20BalanceClient {
    async fn query_balance(&self, address: &str) -> Result<f64> {
        let owner = normalize_address(address)?;
        let raw = self.call_balance_of(owner).await?;
        let amount = scale_amount(raw, self.decimals)?;
        debug!("Balance of {} is {}", address, amount);
        Ok(amount)
    }
}

/// Parse an address in any hex casing, with or without `0x`.
pub fn normalize_address(address: &str) -> Result<Address> {
    Address::from_str(address.trim()).map_err(|e| anyhow!("Invalid address {:?}: {}", address, e))
}

/// ABI-encode the call data for `balanceOf(owner)`.
pub fn encode_balance_of(owner: Address) -> String {
    let mut call_data = id(BALANCE_OF_SIGNATURE).to_vec();
    call_data.extend(abi::encode(&[Token::Address(owner)]));
    format!("0x{}", hex::encode(call_data))
}

/// Decode a 32-byte hex word returned by `eth_call`.
pub fn decode_uint256(result: &str) -> Result<U256> {
    let digits = result.strip_prefix("0x").unwrap_or(result);
    // An empty result means the call did not reach a contract
    if digits.is_empty() {
        return Err(anyhow!("Empty call result"));
    }
    if digits.len() > 64 {
        return Err(anyhow!("Call result is longer than one word: {} hex digits", digits.len()));
    }
    U256::from_str_radix(digits, 16).map_err(|e| anyhow!("Malformed call result {:?}: {}", result, e))
}

/// Scale a raw token amount by the token's decimal precision.
pub fn scale_amount(raw: U256, decimals: u32) -> Result<f64> {
    let formatted = format_units(raw, decimals).context("Failed to scale token amount")?;
    formatted
        .parse::<f64>()
        .with_context(|| format!("Failed to parse scaled amount {}", formatted))
}

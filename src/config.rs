//! Static configuration for the prospector.
//!
//! Values start from [`ScannerConfig::default`], may be replaced by a JSON file
//! named in `PROSPECTOR_CONFIG`, and finally by individual `PROSPECTOR_*`
//! environment variables.

use anyhow::{anyhow, bail, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Environment variable naming an optional JSON config file
pub const CONFIG_PATH_ENV: &str = "PROSPECTOR_CONFIG";

const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Configuration for the generate-query-record pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// JSON-RPC endpoint of the ledger
    pub rpc_url: String,
    /// Token contract queried with `balanceOf`
    pub token_contract: String,
    /// Token symbol used in log lines and hit records
    pub token_symbol: String,
    /// Decimal precision used to scale raw balances
    pub token_decimals: u32,
    /// Concurrent invocations per batch
    pub batch_size: usize,
    /// Append-only file receiving hit records
    pub hit_log_path: PathBuf,
    /// Per-request timeout in seconds
    pub rpc_timeout_seconds: u64,
    /// Optional cap on oracle requests per second
    pub rate_limit_requests_per_second: Option<u32>,
    /// Seed phrase length in words
    pub word_count: usize,
    /// HD derivation path for the candidate address
    pub derivation_path: String,
    /// Log a stats snapshot every N batches (0 disables)
    pub stats_interval_batches: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://bsc-dataseed.binance.org/".to_string(),
            token_contract: "0x55d398326f99059ff775485246999027b3197955".to_string(),
            token_symbol: "USDT".to_string(),
            token_decimals: 6,
            batch_size: 10,
            hit_log_path: PathBuf::from("wallets_with_balance.txt"),
            rpc_timeout_seconds: 10,
            rate_limit_requests_per_second: None,
            word_count: 12,
            derivation_path: "m/44'/60'/0'/0/0".to_string(),
            stats_interval_batches: 100,
        }
    }
}

impl ScannerConfig {
    /// Load defaults, then the optional JSON file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                info!("Loading configuration from {}", path);
                Self::from_json_file(&path)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse config file {}", path))
    }

    /// Apply `PROSPECTOR_*` overrides using the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROSPECTOR_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = lookup("PROSPECTOR_TOKEN_CONTRACT") {
            self.token_contract = v;
        }
        if let Some(v) = lookup("PROSPECTOR_TOKEN_SYMBOL") {
            self.token_symbol = v;
        }
        if let Some(v) = lookup("PROSPECTOR_TOKEN_DECIMALS") {
            self.token_decimals = parse_var("PROSPECTOR_TOKEN_DECIMALS", &v)?;
        }
        if let Some(v) = lookup("PROSPECTOR_BATCH_SIZE") {
            self.batch_size = parse_var("PROSPECTOR_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("PROSPECTOR_HIT_LOG") {
            self.hit_log_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PROSPECTOR_RPC_TIMEOUT_SECONDS") {
            self.rpc_timeout_seconds = parse_var("PROSPECTOR_RPC_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("PROSPECTOR_RATE_LIMIT") {
            self.rate_limit_requests_per_second = Some(parse_var("PROSPECTOR_RATE_LIMIT", &v)?);
        }
        if let Some(v) = lookup("PROSPECTOR_WORD_COUNT") {
            self.word_count = parse_var("PROSPECTOR_WORD_COUNT", &v)?;
        }
        if let Some(v) = lookup("PROSPECTOR_DERIVATION_PATH") {
            self.derivation_path = v;
        }
        if let Some(v) = lookup("PROSPECTOR_STATS_INTERVAL") {
            self.stats_interval_batches = parse_var("PROSPECTOR_STATS_INTERVAL", &v)?;
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !SUPPORTED_WORD_COUNTS.contains(&self.word_count) {
            bail!("word_count must be one of {:?}, got {}", SUPPORTED_WORD_COUNTS, self.word_count);
        }
        // uint256 has at most 78 decimal digits
        if self.token_decimals > 77 {
            bail!("token_decimals {} is out of range", self.token_decimals);
        }
        if self.rpc_timeout_seconds == 0 {
            bail!("rpc_timeout_seconds must be positive");
        }
        if self.rate_limit_requests_per_second == Some(0) {
            bail!("rate_limit_requests_per_second must be positive when set");
        }
        Address::from_str(&self.token_contract)
            .map_err(|e| anyhow!("Invalid token contract {}: {}", self.token_contract, e))?;
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid value {:?} for {}: {}", value, name, e))
}

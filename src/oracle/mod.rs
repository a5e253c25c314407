//! Balance oracle module - remote token balance lookups.
//!
//! This module wraps the ledger's JSON-RPC endpoint behind the
//! [`BalanceOracle`] trait so the pipeline can be driven by mocks in tests.

pub mod balance_client;
pub mod throttle;

pub use balance_client::{collapse_to_zero, BalanceOracle, Erc20BalanceClient};
pub use throttle::RequestThrottle;

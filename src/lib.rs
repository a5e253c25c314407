//! Seed prospector - concurrent seed phrase sampling against a token ledger
//!
//! Generates random BIP-39 seed phrases, derives their addresses, queries a
//! token balance for each and appends every non-zero balance to a durable log.

pub mod config;
pub mod generator;
pub mod hit_log;
pub mod lifecycle;
pub mod metrics;
pub mod oracle;
pub mod recorder;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use config::ScannerConfig;
pub use generator::CandidateGenerator;
pub use hit_log::HitLog;
pub use lifecycle::{Prospector, RunSummary, ShutdownController, ShutdownSignal};
pub use metrics::ScanStats;
pub use oracle::{BalanceOracle, Erc20BalanceClient};
pub use recorder::{CandidateReport, HitRecorder, RecordOutcome};
pub use scheduler::{BatchReport, BatchScheduler};
pub use types::{BalanceReading, Candidate, HitRecord};

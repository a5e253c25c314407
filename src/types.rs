//! Core types and data structures for the seed prospector.

use chrono::{DateTime, Utc};

/// Checksummed account address (EIP-55, `0x`-prefixed)
pub type Address = String;

/// Monotonic index assigned to each candidate for observability
pub type Round = u64;

/// A freshly generated seed phrase and the address derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// BIP-39 seed phrase
    pub seed_phrase: String,
    /// Address derived from the seed phrase on the configured path
    pub address: Address,
}

/// A candidate together with the balance the oracle reported for it.
#[derive(Debug, Clone)]
pub struct BalanceReading {
    pub candidate: Candidate,
    /// Token balance in human-readable units
    pub amount: f64,
    pub round: Round,
}

impl BalanceReading {
    /// A reading is a hit when the balance is strictly positive.
    pub fn is_hit(&self) -> bool {
        self.amount > 0.0
    }
}

/// Durable representation of a positive balance reading.
#[derive(Debug, Clone)]
pub struct HitRecord {
    pub seed_phrase: String,
    pub address: Address,
    pub amount: f64,
    pub round: Round,
    /// When the hit was observed
    pub found_at: DateTime<Utc>,
}

impl HitRecord {
    /// Build a record from a reading. Returns `None` unless the reading is a hit.
    pub fn from_reading(reading: &BalanceReading) -> Option<Self> {
        if !reading.is_hit() {
            return None;
        }
        Some(Self {
            seed_phrase: reading.candidate.seed_phrase.clone(),
            address: reading.candidate.address.clone(),
            amount: reading.amount,
            round: reading.round,
            found_at: Utc::now(),
        })
    }

    /// Render the self-delimited block appended to the hit log, blank line included.
    pub fn to_log_block(&self, symbol: &str) -> String {
        format!(
            "{symbol}: Mnemonic: {}, Address: {}, Balance: {:.6} {symbol}, Round: {}, Found: {}\n\n",
            self.seed_phrase,
            self.address,
            self.amount,
            self.round,
            self.found_at.to_rfc3339(),
        )
    }
}

//! Hit recording: persists positive readings and emits one summary line per candidate.

use crate::hit_log::HitLog;
use crate::metrics::ScanStats;
use crate::types::{Address, BalanceReading, HitRecord, Round};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// What happened to a reading after recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Positive balance, appended to the hit log
    Saved,
    /// Zero balance, nothing written
    NotSaved,
    /// Positive balance, but the hit log write failed
    WriteFailed,
}

/// Per-candidate result, rendered as the summary line.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub round: Round,
    pub address: Address,
    pub seed_phrase: String,
    pub amount: f64,
    pub outcome: RecordOutcome,
    pub symbol: String,
}

impl fmt::Display for CandidateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Round {}: {} Address: {}, Balance: {:.6} {}",
            self.round, self.symbol, self.address, self.amount, self.symbol
        )?;
        match self.outcome {
            RecordOutcome::Saved => write!(f, ", Mnemonic: {} (saved)", self.seed_phrase),
            RecordOutcome::NotSaved => write!(f, ", Mnemonic: {} (not saved)", self.seed_phrase),
            RecordOutcome::WriteFailed => write!(f, ", Mnemonic: {} (save failed)", self.seed_phrase),
        }
    }
}

/// Writes hits to the shared [`HitLog`] and reports every candidate.
#[derive(Clone)]
pub struct HitRecorder {
    hit_log: Arc<HitLog>,
    stats: Arc<ScanStats>,
}

impl HitRecorder {
    pub fn new(hit_log: Arc<HitLog>, stats: Arc<ScanStats>) -> Self {
        Self { hit_log, stats }
    }

    /// Append the reading if it is a hit, then log its summary line.
    pub async fn record(&self, reading: &BalanceReading) -> CandidateReport {
        let outcome = match HitRecord::from_reading(reading) {
            None => RecordOutcome::NotSaved,
            Some(hit) => match self.hit_log.append(&hit).await {
                Ok(()) => {
                    self.stats.record_hit();
                    RecordOutcome::Saved
                }
                Err(e) => {
                    self.stats.record_write_failure();
                    // The log line is the only remaining copy of the hit
                    error!(
                        "Failed to save hit for {} ({:.6} {}), mnemonic: {}: {:#}",
                        hit.address,
                        hit.amount,
                        self.hit_log.symbol(),
                        hit.seed_phrase,
                        e
                    );
                    RecordOutcome::WriteFailed
                }
            },
        };

        let report = CandidateReport {
            round: reading.round,
            address: reading.candidate.address.clone(),
            seed_phrase: reading.candidate.seed_phrase.clone(),
            amount: reading.amount,
            outcome,
            symbol: self.hit_log.symbol().to_string(),
        };
        info!("{}", report);
        report
    }
}

//! Batch scheduler: fans out a fixed number of generate-query-record
//! invocations per batch and waits for all of them to settle.

use crate::generator::CandidateGenerator;
use crate::metrics::ScanStats;
use crate::oracle::{collapse_to_zero, BalanceOracle};
use crate::recorder::{CandidateReport, HitRecorder, RecordOutcome};
use crate::types::{BalanceReading, Round};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument};

/// Result of one fully drained batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Round assigned to the first invocation of the batch
    pub round_base: Round,
    /// Reports of invocations that completed, ordered by round
    pub reports: Vec<CandidateReport>,
    /// Invocations that failed before producing a report
    pub failed_invocations: usize,
}

impl BatchReport {
    pub fn hits(&self) -> impl Iterator<Item = &CandidateReport> {
        self.reports
            .iter()
            .filter(|r| r.outcome == RecordOutcome::Saved)
    }

    pub fn settled(&self) -> usize {
        self.reports.len() + self.failed_invocations
    }
}

/// Runs batches of concurrent pipeline invocations.
#[derive(Clone)]
pub struct BatchScheduler {
    generator: Arc<CandidateGenerator>,
    oracle: Arc<dyn BalanceOracle>,
    recorder: HitRecorder,
    stats: Arc<ScanStats>,
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(
        generator: CandidateGenerator,
        oracle: Arc<dyn BalanceOracle>,
        recorder: HitRecorder,
        stats: Arc<ScanStats>,
        batch_size: usize,
    ) -> Self {
        Self {
            generator: Arc::new(generator),
            oracle,
            recorder,
            stats,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Launch `batch_size` invocations tagged `round_base..round_base + batch_size`
    /// and return once every one of them has settled.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, round_base: Round) -> BatchReport {
        let mut invocations = JoinSet::new();
        for i in 0..self.batch_size {
            let this = self.clone();
            let round = round_base + i as Round;
            invocations.spawn(async move { this.process_candidate(round).await });
        }

        let mut reports = Vec::with_capacity(self.batch_size);
        let mut failed_invocations = 0;

        while let Some(joined) = invocations.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => {
                    error!("Error in processing account: {:#}", e);
                    self.stats.record_invocation_failure();
                    failed_invocations += 1;
                }
                Err(e) => {
                    error!("Invocation terminated abnormally: {}", e);
                    self.stats.record_invocation_failure();
                    failed_invocations += 1;
                }
            }
        }

        reports.sort_by_key(|r| r.round);
        debug!("Batch starting at round {} settled", round_base);

        BatchReport {
            round_base,
            reports,
            failed_invocations,
        }
    }

    /// Generate one candidate, query its balance and record the outcome.
    pub async fn process_candidate(&self, round: Round) -> Result<CandidateReport> {
        let candidate = self.generator.generate()?;
        self.stats.record_candidate();

        let result = self.oracle.query_balance(&candidate.address).await;
        if result.is_err() {
            self.stats.record_oracle_failure();
        }
        let amount = collapse_to_zero(&candidate.address, result);

        let reading = BalanceReading {
            candidate,
            amount,
            round,
        };
        Ok(self.recorder.record(&reading).await)
    }
}

//! Lifecycle control: the top-level batch loop and graceful shutdown.
//!
//! The loop polls a shutdown flag between batches. A batch that is already
//! running is always allowed to drain, so no invocation is cut off mid-write.

use crate::metrics::ScanStats;
use crate::scheduler::{BatchReport, BatchScheduler};
use crate::types::Round;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Broadcasts a one-shot shutdown request to the batch loop.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving side of [`ShutdownController`].
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Wait for SIGINT or SIGTERM, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { info!("Received SIGINT"); }
            _ = terminate => { info!("Received SIGTERM"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_completed: u64,
    /// First round that was never scheduled
    pub next_round: Round,
}

/// Owns the unbounded batch loop.
pub struct Prospector {
    scheduler: BatchScheduler,
    stats: Arc<ScanStats>,
    stats_interval_batches: u64,
    report_sender: Option<mpsc::UnboundedSender<BatchReport>>,
}

impl Prospector {
    pub fn new(scheduler: BatchScheduler, stats: Arc<ScanStats>, stats_interval_batches: u64) -> Self {
        Self {
            scheduler,
            stats,
            stats_interval_batches,
            report_sender: None,
        }
    }

    /// Forward every drained batch report to `sender`.
    pub fn with_report_sender(mut self, sender: mpsc::UnboundedSender<BatchReport>) -> Self {
        self.report_sender = Some(sender);
        self
    }

    /// Run batches from round 1 until `shutdown` is triggered.
    pub async fn run(&self, shutdown: ShutdownSignal) -> RunSummary {
        let batch_size = self.scheduler.batch_size() as Round;
        let mut round: Round = 1;
        let mut batches_completed: u64 = 0;

        info!("Prospector running with batch size {}", batch_size);

        while !shutdown.is_triggered() {
            let report = self.scheduler.run_batch(round).await;
            round += batch_size;
            batches_completed += 1;

            debug!(
                "Batch {} done: {} settled, {} hits",
                batches_completed,
                report.settled(),
                report.hits().count()
            );

            if let Some(sender) = &self.report_sender {
                if sender.send(report).is_err() {
                    debug!("Batch report receiver dropped, report of round {} discarded", round - batch_size);
                }
            }

            if self.stats_interval_batches > 0 && batches_completed % self.stats_interval_batches == 0 {
                self.stats.log_summary();
            }
        }

        info!("Shutting down gracefully...");
        self.stats.log_summary();

        RunSummary {
            batches_completed,
            next_round: round,
        }
    }
}

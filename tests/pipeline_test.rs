//! End-to-end tests for the generate-query-record pipeline with mocked oracles

use anyhow::Result;
use async_trait::async_trait;
use seed_prospector::{
    BalanceOracle, BatchScheduler, CandidateGenerator, HitLog, HitRecorder, Prospector,
    RecordOutcome, ScanStats, ShutdownController,
};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::subscriber::DefaultGuard;

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Route this thread's log events into the capture until the guard drops.
    /// `#[tokio::test]` runs spawned tasks on the test thread, so they are captured too.
    fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn count_ending_with(&self, suffix: &str) -> usize {
        self.lines().iter().filter(|l| l.ends_with(suffix)).count()
    }

    fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

/// Hands out scripted amounts in call order, zero once exhausted.
struct ScriptedOracle {
    amounts: Mutex<VecDeque<f64>>,
}

impl ScriptedOracle {
    fn new(amounts: &[f64]) -> Self {
        Self {
            amounts: Mutex::new(amounts.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl BalanceOracle for ScriptedOracle {
    async fn query_balance(&self, _address: &str) -> Result<f64> {
        let next = self.amounts.lock().unwrap().pop_front();
        Ok(next.unwrap_or(0.0))
    }
}

/// Triggers shutdown on the given call number, then keeps answering slowly.
struct InterruptingOracle {
    controller: Arc<ShutdownController>,
    trigger_on_call: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl BalanceOracle for InterruptingOracle {
    async fn query_balance(&self, _address: &str) -> Result<f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.trigger_on_call {
            self.controller.shutdown();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(0.0)
    }
}

async fn build(
    oracle: Arc<dyn BalanceOracle>,
    batch_size: usize,
    dir: &tempfile::TempDir,
) -> (BatchScheduler, Arc<ScanStats>, PathBuf) {
    let path = dir.path().join("wallets_with_balance.txt");
    let hit_log = Arc::new(HitLog::open(&path, "USDT").await.expect("open hit log"));
    let stats = Arc::new(ScanStats::new());
    let scheduler = BatchScheduler::new(
        CandidateGenerator::default(),
        oracle,
        HitRecorder::new(hit_log, stats.clone()),
        stats.clone(),
        batch_size,
    );
    (scheduler, stats, path)
}

#[tokio::test]
async fn test_single_hit_in_first_round() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(&[0.0, 5.25, 0.0]));
    let (scheduler, _stats, path) = build(oracle, 3, &dir).await;
    let logs = LogCapture::default();
    let _guard = logs.install();

    let report = scheduler.run_batch(1).await;

    assert_eq!(logs.count_ending_with("(not saved)"), 2);
    assert_eq!(logs.count_ending_with("(saved)"), 1);
    assert_eq!(logs.count_containing("Balance: 5.250000 USDT"), 1);

    assert_eq!(report.reports.len(), 3);
    let lines: Vec<String> = report.reports.iter().map(|r| r.to_string()).collect();
    assert_eq!(lines.iter().filter(|l| l.ends_with("(not saved)")).count(), 2);
    let saved: Vec<&String> = lines.iter().filter(|l| l.ends_with("(saved)")).collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].contains("Balance: 5.250000 USDT"));

    let hit = report.hits().next().expect("one hit");
    let contents = std::fs::read_to_string(&path).unwrap();
    let blocks: Vec<&str> = contents.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].contains(&format!("Address: {}", hit.address)));
    assert!(blocks[0].contains(&format!("Mnemonic: {}", hit.seed_phrase)));
    assert!(blocks[0].contains("5.250000"));
}

#[tokio::test]
async fn test_full_batch_of_hits_is_not_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(&[1.0; 10]));
    let (scheduler, stats, path) = build(oracle, 10, &dir).await;

    let report = scheduler.run_batch(1).await;
    assert_eq!(report.hits().count(), 10);

    let contents = std::fs::read_to_string(&path).unwrap();
    let blocks: Vec<&str> = contents.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(blocks.len(), 10);
    for block in &blocks {
        assert!(block.starts_with("USDT: Mnemonic: "));
        assert!(block.contains("Balance: 1.000000 USDT"));
        assert!(!block.contains('\n'));
    }
    assert_eq!(stats.snapshot().hits, 10);
}

#[tokio::test]
async fn test_interrupt_mid_batch_drains_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(ShutdownController::new());
    let oracle = Arc::new(InterruptingOracle {
        controller: controller.clone(),
        trigger_on_call: 1,
        calls: AtomicUsize::new(0),
    });
    let (scheduler, stats, _) = build(oracle, 3, &dir).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let prospector = Prospector::new(scheduler, stats.clone(), 0).with_report_sender(tx);
    let logs = LogCapture::default();
    let _guard = logs.install();

    let summary = prospector.run(controller.subscribe()).await;

    assert_eq!(summary.batches_completed, 1);
    assert_eq!(summary.next_round, 4);
    assert_eq!(logs.count_containing("Shutting down gracefully..."), 1);
    assert_eq!(logs.count_ending_with("(not saved)"), 3);

    let report = rx.recv().await.expect("one batch report");
    assert_eq!(report.reports.len(), 3);
    assert!(rx.try_recv().is_err());
    assert_eq!(stats.snapshot().candidates, 3);
}

#[tokio::test]
async fn test_rounds_increase_strictly_across_batches() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(ShutdownController::new());
    let oracle = Arc::new(InterruptingOracle {
        controller: controller.clone(),
        trigger_on_call: 7,
        calls: AtomicUsize::new(0),
    });
    let (scheduler, stats, _) = build(oracle, 3, &dir).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let prospector = Prospector::new(scheduler, stats, 2).with_report_sender(tx);

    let summary = prospector.run(controller.subscribe()).await;
    assert_eq!(summary.batches_completed, 3);
    assert_eq!(summary.next_round, 10);

    let mut rounds = Vec::new();
    let mut bases = Vec::new();
    while let Ok(report) = rx.try_recv() {
        assert_eq!(report.reports.len(), 3);
        bases.push(report.round_base);
        rounds.extend(report.reports.iter().map(|r| r.round));
    }
    assert_eq!(bases, vec![1, 4, 7]);
    assert_eq!(rounds, (1..=9).collect::<Vec<u64>>());
    assert!(rounds.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_shutdown_before_start_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, stats, _) = build(Arc::new(ScriptedOracle::new(&[])), 3, &dir).await;
    let controller = ShutdownController::new();
    controller.shutdown();

    let summary = Prospector::new(scheduler, stats.clone(), 0)
        .run(controller.subscribe())
        .await;

    assert_eq!(summary.batches_completed, 0);
    assert_eq!(summary.next_round, 1);
    assert_eq!(stats.snapshot().candidates, 0);
}

#[tokio::test]
async fn test_zero_balances_leave_log_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (scheduler, _stats, path) = build(Arc::new(ScriptedOracle::new(&[])), 4, &dir).await;

    let report = scheduler.run_batch(1).await;

    assert!(report.reports.iter().all(|r| r.outcome == RecordOutcome::NotSaved));
    assert!(std::fs::read_to_string(&path).unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_report_receiver_does_not_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let controller = Arc::new(ShutdownController::new());
    let oracle = Arc::new(InterruptingOracle {
        controller: controller.clone(),
        trigger_on_call: 4,
        calls: AtomicUsize::new(0),
    });
    let (scheduler, stats, _) = build(oracle, 3, &dir).await;
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let prospector = Prospector::new(scheduler, stats.clone(), 0).with_report_sender(tx);
    let logs = LogCapture::default();
    let _guard = logs.install();

    let summary = prospector.run(controller.subscribe()).await;

    assert_eq!(summary.batches_completed, 2);
    assert_eq!(stats.snapshot().candidates, 6);
    assert_eq!(logs.count_containing("Batch report receiver dropped"), 2);
    assert_eq!(logs.count_containing("Shutting down gracefully..."), 1);
}

//! Main entry point for the seed prospector
//!
//! Runs the generate-query-record loop until SIGINT or SIGTERM.

use anyhow::Result;
use seed_prospector::{
    BatchScheduler, CandidateGenerator, Erc20BalanceClient, HitLog, HitRecorder, Prospector,
    ScanStats, ScannerConfig, ShutdownController,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting seed prospector");

    let config = ScannerConfig::load()?;
    info!(
        "Querying {} balances of {} via {}",
        config.token_symbol, config.token_contract, config.rpc_url
    );

    let oracle = Arc::new(Erc20BalanceClient::from_config(&config)?);
    let hit_log = Arc::new(HitLog::open(&config.hit_log_path, config.token_symbol.clone()).await?);
    let stats = Arc::new(ScanStats::new());

    let scheduler = BatchScheduler::new(
        CandidateGenerator::new(config.word_count, config.derivation_path.clone()),
        oracle,
        HitRecorder::new(hit_log, stats.clone()),
        stats.clone(),
        config.batch_size,
    );
    let prospector = Prospector::new(scheduler, stats, config.stats_interval_batches);

    let controller = Arc::new(ShutdownController::new());
    let shutdown = controller.subscribe();
    let signal_handle = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.wait_for_signal().await;
        })
    };

    let summary = prospector.run(shutdown).await;
    signal_handle.abort();

    info!(
        "Completed {} batches, last round {}",
        summary.batches_completed,
        summary.next_round.saturating_sub(1)
    );
    Ok(())
}

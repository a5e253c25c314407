//! Append-only durable log of positive balance hits.
//!
//! Every append holds an async mutex over the open file handle for the whole
//! write, so concurrent writers never interleave bytes. The guard is dropped on
//! every exit path, including I/O errors. A write that fails partway is rolled
//! back to the previous file length, so the log only ever holds whole records.

use crate::types::HitRecord;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Shared writer for the hit log file.
pub struct HitLog {
    path: PathBuf,
    symbol: String,
    file: Mutex<File>,
}

impl HitLog {
    /// Open (or create) the log at `path` in append mode.
    pub async fn open(path: impl AsRef<Path>, symbol: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open hit log {}", path.display()))?;

        info!("Hit log opened at {}", path.display());

        Ok(Self {
            path,
            symbol: symbol.into(),
            file: Mutex::new(file),
        })
    }

    /// Append one record as a single write, then flush it to disk.
    #[instrument(skip_all, fields(address = %record.address))]
    pub async fn append(&self, record: &HitRecord) -> Result<()> {
        let block = record.to_log_block(&self.symbol);

        let mut file = self.file.lock().await;
        let committed_len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat hit log {}", self.path.display()))?
            .len();

        if let Err(e) = write_block(&mut file, block.as_bytes()).await {
            if let Err(rollback) = truncate_to(&mut file, committed_len).await {
                warn!(
                    "Failed to roll back hit log {} to {} bytes: {:#}",
                    self.path.display(),
                    committed_len,
                    rollback
                );
            }
            return Err(e).with_context(|| format!("Failed to append to hit log {}", self.path.display()));
        }

        debug!("Appended hit for {} to {}", record.address, self.path.display());
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

async fn write_block(file: &mut File, block: &[u8]) -> Result<()> {
    file.write_all(block).await.context("Failed to write record")?;
    file.flush().await.context("Failed to flush record")?;
    file.sync_data().await.context("Failed to sync record")?;
    Ok(())
}

/// Drop any bytes a failed write left past `len`.
async fn truncate_to(file: &mut File, len: u64) -> Result<()> {
    file.set_len(len).await.context("Failed to truncate")?;
    file.sync_data().await.context("Failed to sync truncation")?;
    Ok(())
}

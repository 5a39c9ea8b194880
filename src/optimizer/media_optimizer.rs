//! # Media Optimizer Main Orchestrator
//!
//! Batch driver della compressione degli asset.
//!
//! ## Flusso di una run:
//! 1. Verifica che la root degli asset esista (fatale altrimenti)
//! 2. Ricrea da zero la root compressa (rimozione + creazione, fatale se fallisce)
//! 3. Enumera tutti i file e li divide in batch consecutivi da `batch_size`
//! 4. Ogni batch è un fan-out `join_all` sul task del driver: nessun `tokio::spawn`,
//!    il batch successivo parte solo quando tutti i file del precedente sono finiti
//! 5. Dopo ogni batch logga `Processed X of Y files` e avanza la progress bar
//!
//! Gli errori per-file finiscono in `RunSummary::failures`, non interrompono la run.

use crate::{
    config::Config,
    error::FileFailure,
    file_manager::FileManager,
    optimizer::{
        progress_tracker::{BatchProgress, ProgressTracker},
        task_optimizer::TaskOptimizer,
    },
    progress::OptimizationStats,
};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything a compression run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_files: usize,
    pub batches: Vec<BatchProgress>,
    pub stats: OptimizationStats,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

/// Main orchestrator
pub struct MediaOptimizer {
    config: Config,
    task: TaskOptimizer,
    show_progress: bool,
}

impl MediaOptimizer {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let task = TaskOptimizer::new(&config);
        Ok(Self {
            config,
            task,
            show_progress: true,
        })
    }

    /// Disable the progress bar (tests, piped output)
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline once
    pub async fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let asset_root = &self.config.asset_root;
        let compressed_root = &self.config.compressed_root;

        let metadata = tokio::fs::metadata(asset_root)
            .await
            .with_context(|| format!("Asset directory {} not found", asset_root.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("Asset root {} is not a directory", asset_root.display());
        }

        self.reset_output_root().await?;

        info!("🔍 Scanning {}", asset_root.display());
        let files = FileManager::collect_files(asset_root);
        let total_files = files.len();
        info!("Found {} files to process", total_files);

        self.task.begin_run();
        let mut tracker = ProgressTracker::new(total_files, self.show_progress);

        for batch in files.chunks(self.config.batch_size) {
            debug!("Starting batch of {} files", batch.len());

            let outcomes = join_all(batch.iter().map(|path| self.task.process_file(path))).await;

            for outcome in outcomes {
                tracker.record(outcome);
            }
            tracker.finish_batch(batch.len());
        }

        let (stats, failures, batches) = tracker.finish();
        let elapsed = start_time.elapsed();

        info!("✅ Asset compression complete!");
        info!("Original assets: {}", asset_root.display());
        info!("Compressed assets: {}", compressed_root.display());
        info!("📊 {}", stats.format_summary());
        if !failures.is_empty() {
            warn!("{} files failed, see the log above for details", failures.len());
        }

        Ok(RunSummary {
            total_files,
            batches,
            stats,
            failures,
            elapsed,
        })
    }

    /// Remove the compressed tree from any previous run and recreate it empty
    async fn reset_output_root(&self) -> Result<()> {
        let compressed_root = &self.config.compressed_root;

        match tokio::fs::remove_dir_all(compressed_root).await {
            Ok(()) => info!("🧹 Cleaned existing compressed directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove {}", compressed_root.display())
                });
            }
        }

        tokio::fs::create_dir_all(compressed_root)
            .await
            .with_context(|| format!("Failed to create {}", compressed_root.display()))?;
        info!("📁 Created compressed directory: {}", compressed_root.display());
        Ok(())
    }
}

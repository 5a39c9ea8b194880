//! # Progress Tracking Module
//!
//! Tiene insieme progress bar, statistiche cumulative e lista dei fallimenti.
//! Viene aggiornato solo tra un batch e l'altro, dal task del driver:
//! nessun lock necessario.

use crate::{
    config::VideoMode,
    error::FileFailure,
    optimizer::task_optimizer::FileOutcome,
    progress::{OptimizationStats, ProgressManager},
    video_processor::ProcessedVideo,
};
use tracing::info;

/// Snapshot emitted after each batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch_index: usize,
    pub batch_len: usize,
    pub processed: usize,
    pub total: usize,
}

pub struct ProgressTracker {
    total_files: usize,
    processed: usize,
    stats: OptimizationStats,
    failures: Vec<FileFailure>,
    batches: Vec<BatchProgress>,
    progress_manager: Option<ProgressManager>,
}

impl ProgressTracker {
    /// `show_bar` is false for tests and non-interactive runs
    pub fn new(total_files: usize, show_bar: bool) -> Self {
        Self {
            total_files,
            processed: 0,
            stats: OptimizationStats::new(),
            failures: Vec::new(),
            batches: Vec::new(),
            progress_manager: show_bar.then(|| ProgressManager::new(total_files as u64)),
        }
    }

    /// Fold one file outcome into the stats
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Image(image) => {
                let output_size = image.compressed_size + image.webp_size.unwrap_or(0);
                self.stats
                    .add_image(image.original_size, output_size, image.webp.is_some());
            }
            FileOutcome::Video(ProcessedVideo {
                original_size,
                output_size,
                mode,
                ..
            }) => {
                self.stats
                    .add_video(original_size, output_size, mode == VideoMode::Transcode);
            }
            FileOutcome::Ignored(_) => self.stats.add_ignored(),
            FileOutcome::Failed(failure) => {
                self.stats.add_error();
                self.failures.push(failure);
            }
        }
    }

    /// Close a batch and report cumulative progress
    pub fn finish_batch(&mut self, batch_len: usize) -> BatchProgress {
        self.processed += batch_len;
        let report = BatchProgress {
            batch_index: self.batches.len() + 1,
            batch_len,
            processed: self.processed,
            total: self.total_files,
        };
        self.batches.push(report);

        info!("Processed {} of {} files", report.processed, report.total);
        if let Some(ref bar) = self.progress_manager {
            bar.set_position(
                report.processed as u64,
                &format!("batch {} done", report.batch_index),
            );
        }
        report
    }

    pub fn batches(&self) -> &[BatchProgress] {
        &self.batches
    }

    /// Close the bar and hand back everything collected
    pub fn finish(self) -> (OptimizationStats, Vec<FileFailure>, Vec<BatchProgress>) {
        if let Some(ref bar) = self.progress_manager {
            bar.finish(&self.stats.format_summary());
        }
        (self.stats, self.failures, self.batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::task_optimizer::IgnoreReason;
    use std::path::PathBuf;

    #[test]
    fn test_batch_reports_are_cumulative() {
        let mut tracker = ProgressTracker::new(12, false);
        let reported: Vec<usize> = [5, 5, 2]
            .iter()
            .map(|len| tracker.finish_batch(*len).processed)
            .collect();

        assert_eq!(reported, vec![5, 10, 12]);
        assert_eq!(tracker.batches().len(), 3);
        assert_eq!(tracker.batches()[2].batch_index, 3);
        assert!(tracker.batches().iter().all(|b| b.total == 12));
    }

    #[test]
    fn test_outcomes_are_counted() {
        let mut tracker = ProgressTracker::new(3, false);
        tracker.record(FileOutcome::Ignored(IgnoreReason::Hidden));
        tracker.record(FileOutcome::Video(ProcessedVideo {
            source: PathBuf::from("a.mp4"),
            output: PathBuf::from("b.mp4"),
            original_size: 100,
            output_size: 100,
            mode: VideoMode::Copy,
        }));
        tracker.record(FileOutcome::Failed(FileFailure::new(
            "broken.png",
            &anyhow::anyhow!("decode error"),
        )));

        let (stats, failures, _) = tracker.finish();
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_ignored, 1);
        assert_eq!(stats.videos_copied, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, PathBuf::from("broken.png"));
    }
}

//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche di compressione.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif`, avanzata a fine di ogni batch
//! - `OptimizationStats`: contatori cumulativi della run
//!
//! ## Statistiche tracciate:
//! - **files_processed**: file visitati (inclusi ignorati e falliti)
//! - **images_compressed** / **webp_created**: output immagine scritti
//! - **videos_copied** / **videos_transcoded**: output video scritti
//! - **files_ignored**: file nascosti o con estensione non gestita
//! - **errors**: file falliti (la run continua comunque)
//! - **total_original_size** / **total_output_size**: byte dei soli file scritti
//!
//! ## Visual feedback:
//! ```text
//! [00:00:04] [========================>---------------] 10/12 (83%) batch 2 done
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages the progress bar for a compression run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        Self { bar }
    }

    /// Move the bar to an absolute position with a message
    pub fn set_position(&self, position: u64, message: &str) {
        self.bar.set_position(position);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for a compression run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptimizationStats {
    pub files_processed: usize,
    pub images_compressed: usize,
    pub webp_created: usize,
    pub videos_copied: usize,
    pub videos_transcoded: usize,
    pub files_ignored: usize,
    pub errors: usize,
    pub total_original_size: u64,
    pub total_output_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, original_size: u64, output_size: u64, has_webp: bool) {
        self.files_processed += 1;
        self.images_compressed += 1;
        if has_webp {
            self.webp_created += 1;
        }
        self.total_original_size += original_size;
        self.total_output_size += output_size;
    }

    pub fn add_video(&mut self, original_size: u64, output_size: u64, transcoded: bool) {
        self.files_processed += 1;
        if transcoded {
            self.videos_transcoded += 1;
        } else {
            self.videos_copied += 1;
        }
        self.total_original_size += original_size;
        self.total_output_size += output_size;
    }

    pub fn add_ignored(&mut self) {
        self.files_processed += 1;
        self.files_ignored += 1;
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_output_size)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_original_size, self.total_output_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Images: {} (+{} WebP) | Videos: {} copied, {} transcoded | Ignored: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.images_compressed,
            self.webp_created,
            self.videos_copied,
            self.videos_transcoded,
            self.files_ignored,
            self.errors,
            FileManager::format_size(self.bytes_saved()),
            self.overall_reduction_percent()
        )
    }
}

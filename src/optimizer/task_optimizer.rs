//! # Task Optimizer Module
//!
//! Worker per l'elaborazione di un singolo file.
//! Decide il routing (immagine, video, ignorato) e trasforma ogni errore in un
//! `FileOutcome::Failed`: nessun errore per-file risale fino al batch.

use crate::{
    config::Config,
    error::FileFailure,
    file_manager::{FileManager, MediaKind},
    image_processor::{CompressedImage, ImageProcessor},
    optimizer::path_resolver::PathResolver,
    utils::display_relative,
    video_processor::{ProcessedVideo, VideoProcessor},
};
use anyhow::Context;
use std::path::Path;
use tracing::{debug, error, info};

/// Why a file was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Hidden,
    UnsupportedExtension,
}

/// What happened to one file of a batch
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Image(CompressedImage),
    Video(ProcessedVideo),
    Ignored(IgnoreReason),
    Failed(FileFailure),
}

/// Routes single files to the image or video processor
pub struct TaskOptimizer {
    image_processor: ImageProcessor,
    video_processor: VideoProcessor,
    paths: PathResolver,
}

impl TaskOptimizer {
    pub fn new(config: &Config) -> Self {
        Self {
            image_processor: ImageProcessor::new(config.clone()),
            video_processor: VideoProcessor::new(config.clone()),
            paths: PathResolver::new(&config.asset_root, &config.compressed_root),
        }
    }

    /// Start a new run: `.webp` names written by the previous one are free again
    pub fn begin_run(&self) {
        self.image_processor.reset_webp_claims();
    }

    /// Process one file. Never fails: errors become `FileOutcome::Failed`.
    pub async fn process_file(&self, file_path: &Path) -> FileOutcome {
        if FileManager::is_hidden(file_path) {
            debug!("Skipping hidden file: {}", file_path.display());
            return FileOutcome::Ignored(IgnoreReason::Hidden);
        }

        let relative = display_relative(file_path, self.paths.asset_root());

        match FileManager::classify(file_path) {
            MediaKind::Image(_) => match self.compress_image(file_path).await {
                Ok(image) => {
                    if let Some(ref webp) = image.webp {
                        info!(
                            "Created WebP: {}",
                            display_relative(webp, self.paths.compressed_root())
                        );
                    }
                    info!(
                        "Compressed: {} ({:.2}% reduction)",
                        relative, image.reduction_percent
                    );
                    FileOutcome::Image(image)
                }
                Err(e) => {
                    error!("Error compressing {}: {:#}", relative, e);
                    FileOutcome::Failed(FileFailure::new(file_path, &e))
                }
            },
            MediaKind::Video => match self.process_video(file_path).await {
                Ok(Some(video)) => {
                    info!("Handled video ({:?}): {}", video.mode, relative);
                    FileOutcome::Video(video)
                }
                Ok(None) => FileOutcome::Ignored(IgnoreReason::UnsupportedExtension),
                Err(e) => {
                    error!("Error compressing video {}: {:#}", relative, e);
                    FileOutcome::Failed(FileFailure::new(file_path, &e))
                }
            },
            MediaKind::Other => {
                debug!("Ignoring unsupported file: {}", relative);
                FileOutcome::Ignored(IgnoreReason::UnsupportedExtension)
            }
        }
    }

    async fn compress_image(&self, file_path: &Path) -> anyhow::Result<CompressedImage> {
        let output_dir = self.paths.output_dir(file_path)?;
        self.image_processor
            .compress(file_path, &output_dir)
            .await
            .with_context(|| format!("Image compression failed for {}", file_path.display()))
    }

    async fn process_video(&self, file_path: &Path) -> anyhow::Result<Option<ProcessedVideo>> {
        let output_dir = self.paths.output_dir(file_path)?;
        self.video_processor
            .process(file_path, &output_dir)
            .await
            .with_context(|| format!("Video handling failed for {}", file_path.display()))
    }
}

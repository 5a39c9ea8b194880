//! # File Management Module
//!
//! Questo modulo gestisce l'enumerazione dei file e la classificazione dei media.
//!
//! ## Responsabilità:
//! - Walk ricorsivo e lazy (depth-first) dell'albero degli asset
//! - Determinazione tipo file (immagine vs video vs altro)
//! - Riconoscimento file nascosti (`.DS_Store` e simili)
//! - Utilità per calcoli dimensioni e percentuali
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, GIF
//! - **Video**: MP4, MOV, AVI, WebM
//!
//! ## Directory non leggibili:
//! `walk_files()` non si ferma: produce un `Err` per la sottodirectory illeggibile
//! e continua con il resto dell'albero. Chi consuma l'iteratore decide cosa farne;
//! il batch driver logga un warning e salta il sottoalbero.
//!
//! ## Esempio:
//! ```ignore
//! for entry in FileManager::walk_files(&assets) {
//!     let path = entry?;
//!     match FileManager::classify(&path) {
//!         MediaKind::Image(format) => { /* transcode */ }
//!         MediaKind::Video => { /* copy or transcode */ }
//!         MediaKind::Other => {}
//!     }
//! }
//! ```

use crate::error::OptimizeError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Image families the transcoder knows how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Whether a WebP rendition can be derived from this format
    pub fn supports_webp(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// What the batch driver does with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image(ImageFormat),
    Video,
    Other,
}

/// Manages file enumeration and classification
pub struct FileManager;

impl FileManager {
    /// Lazily walk every non-directory entry under `root`, depth-first.
    ///
    /// Order is whatever the directory listing yields. Errors for unreadable
    /// directories are yielded in place and the walk continues.
    pub fn walk_files(root: &Path) -> impl Iterator<Item = Result<PathBuf, OptimizeError>> {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(Ok(entry.into_path())),
                Err(e) => Some(Err(OptimizeError::Walk(e))),
            })
    }

    /// Walk `root` and keep only readable entries, logging what was skipped
    pub fn collect_files(root: &Path) -> Vec<PathBuf> {
        Self::walk_files(root)
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Check if a file name starts with a dot
    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    }

    /// Lowercase extension without the dot
    pub fn extension(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Classify a file by extension (case-insensitive)
    pub fn classify(path: &Path) -> MediaKind {
        match Self::extension(path).as_deref() {
            Some("jpg") | Some("jpeg") => MediaKind::Image(ImageFormat::Jpeg),
            Some("png") => MediaKind::Image(ImageFormat::Png),
            Some("gif") => MediaKind::Image(ImageFormat::Gif),
            Some("mp4") | Some("mov") | Some("avi") | Some("webm") => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        Self::classify(path) == MediaKind::Video
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction. Negative when the output grew.
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori della pipeline
//! - Integra con `thiserror` per automatic error conversion
//! - Fornisce `FileFailure`, il record di un errore per-file raccolto dal batch driver
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Walk`: Directory non leggibili durante l'enumerazione
//! - `Image`: Errori di decodifica/codifica immagini
//! - `WebpEncode`: Errori dell'encoder WebP
//! - `FFmpeg`: Errori di transcodifica video
//! - `Timeout`: Tool esterno che non termina in tempo
//! - `UnsupportedFormat`: Formato file non gestito dal processore
//! - `MissingDependency`: Tool esterno mancante (ffmpeg)
//! - `Validation`: Errori di validazione configurazione
//!
//! ## Politica:
//! Solo gli errori di setup (config, root mancante, ricreazione output) sono fatali.
//! Tutto il resto diventa un `FileFailure` e la run continua.

use std::path::PathBuf;

/// Custom error types for asset compression
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WebP encoding error: {0}")]
    WebpEncode(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Configuration error: {0}")]
    Validation(String),
}

/// A single file that could not be processed. Collected, never escalated.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, error: &anyhow::Error) -> Self {
        Self {
            path: path.into(),
            // `{:#}` keeps the context chain on one line
            message: format!("{:#}", error),
        }
    }
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

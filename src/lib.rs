//! # Asset Squeezer Library
//!
//! Modulo principale della libreria: espone le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi principali tramite re-exports
//! - Fornisce un'interfaccia pulita per main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: configurazione immutabile e validazione parametri
//! - `error`: tipi di errore custom e fallimenti per-file
//! - `file_manager`: enumerazione lazy dell'albero e classificazione media
//! - `image_processor` / `resize`: resize-to-fit e ricodifica JPEG/PNG/WebP
//! - `video_processor`: copia o transcodifica FFmpeg dei video
//! - `optimizer`: batch driver della compressione
//! - `import_rewriter`: riscrittura dei riferimenti agli asset nel codice sorgente
//! - `platform`: risoluzione degli eseguibili esterni
//! - `progress`: progress bar e statistiche
//!
//! ## Utilizzo:
//! ```ignore
//! use asset_squeezer::{Config, MediaOptimizer};
//!
//! let optimizer = MediaOptimizer::new(Config::default())?;
//! let summary = optimizer.run().await?;
//! println!("{}", summary.stats.format_summary());
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod import_rewriter;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod resize;
pub mod utils;
pub mod video_processor;

pub use config::{Config, ConfigFile, RewriteConfig};
pub use error::{FileFailure, OptimizeError};
pub use import_rewriter::{ImportRewriter, RewriteReport};
pub use optimizer::{MediaOptimizer, RunSummary};

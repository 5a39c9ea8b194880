//! # Optimizer Module
//!
//! Pipeline di compressione suddivisa in sottomoduli:
//! - `media_optimizer`: batch driver (ricrea l'output, batch sequenziali, riepilogo)
//! - `task_optimizer`: routing del singolo file verso immagini o video
//! - `progress_tracker`: statistiche, fallimenti e report per batch
//! - `path_resolver`: mapping sorgente -> albero compresso

pub mod media_optimizer;
pub mod path_resolver;
pub mod progress_tracker;
pub mod task_optimizer;

pub use media_optimizer::{MediaOptimizer, RunSummary};
pub use path_resolver::PathResolver;
pub use progress_tracker::{BatchProgress, ProgressTracker};
pub use task_optimizer::{FileOutcome, IgnoreReason, TaskOptimizer};

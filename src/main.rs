//! # Asset Squeezer - Main Entry Point
//!
//! Punto di ingresso della CLI.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti con `clap` (sottocomandi `compress` e `rewrite-imports`)
//! - Inizializzazione del logging `tracing` (`RUST_LOG`, default INFO, DEBUG con `-v`)
//! - Caricamento della configurazione JSON opzionale e applicazione degli override CLI
//! - Avvio della passata richiesta e stampa del riepilogo
//!
//! I fallimenti per-file non cambiano l'exit code: solo gli errori fatali
//! (configurazione, root mancanti, ricreazione output) terminano con errore.
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-squeezer compress --assets src/assets --output src/assets-compressed --batch-size 5
//! asset-squeezer rewrite-imports --src src --helper src/utils/imageUtils.js
//! ```

use anyhow::Result;
use asset_squeezer::{
    config::{ConfigFile, ProbeStyle, VideoMode, VideoPreset},
    platform::PlatformCommands,
    Config, ImportRewriter, MediaOptimizer, RewriteConfig,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asset-squeezer")]
#[command(about = "Compress web assets into a mirrored tree and point imports at it")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (`compress` and `rewrite` sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the compressed asset tree
    Compress(CompressArgs),
    /// Point asset imports in source files at the compressed tree
    RewriteImports(RewriteArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Source asset directory
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Output directory (removed and recreated on every run)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// PNG compression effort (0-9)
    #[arg(long)]
    png_level: Option<u8>,

    /// Maximum image width
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum image height
    #[arg(long)]
    max_height: Option<u32>,

    /// Do not write .webp renditions
    #[arg(long)]
    no_webp: bool,

    /// WebP quality (1-100)
    #[arg(long)]
    webp_quality: Option<u8>,

    /// copy or transcode
    #[arg(long)]
    video_mode: Option<VideoMode>,

    /// Video CRF value (0-51, lower = better quality)
    #[arg(long)]
    crf: Option<u8>,

    /// x264 preset (ultrafast ... veryslow)
    #[arg(long)]
    preset: Option<VideoPreset>,

    /// Files processed concurrently per batch
    #[arg(short, long)]
    batch_size: Option<usize>,
}

#[derive(Args, Debug)]
struct RewriteArgs {
    /// Application source directory
    #[arg(long)]
    src: Option<PathBuf>,

    /// Also point JPEG/PNG references at their .webp renditions
    #[arg(long)]
    webp_extensions: bool,

    /// Generate the WebP helper module at this path
    #[arg(long)]
    helper: Option<PathBuf>,

    /// Use the synchronous canvas probe in the helper
    #[arg(long)]
    sync_probe: bool,
}

impl CompressArgs {
    fn apply(self, config: &mut Config) {
        if let Some(assets) = self.assets {
            config.asset_root = assets;
        }
        if let Some(output) = self.output {
            config.compressed_root = output;
        }
        if let Some(quality) = self.quality {
            config.image_quality = quality;
        }
        if let Some(level) = self.png_level {
            config.png_compression_level = level;
        }
        if let Some(width) = self.max_width {
            config.max_width = width;
        }
        if let Some(height) = self.max_height {
            config.max_height = height;
        }
        if self.no_webp {
            config.create_webp = false;
        }
        if let Some(quality) = self.webp_quality {
            config.webp_quality = quality;
        }
        if let Some(mode) = self.video_mode {
            config.video_mode = mode;
        }
        if let Some(crf) = self.crf {
            config.video_crf = crf;
        }
        if let Some(preset) = self.preset {
            config.video_preset = preset;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
    }
}

impl RewriteArgs {
    fn apply(self, config: &mut RewriteConfig) {
        if let Some(src) = self.src {
            config.source_root = src;
        }
        if self.webp_extensions {
            config.rewrite_to_webp = true;
        }
        if self.helper.is_some() || self.sync_probe {
            let mut helper = config.helper.take().unwrap_or_default();
            if let Some(path) = self.helper {
                helper.path = path;
            }
            if self.sync_probe {
                helper.probe = ProbeStyle::Sync;
            }
            config.helper = Some(helper);
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let platform = PlatformCommands::instance();
    debug!("Running on {}", PlatformCommands::system_info());
    for tool in ["ffmpeg", "oxipng", "jpegtran"] {
        debug!("{} available: {}", tool, platform.is_command_available(tool));
    }

    let mut config_file = match cli.config {
        Some(ref path) => ConfigFile::from_file(path).await?,
        None => ConfigFile::default(),
    };

    match cli.command {
        Command::Compress(args) => {
            args.apply(&mut config_file.compress);
            let optimizer = MediaOptimizer::new(config_file.compress)?;
            let summary = optimizer.run().await?;

            println!(
                "{} files in {} batches, {:.1}s",
                summary.total_files,
                summary.batches.len(),
                summary.elapsed.as_secs_f64()
            );
            println!("{}", summary.stats.format_summary());
            for failure in &summary.failures {
                warn!("Failed: {}", failure);
            }
        }
        Command::RewriteImports(args) => {
            args.apply(&mut config_file.rewrite);
            let rewriter = ImportRewriter::new(config_file.rewrite)?;
            let report = rewriter.run().await?;

            println!(
                "Updated imports in {} of {} files ({} references)",
                report.files_updated.len(),
                report.files_scanned,
                report.counts.total()
            );
            if report.helper_written {
                info!("WebP helper regenerated");
            }
            for failure in &report.failures {
                warn!("Failed: {}", failure);
            }
        }
    }

    Ok(())
}

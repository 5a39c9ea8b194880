//! # Video Processing Module
//!
//! Questo modulo gestisce i video dell'albero degli asset.
//!
//! ## Modalità (`Config::video_mode`):
//! - **copy** (default): copia byte-per-byte nel tree compresso, stesso path relativo.
//!   È la modalità sicura: la ricodifica storicamente falliva con dimensioni dispari.
//! - **transcode**: ricodifica con FFmpeg usando CRF e preset configurati.
//!
//! ## Pipeline di transcodifica:
//! 1. Risolve `ffmpeg` nel PATH (errore `MissingDependency` se assente)
//! 2. Scrive su un file temporaneo nella directory di destinazione
//! 3. Filtro di scala che limita a `max_video_width x max_video_height` e
//!    arrotonda larghezza/altezza al numero pari inferiore (libx264 li richiede pari)
//! 4. Persiste il temporaneo sul path finale solo in caso di successo
//! 5. Timeout per-video (`video_timeout_secs`), il processo viene killato allo scadere
//!
//! ## Codec:
//! - MP4 / MOV / AVI: libx264 + AAC
//! - WebM: libvpx-vp9 + Opus (il container non accetta H.264/AAC)
//!
//! ## Esempio:
//! ```ignore
//! let processor = VideoProcessor::new(config);
//! if let Some(video) = processor.process(&path, &output_dir).await? {
//!     info!("{} -> {}", video.source.display(), video.output.display());
//! }
//! ```

use crate::config::{Config, VideoMode};
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::platform::PlatformCommands;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Result of handling one video
#[derive(Debug, Clone)]
pub struct ProcessedVideo {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub output_size: u64,
    pub mode: VideoMode,
}

/// Handles video copy/transcode
pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Copy or transcode `input` into `output_dir`.
    ///
    /// Returns `Ok(None)` for files that are not videos.
    pub async fn process(&self, input: &Path, output_dir: &Path) -> Result<Option<ProcessedVideo>> {
        if !FileManager::is_video(input) {
            return Ok(None);
        }

        let file_name = input
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input.display()))?;
        let output = output_dir.join(file_name);

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let original_size = tokio::fs::metadata(input).await?.len();

        match self.config.video_mode {
            VideoMode::Copy => {
                tokio::fs::copy(input, &output).await?;
            }
            VideoMode::Transcode => {
                let secs = self.config.video_timeout_secs;
                tokio::time::timeout(Duration::from_secs(secs), self.transcode(input, &output))
                    .await
                    .map_err(|_| OptimizeError::Timeout { tool: "ffmpeg".to_string(), secs })??;
            }
        }

        let output_size = tokio::fs::metadata(&output).await?.len();

        Ok(Some(ProcessedVideo {
            source: input.to_path_buf(),
            output,
            original_size,
            output_size,
            mode: self.config.video_mode,
        }))
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let platform = PlatformCommands::instance();
        let ffmpeg = platform.get_tool_path("ffmpeg").ok_or_else(|| {
            OptimizeError::MissingDependency("ffmpeg is required for video transcoding".to_string())
        })?;

        let output_dir = output.parent().unwrap_or(Path::new("."));
        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        // same directory as the destination so persist() is a rename
        let temp_file = tempfile::Builder::new()
            .prefix(".transcode-")
            .suffix(&suffix)
            .tempfile_in(output_dir)?;

        let args = self.ffmpeg_args(input, temp_file.path());
        debug!("Running ffmpeg {:?}", args);

        let start_time = Instant::now();
        let mut cmd = Command::new(&ffmpeg);
        cmd.args(&args).kill_on_drop(true);
        let result = cmd
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute {}: {}", ffmpeg.display(), e))?;

        if !result.status.success() {
            return Err(OptimizeError::FFmpeg(format!(
                "{} after {:.1}s: {}",
                result.status,
                start_time.elapsed().as_secs_f64(),
                String::from_utf8_lossy(&result.stderr).trim()
            ))
            .into());
        }

        temp_file
            .persist(output)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move transcoded video to {}", output.display()))?;

        debug!(
            "Video transcoded in {:.1}s: {}",
            start_time.elapsed().as_secs_f64(),
            output.display()
        );
        Ok(())
    }

    /// Full ffmpeg argument list for one transcode
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let config = &self.config;
        let mut args = crate::args!["-nostdin", "-y", "-i", input.display()];

        let is_webm = FileManager::extension(output).as_deref() == Some("webm");
        if is_webm {
            args.extend(crate::args![
                "-c:v", "libvpx-vp9",
                "-crf", config.video_crf,
                "-b:v", "0",
                "-c:a", "libopus",
                "-b:a", config.audio_bitrate,
            ]);
        } else {
            args.extend(crate::args![
                "-c:v", "libx264",
                "-crf", config.video_crf,
                "-preset", config.video_preset,
                "-c:a", "aac",
                "-b:a", config.audio_bitrate,
            ]);
        }

        args.extend(crate::args!["-vf", self.scale_filter()]);

        if tracing::enabled!(tracing::Level::DEBUG) {
            args.extend(crate::args!["-loglevel", "info"]);
        } else {
            args.extend(crate::args!["-loglevel", "warning"]);
        }

        args.push(output.display().to_string());
        args
    }

    /// Downscale to the configured bounds, then force even dimensions
    fn scale_filter(&self) -> String {
        format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease,scale=trunc(iw/2)*2:trunc(ih/2)*2",
            self.config.max_video_width, self.config.max_video_height
        )
    }
}

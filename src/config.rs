//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `Config` (compressione asset) e `RewriteConfig` (riscrittura import)
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default identici alle costanti storiche della pipeline
//!
//! ## Parametri di compressione:
//! - `image_quality`: Qualità JPEG (1-100, default: 50)
//! - `png_compression_level`: Sforzo di compressione PNG (0-9, default: 9)
//! - `max_width` / `max_height`: Bounding box per il resize (default: 1000x1000)
//! - `create_webp`: Crea anche una versione WebP (default: true)
//! - `webp_quality`: Qualità WebP (1-100, default: 60)
//! - `video_mode`: `copy` (default) oppure `transcode`
//! - `video_crf`: CRF video (0-51, default: 28, solo transcode)
//! - `video_preset`: Preset x264 (default: medium, solo transcode)
//! - `batch_size`: File elaborati in parallelo per batch (default: 5)
//!
//! ## Validazione:
//! - Qualità 1-100, livello PNG 0-9, CRF 0-51
//! - Dimensioni massime e batch size > 0
//! - Asset root e output root non possono essere annidate: la ricostruzione
//!   dell'output cancellerebbe i sorgenti
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     image_quality: 70,
//!     batch_size: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::OptimizeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How videos are handled during a compression run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoMode {
    /// Verbatim copy into the compressed tree
    #[default]
    Copy,
    /// Re-encode with ffmpeg (H.264 + AAC)
    Transcode,
}

impl FromStr for VideoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "transcode" => Ok(Self::Transcode),
            other => Err(format!("unknown video mode '{}' (expected copy or transcode)", other)),
        }
    }
}

/// x264 speed presets, fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl VideoPreset {
    pub const ALL: [VideoPreset; 9] = [
        Self::Ultrafast,
        Self::Superfast,
        Self::Veryfast,
        Self::Faster,
        Self::Fast,
        Self::Medium,
        Self::Slow,
        Self::Slower,
        Self::Veryslow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for VideoPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == wanted)
            .ok_or_else(|| format!("unknown x264 preset '{}'", s))
    }
}

/// Configuration for a compression run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source asset tree (read-only)
    pub asset_root: PathBuf,
    /// Output tree, fully rebuilt on every run
    pub compressed_root: PathBuf,
    /// JPEG quality (1-100)
    pub image_quality: u8,
    /// PNG compression effort (0-9)
    pub png_compression_level: u8,
    /// Resize bounding box
    pub max_width: u32,
    pub max_height: u32,
    /// Also write a `.webp` sibling for JPEG and PNG inputs
    pub create_webp: bool,
    /// WebP quality (1-100)
    pub webp_quality: u8,
    pub video_mode: VideoMode,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    pub video_preset: VideoPreset,
    /// AAC bitrate passed to ffmpeg
    pub audio_bitrate: String,
    /// Transcode scale bounds; output is always even-sized
    pub max_video_width: u32,
    pub max_video_height: u32,
    pub video_timeout_secs: u64,
    /// Files processed concurrently per batch
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("src/assets"),
            compressed_root: PathBuf::from("src/assets-compressed"),
            image_quality: 50,
            png_compression_level: 9,
            max_width: 1000,
            max_height: 1000,
            create_webp: true,
            webp_quality: 60,
            video_mode: VideoMode::Copy,
            video_crf: 28,
            video_preset: VideoPreset::Medium,
            audio_bitrate: "128k".to_string(),
            max_video_width: 1280,
            max_video_height: 720,
            video_timeout_secs: 600,
            batch_size: 5,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.image_quality == 0 || self.image_quality > 100 {
            return Err(invalid("Image quality must be between 1 and 100"));
        }

        if self.webp_quality == 0 || self.webp_quality > 100 {
            return Err(invalid("WebP quality must be between 1 and 100"));
        }

        if self.png_compression_level > 9 {
            return Err(invalid("PNG compression level must be between 0 and 9"));
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(invalid("Maximum image dimensions must be greater than 0"));
        }

        if self.video_crf > 51 {
            return Err(invalid("Video CRF must be between 0 and 51"));
        }

        if self.max_video_width < 2 || self.max_video_height < 2 {
            return Err(invalid("Maximum video dimensions must be at least 2"));
        }

        if self.batch_size == 0 {
            return Err(invalid("Batch size must be greater than 0"));
        }

        let assets = normalize(&self.asset_root);
        let compressed = normalize(&self.compressed_root);
        if assets.starts_with(&compressed) || compressed.starts_with(&assets) {
            return Err(invalid(&format!(
                "Asset root {} and compressed root {} must not contain each other",
                self.asset_root.display(),
                self.compressed_root.display()
            )));
        }

        Ok(())
    }
}

/// Generated runtime probe flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStyle {
    /// Decode a 1x1 WebP image, bounded by a timeout
    #[default]
    Async,
    /// Ask a canvas for a WebP data URL
    Sync,
}

/// Where and how to generate the WebP helper module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub path: PathBuf,
    pub probe: ProbeStyle,
    pub timeout_ms: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("src/utils/imageUtils.js"),
            probe: ProbeStyle::Async,
            timeout_ms: 1000,
        }
    }
}

/// Configuration for the import rewriting pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Application source tree to scan
    pub source_root: PathBuf,
    /// File extensions (without dot) that are rewritten
    pub extensions: Vec<String>,
    /// Directory segment referenced by the original imports
    pub asset_dir: String,
    /// Replacement directory segment
    pub compressed_dir: String,
    /// Point rewritten JPEG/PNG references at their `.webp` renditions
    pub rewrite_to_webp: bool,
    pub helper: Option<HelperConfig>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src"),
            extensions: vec!["js".to_string(), "jsx".to_string()],
            asset_dir: "assets".to_string(),
            compressed_dir: "assets-compressed".to_string(),
            rewrite_to_webp: false,
            helper: None,
        }
    }
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(invalid("At least one source file extension is required"));
        }

        for name in [&self.asset_dir, &self.compressed_dir] {
            if name.is_empty() || name.contains(['/', '\\', '"', '\'']) {
                return Err(invalid(&format!("Invalid directory segment: '{}'", name)));
            }
        }

        if self.asset_dir == self.compressed_dir {
            return Err(invalid("Asset and compressed directory names must differ"));
        }

        if let Some(ref helper) = self.helper {
            if helper.timeout_ms == 0 {
                return Err(invalid("Helper probe timeout must be greater than 0"));
            }
        }

        Ok(())
    }
}

/// On-disk configuration: both sections are optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub compress: Config,
    pub rewrite: RewriteConfig,
}

impl ConfigFile {
    /// Load configuration from file, falling back to defaults when absent
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)?;
        config.compress.validate()?;
        config.rewrite.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn invalid(message: &str) -> anyhow::Error {
    OptimizeError::Validation(message.to_string()).into()
}

/// Best-effort absolute form of a path that may not exist yet
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => normalize(parent).join(name),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

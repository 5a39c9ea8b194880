//! # Image Processing Module
//!
//! Questo modulo ricomprime le immagini degli asset in memoria con il crate `image`,
//! più una rendition WebP opzionale con il crate `webp`.
//!
//! ## Formati Supportati
//!
//! | Formato | Resize | Output primario                 | WebP |
//! |---------|--------|---------------------------------|------|
//! | JPEG    | ✅     | JPEG lossy (`image_quality`)    | ✅   |
//! | PNG     | ✅     | PNG lossless + riduzione colori | ✅   |
//! | GIF     | ❌     | Copia byte-per-byte             | ❌   |
//!
//! Le GIF vengono copiate così come sono: la ricodifica non preserva l'animazione.
//!
//! ## Pipeline di Ottimizzazione
//!
//! 1. **Directory di output**: creata ricorsivamente (idempotente)
//! 2. **Metadata**: lettura dimensioni in pixel
//! 3. **Resize**: solo se supera `max_width x max_height`, mai upscale
//! 4. **Encode**: formato originale con i parametri di qualità configurati
//! 5. **WebP**: stessa immagine ridimensionata, calcolata una sola volta e
//!    riutilizzata per entrambe le codifiche
//! 6. **Report**: percentuale di riduzione rispetto all'originale
//!
//! ## PNG e riduzione palette
//! L'encoder PNG del crate `image` non quantizza. Riduciamo il color type
//! (alpha rimosso se l'immagine è opaca, 16 bit -> 8 bit, grigi -> luma) e,
//! se `oxipng` è installato, lo eseguiamo sull'output per la riduzione palette.
//! Un `oxipng` mancante o fallito non è un errore.
//!
//! ## Concorrenza
//! Decode, resize e encode sono CPU-bound e girano in `spawn_blocking`;
//! le scritture su disco e il processo `oxipng` sono async.

use crate::config::Config;
use crate::error::OptimizeError;
use crate::file_manager::{FileManager, ImageFormat, MediaKind};
use crate::optimizer::path_resolver::PathResolver;
use crate::platform::PlatformCommands;
use crate::resize;
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of compressing a single image
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Sibling `.webp` rendition, when one was written
    pub webp: Option<PathBuf>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub webp_size: Option<u64>,
    /// `None` for pass-through formats that are never decoded
    pub original_dimensions: Option<(u32, u32)>,
    pub output_dimensions: Option<(u32, u32)>,
    pub reduction_percent: f64,
}

/// Encoded bytes produced off the async runtime
struct EncodedImage {
    original_dimensions: (u32, u32),
    output_dimensions: (u32, u32),
    primary: Vec<u8>,
    webp: Option<Vec<u8>>,
}

/// Knobs the blocking encoder needs, copied out of `Config`
#[derive(Debug, Clone, Copy)]
struct EncodeSettings {
    format: ImageFormat,
    max_width: u32,
    max_height: u32,
    image_quality: u8,
    png_compression_level: u8,
    webp_quality: Option<u8>,
}

/// Resizes and re-encodes images according to `Config`
pub struct ImageProcessor {
    config: Config,
    /// `.webp` paths already written in this run
    webp_claims: Mutex<HashSet<PathBuf>>,
}

impl ImageProcessor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            webp_claims: Mutex::new(HashSet::new()),
        }
    }

    /// Forget the `.webp` names claimed by a previous run
    pub fn reset_webp_claims(&self) {
        if let Ok(mut claims) = self.webp_claims.lock() {
            claims.clear();
        }
    }

    fn claim_webp(&self, path: &Path) -> bool {
        self.webp_claims
            .lock()
            .map(|mut claims| claims.insert(path.to_path_buf()))
            .unwrap_or(false)
    }

    fn release_webp(&self, path: &Path) {
        if let Ok(mut claims) = self.webp_claims.lock() {
            claims.remove(path);
        }
    }

    /// Compress `input` into `output_dir`, keeping its file name.
    ///
    /// `photo.jpg` and `photo.png` share `photo.webp`: the first source that
    /// gets as far as writing its rendition keeps the name, the other one
    /// only gets its primary output.
    pub async fn compress(&self, input: &Path, output_dir: &Path) -> Result<CompressedImage> {
        let format = match FileManager::classify(input) {
            MediaKind::Image(format) => format,
            _ => {
                return Err(OptimizeError::UnsupportedFormat(input.display().to_string()).into());
            }
        };

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let file_name = input
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input.display()))?;
        let output = output_dir.join(file_name);
        let original_size = tokio::fs::metadata(input).await?.len();

        if format == ImageFormat::Gif {
            tokio::fs::copy(input, &output).await?;
            debug!("Copied GIF verbatim: {}", output.display());
            return Ok(CompressedImage {
                source: input.to_path_buf(),
                output,
                webp: None,
                original_size,
                compressed_size: original_size,
                webp_size: None,
                original_dimensions: None,
                output_dimensions: None,
                reduction_percent: 0.0,
            });
        }

        let settings = EncodeSettings {
            format,
            max_width: self.config.max_width,
            max_height: self.config.max_height,
            image_quality: self.config.image_quality,
            png_compression_level: self.config.png_compression_level,
            webp_quality: (self.config.create_webp && format.supports_webp())
                .then_some(self.config.webp_quality),
        };

        let source = input.to_path_buf();
        let encoded = tokio::task::spawn_blocking(move || encode_image(&source, settings))
            .await
            .context("Image encoder task panicked")??;

        tokio::fs::write(&output, &encoded.primary)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        match format {
            ImageFormat::Png => self.run_oxipng(&output).await,
            ImageFormat::Jpeg => self.run_jpegtran(&output).await,
            ImageFormat::Gif => {}
        }

        let (webp, webp_size) = match encoded.webp {
            Some(bytes) => {
                let webp_path = PathResolver::webp_sibling(&output);
                if !self.claim_webp(&webp_path) {
                    warn!(
                        "⚠️  {} already written from another source, skipping WebP for {}",
                        webp_path.display(),
                        input.display()
                    );
                    (None, None)
                } else if let Err(e) = tokio::fs::write(&webp_path, &bytes).await {
                    self.release_webp(&webp_path);
                    return Err(e)
                        .with_context(|| format!("Failed to write {}", webp_path.display()));
                } else {
                    (Some(webp_path), Some(bytes.len() as u64))
                }
            }
            None => (None, None),
        };

        let compressed_size = tokio::fs::metadata(&output).await?.len();

        Ok(CompressedImage {
            source: input.to_path_buf(),
            output,
            webp,
            original_size,
            compressed_size,
            webp_size,
            original_dimensions: Some(encoded.original_dimensions),
            output_dimensions: Some(encoded.output_dimensions),
            reduction_percent: FileManager::calculate_reduction(original_size, compressed_size),
        })
    }

    /// Lossless palette pass with oxipng when it is installed
    async fn run_oxipng(&self, png: &Path) {
        let level = self.config.png_compression_level.min(6);
        let args = crate::args!["-o", level, "--strip", "safe", "-q", png.display()];
        run_tool("oxipng", &args, png).await;
    }

    /// Lossless Huffman/progressive pass with jpegtran (plain or mozjpeg build).
    /// The result replaces the encoder output only when it is smaller.
    async fn run_jpegtran(&self, jpeg: &Path) {
        let dir = jpeg.parent().unwrap_or(Path::new("."));
        let temp_file = match tempfile::Builder::new()
            .prefix(".jpegtran-")
            .suffix(".jpg")
            .tempfile_in(dir)
        {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to create temp file for jpegtran in {}: {}", dir.display(), e);
                return;
            }
        };

        let args = jpegtran_args(jpeg, temp_file.path());
        if !run_tool("jpegtran", &args, jpeg).await {
            return;
        }

        let (before, after) = match (
            tokio::fs::metadata(jpeg).await,
            tokio::fs::metadata(temp_file.path()).await,
        ) {
            (Ok(before), Ok(after)) => (before.len(), after.len()),
            _ => return,
        };

        if after > 0 && after < before {
            match temp_file.persist(jpeg) {
                Ok(_) => debug!("jpegtran saved {} bytes on {}", before - after, jpeg.display()),
                Err(e) => warn!("Failed to replace {} with jpegtran output: {}", jpeg.display(), e.error),
            }
        }
    }
}

/// Run an optional optimizer on `target`. Returns whether it ran and succeeded;
/// a missing, failing or hanging tool only produces a log line.
async fn run_tool(tool: &str, args: &[String], target: &Path) -> bool {
    let platform = PlatformCommands::instance();
    let Some(tool_path) = platform.get_tool_path(tool) else {
        debug!("{} not available, keeping encoder output for {}", tool, target.display());
        return false;
    };
    debug!("Running {}: {:?}", tool, args);

    let mut cmd = Command::new(&tool_path);
    cmd.args(args).kill_on_drop(true);
    match tokio::time::timeout(TOOL_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) if status.success() => true,
        Ok(Ok(status)) => {
            warn!("{} exited with {} for {}", tool, status, target.display());
            false
        }
        Ok(Err(e)) => {
            warn!("Failed to execute {} for {}: {}", tool, target.display(), e);
            false
        }
        Err(_) => {
            warn!(
                "{} timed out after {}s for {}",
                tool,
                TOOL_TIMEOUT.as_secs(),
                target.display()
            );
            false
        }
    }
}

fn jpegtran_args(input: &Path, output: &Path) -> Vec<String> {
    crate::args![
        "-copy", "none",
        "-optimize",
        "-progressive",
        "-outfile", output.display(),
        input.display(),
    ]
}

/// Decode, resize once, then encode the primary output and the optional WebP
fn encode_image(path: &Path, settings: EncodeSettings) -> Result<EncodedImage, OptimizeError> {
    let img = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let original_dimensions = (img.width(), img.height());

    let img = resize::resize_to_fit(img, settings.max_width, settings.max_height);
    let output_dimensions = (img.width(), img.height());

    let primary = match settings.format {
        ImageFormat::Jpeg => encode_jpeg(&img, settings.image_quality)?,
        ImageFormat::Png => encode_png(&img, settings.png_compression_level)?,
        ImageFormat::Gif => {
            return Err(OptimizeError::UnsupportedFormat(
                "GIF images are copied, not re-encoded".to_string(),
            ))
        }
    };

    let webp = match settings.webp_quality {
        Some(quality) => Some(encode_webp(&img, quality)?),
        None => None,
    };

    Ok(EncodedImage {
        original_dimensions,
        output_dimensions,
        primary,
        webp,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);

    // JPEG has no alpha; grayscale sources stay single-channel
    if matches!(img.color(), ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16) {
        let luma = img.to_luma8();
        encoder.encode(luma.as_raw(), luma.width(), luma.height(), ColorType::L8)?;
    } else {
        let rgb = img.to_rgb8();
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    }
    Ok(buf)
}

fn encode_png(img: &DynamicImage, level: u8) -> Result<Vec<u8>, OptimizeError> {
    let reduced = reduce_colors(img);
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buf,
        png_compression(level),
        PngFilterType::Adaptive,
    );
    encoder.write_image(
        reduced.as_bytes(),
        reduced.width(),
        reduced.height(),
        reduced.color(),
    )?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    // the webp encoder only accepts 8-bit RGB(A)
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let encoder =
        webp::Encoder::from_image(&img).map_err(|e| OptimizeError::WebpEncode(e.to_string()))?;
    Ok(encoder.encode(quality as f32).to_vec())
}

/// Map the 0-9 effort scale onto the encoder's presets
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Smallest 8-bit color type that represents the image without visible change
fn reduce_colors(img: &DynamicImage) -> DynamicImage {
    let grayscale = matches!(
        img.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    );
    let opaque = !img.color().has_alpha() || img.to_rgba8().pixels().all(|p| p.0[3] == u8::MAX);

    match (grayscale, opaque) {
        (true, true) => DynamicImage::ImageLuma8(img.to_luma8()),
        (true, false) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        (false, true) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (false, false) => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    fn processor(create_webp: bool) -> ImageProcessor {
        ImageProcessor::new(Config {
            max_width: 1000,
            max_height: 1000,
            create_webp,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_large_jpeg_is_resized_with_webp_sibling() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("first_balcony.jpg");
        gradient(2000, 1500).save(&input).unwrap();
        let out_dir = temp_dir.path().join("out/amenetis");

        let result = processor(true).compress(&input, &out_dir).await.unwrap();

        assert_eq!(result.output, out_dir.join("first_balcony.jpg"));
        assert_eq!(result.original_dimensions, Some((2000, 1500)));
        assert_eq!(result.output_dimensions, Some((1000, 750)));
        assert_eq!(image::image_dimensions(&result.output).unwrap(), (1000, 750));

        let webp = result.webp.expect("webp rendition");
        assert_eq!(webp, out_dir.join("first_balcony.webp"));
        assert_eq!(image::image_dimensions(&webp).unwrap(), (1000, 750));
        assert!(result.webp_size.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_small_png_keeps_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("yaya.png");
        gradient(400, 300).save(&input).unwrap();
        let out_dir = temp_dir.path().join("out/team");

        let result = processor(true).compress(&input, &out_dir).await.unwrap();

        assert_eq!(image::image_dimensions(&result.output).unwrap(), (400, 300));
        assert_eq!(image::image_dimensions(result.webp.unwrap()).unwrap(), (400, 300));
    }

    #[tokio::test]
    async fn test_gif_is_copied_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("loader.gif");
        // not even a valid GIF: it must never be decoded
        let bytes = b"GIF89a\x01\x00\x01\x00 animated frames stand-in".to_vec();
        std::fs::write(&input, &bytes).unwrap();
        let out_dir = temp_dir.path().join("out");

        let result = processor(true).compress(&input, &out_dir).await.unwrap();

        assert_eq!(std::fs::read(&result.output).unwrap(), bytes);
        assert!(result.webp.is_none());
        assert!(!out_dir.join("loader.webp").exists());
    }

    #[tokio::test]
    async fn test_webp_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        gradient(64, 48).save(&input).unwrap();
        let out_dir = temp_dir.path().join("out");

        let off = processor(false).compress(&input, &out_dir).await.unwrap();
        assert!(off.webp.is_none());
        assert!(!out_dir.join("photo.webp").exists());
    }

    #[tokio::test]
    async fn test_shared_webp_name_goes_to_first_successful_source() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("out");
        let broken = temp_dir.path().join("photo.jpg");
        std::fs::write(&broken, b"not a jpeg at all").unwrap();
        let png = temp_dir.path().join("photo.png");
        gradient(32, 24).save(&png).unwrap();
        let jpeg = temp_dir.path().join("photo.jpeg");
        gradient(32, 24).save(&jpeg).unwrap();

        let processor = processor(true);
        // a source that fails never claims the name
        assert!(processor.compress(&broken, &out_dir).await.is_err());

        let first = processor.compress(&png, &out_dir).await.unwrap();
        assert_eq!(first.webp, Some(out_dir.join("photo.webp")));

        let second = processor.compress(&jpeg, &out_dir).await.unwrap();
        assert!(second.webp.is_none());
        assert!(out_dir.join("photo.jpeg").exists());

        processor.reset_webp_claims();
        let rerun = processor.compress(&jpeg, &out_dir).await.unwrap();
        assert!(rerun.webp.is_some());
    }

    #[test]
    fn test_jpegtran_args_are_lossless() {
        let args = jpegtran_args(Path::new("out/a.jpg"), Path::new("out/.tmp.jpg"));
        assert_eq!(&args[..4], ["-copy", "none", "-optimize", "-progressive"]);
        assert!(!args.iter().any(|a| a == "-quality"));
        let outfile = args.iter().position(|a| a == "-outfile").unwrap();
        assert_eq!(args[outfile + 1], Path::new("out/.tmp.jpg").display().to_string());
        assert_eq!(args.last().unwrap(), &Path::new("out/a.jpg").display().to_string());
    }

    #[tokio::test]
    async fn test_corrupt_image_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("broken.jpg");
        std::fs::write(&input, b"definitely not a jpeg").unwrap();

        let result = processor(true).compress(&input, &temp_dir.path().join("out")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("notes.txt");
        std::fs::write(&input, b"hello").unwrap();

        let err = processor(true)
            .compress(&input, temp_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OptimizeError>(),
            Some(OptimizeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_reduce_colors_drops_opaque_alpha() {
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255])));
        assert_eq!(reduce_colors(&opaque).color(), ColorType::Rgb8);

        let mut translucent = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        translucent.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let translucent = DynamicImage::ImageRgba8(translucent);
        assert_eq!(reduce_colors(&translucent).color(), ColorType::Rgba8);

        let gray = DynamicImage::new_luma16(4, 4);
        assert_eq!(reduce_colors(&gray).color(), ColorType::L8);
    }

    #[test]
    fn test_png_compression_mapping() {
        assert!(matches!(png_compression(0), CompressionType::Fast));
        assert!(matches!(png_compression(5), CompressionType::Default));
        assert!(matches!(png_compression(9), CompressionType::Best));
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let img = DynamicImage::ImageRgb8(gradient(256, 256));
        let low = encode_jpeg(&img, 10).unwrap();
        let high = encode_jpeg(&img, 95).unwrap();
        assert!(low.len() < high.len());
    }
}

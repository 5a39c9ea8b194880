//! # Image Resize Module
//!
//! Calcolo delle dimensioni "fit inside" e resize in memoria con il crate `image`.
//!
//! ## Caratteristiche
//! - **Solo riduzione**: le immagini più piccole del bounding box non vengono mai ingrandite
//! - **Aspect ratio preservato**: il lato relativamente più grande tocca il suo massimo,
//!   l'altro viene arrotondato
//! - **Funzione pura**: `fit_within()` non fa I/O ed è testabile in isolamento
//! - **Filtro Lanczos3**: qualità migliore per il downscale delle foto
//!
//! ## Esempio
//! ```text
//! 2000x1500 dentro 1000x1000 -> 1000x750
//!  400x300  dentro 1000x1000 ->  400x300 (invariata)
//! ```

use image::imageops::FilterType;
use image::DynamicImage;

/// Whether an image exceeds the bounding box in either dimension
pub fn needs_resize(width: u32, height: u32, max_width: u32, max_height: u32) -> bool {
    width > max_width || height > max_height
}

/// Dimensions that fit inside `max_width x max_height`, preserving aspect
/// ratio and never upscaling. Both sides are at least 1.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || !needs_resize(width, height, max_width, max_height) {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (new_width, new_height)
}

/// Resize `img` so it fits the bounding box. Returns the input untouched when
/// it already fits.
pub fn resize_to_fit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let (new_width, new_height) = fit_within(width, height, max_width, max_height);

    if (new_width, new_height) == (width, height) {
        img
    } else {
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    }
}

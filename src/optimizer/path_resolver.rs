//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! L'identità di un output è funzione pura del path relativo del sorgente
//! più la trasformazione applicata: stessa estensione per l'output primario,
//! `.webp` per la rendition moderna. Nessun content-addressing, nessuna cache.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps source asset paths onto the compressed tree
#[derive(Debug, Clone)]
pub struct PathResolver {
    asset_root: PathBuf,
    compressed_root: PathBuf,
}

impl PathResolver {
    pub fn new(asset_root: impl Into<PathBuf>, compressed_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            compressed_root: compressed_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn compressed_root(&self) -> &Path {
        &self.compressed_root
    }

    /// Path of `input` relative to the asset root
    pub fn relative<'a>(&self, input: &'a Path) -> Result<&'a Path> {
        input.strip_prefix(&self.asset_root).map_err(|_| {
            anyhow::anyhow!(
                "{} is not inside the asset root {}",
                input.display(),
                self.asset_root.display()
            )
        })
    }

    /// Directory in the compressed tree that mirrors the input's directory
    pub fn output_dir(&self, input: &Path) -> Result<PathBuf> {
        let relative = self.relative(input)?;
        let dir = self.compressed_root.join(relative.parent().unwrap_or(Path::new("")));
        debug!("Resolved output dir: {} -> {}", input.display(), dir.display());
        Ok(dir)
    }

    /// Primary output path: same relative path, same name
    pub fn output_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(self.compressed_root.join(self.relative(input)?))
    }

    /// Secondary WebP rendition: primary output with the extension replaced
    pub fn webp_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(Self::webp_sibling(&self.output_path(input)?))
    }

    /// `dir/name.ext` -> `dir/name.webp`
    pub fn webp_sibling(path: &Path) -> PathBuf {
        path.with_extension("webp")
    }
}

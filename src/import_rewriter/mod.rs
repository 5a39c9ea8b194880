//! # Import Rewriter Module
//!
//! Passata indipendente sul codice sorgente dell'applicazione: riscrive i
//! riferimenti `../assets/...` e `./assets/...` verso l'albero compresso.
//!
//! ## Responsabilità:
//! - Walk della `source_root`, filtrando per estensione (default `js`, `jsx`)
//! - Salta `node_modules` e la directory compressa
//! - Riscrittura testuale (`patterns`) e scrittura solo se il testo cambia
//! - Generazione opzionale dell'helper WebP (`helper`)
//!
//! Un errore di lettura/scrittura su un file viene loggato e raccolto nel
//! report; la passata continua. Una `source_root` mancante è fatale.
//!
//! ## Esempio:
//! ```ignore
//! let rewriter = ImportRewriter::new(RewriteConfig::default())?;
//! let report = rewriter.run().await?;
//! println!("{} of {}", report.files_updated.len(), report.files_scanned);
//! ```

pub mod helper;
pub mod patterns;

pub use patterns::{BasePrefix, FormCounts, PatternSet, Rewrite, SyntaxForm};

use crate::{
    config::RewriteConfig,
    error::{FileFailure, OptimizeError},
    file_manager::FileManager,
    utils::display_relative,
};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Outcome of one rewrite pass
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    pub files_scanned: usize,
    pub files_updated: Vec<PathBuf>,
    pub counts: FormCounts,
    pub failures: Vec<FileFailure>,
    pub helper_written: bool,
}

/// Rewrites asset references in application source files
pub struct ImportRewriter {
    config: RewriteConfig,
    patterns: PatternSet,
}

impl ImportRewriter {
    pub fn new(config: RewriteConfig) -> Result<Self> {
        config.validate()?;
        let patterns = PatternSet::new(
            &config.asset_dir,
            &config.compressed_dir,
            config.rewrite_to_webp,
        )?;
        Ok(Self { config, patterns })
    }

    /// Pure text pass, no IO
    pub fn rewrite_text(&self, text: &str) -> Rewrite {
        self.patterns.rewrite_text(text)
    }

    /// Source files the pass would visit
    pub fn find_source_files(&self) -> Vec<Result<PathBuf, OptimizeError>> {
        let compressed_dir = OsStr::new(&self.config.compressed_dir);

        WalkDir::new(&self.config.source_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name();
                !(entry.file_type().is_dir()
                    && entry.depth() > 0
                    && (name == compressed_dir || SKIPPED_DIRS.iter().any(|d| name == OsStr::new(d))))
            })
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() && self.wants(entry.path()) => {
                    Some(Ok(entry.into_path()))
                }
                Ok(_) => None,
                Err(e) => Some(Err(OptimizeError::Walk(e))),
            })
            .collect()
    }

    fn wants(&self, path: &Path) -> bool {
        FileManager::extension(path)
            .map(|ext| self.config.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false)
    }

    /// Run the pass over `source_root`, then write the helper if configured
    pub async fn run(&self) -> Result<RewriteReport> {
        let source_root = &self.config.source_root;
        if !tokio::fs::metadata(source_root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            anyhow::bail!("Source directory {} not found", source_root.display());
        }

        info!("🔍 Finding {} files...", self.config.extensions.join("/"));
        let mut report = RewriteReport::default();

        for entry in self.find_source_files() {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    let path = match &e {
                        OptimizeError::Walk(walk) => walk.path().map(Path::to_path_buf),
                        _ => None,
                    }
                    .unwrap_or_else(|| source_root.clone());
                    let e = anyhow::Error::from(e);
                    error!("Error walking {}: {:#}", path.display(), e);
                    report.failures.push(FileFailure::new(path, &e));
                    continue;
                }
            };

            report.files_scanned += 1;
            match self.rewrite_file(&path).await {
                Ok(Some(counts)) => {
                    info!("Updated imports in: {}", display_relative(&path, source_root));
                    report.counts.merge(&counts);
                    report.files_updated.push(path);
                }
                Ok(None) => debug!("No asset references in {}", path.display()),
                Err(e) => {
                    error!("Error updating imports in {}: {:#}", path.display(), e);
                    report.failures.push(FileFailure::new(&path, &e));
                }
            }
        }

        info!(
            "Updated imports in {} of {} files",
            report.files_updated.len(),
            report.files_scanned
        );

        if let Some(ref helper_config) = self.config.helper {
            match helper::write_helper(helper_config).await {
                Ok(written) => report.helper_written = written,
                Err(e) => {
                    error!("Error writing helper {}: {:#}", helper_config.path.display(), e);
                    report.failures.push(FileFailure::new(&helper_config.path, &e));
                }
            }
        }

        Ok(report)
    }

    /// Rewrite one file in place. `None` when nothing matched.
    async fn rewrite_file(&self, path: &Path) -> Result<Option<FormCounts>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let rewrite = self.patterns.rewrite_text(&content);
        if !rewrite.changed() {
            return Ok(None);
        }

        tokio::fs::write(path, &rewrite.text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(rewrite.counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HelperConfig, ProbeStyle};
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn rewriter_for(root: &Path) -> ImportRewriter {
        ImportRewriter::new(RewriteConfig {
            source_root: root.to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_updates_only_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        write(
            &src.join("App.js"),
            "import hero from './assets/images/hero.jpg';\n",
        );
        write(
            &src.join("components/Team.jsx"),
            "<img src=\"../assets/team/yaya.png\" />\n",
        );
        write(&src.join("components/Loader.js"), "export const x = 1;\n");
        write(&src.join("styles.css"), "url('./assets/images/bg.png')\n");

        let report = rewriter_for(&src).run().await.unwrap();

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_updated.len(), 2);
        assert_eq!(report.counts.from, 1);
        assert_eq!(report.counts.string_literal, 1);
        assert!(report.failures.is_empty());
        assert!(!report.helper_written);

        assert_eq!(
            std::fs::read_to_string(src.join("App.js")).unwrap(),
            "import hero from './assets-compressed/images/hero.jpg';\n"
        );
        // css is not in the extension list
        assert_eq!(
            std::fs::read_to_string(src.join("styles.css")).unwrap(),
            "url('./assets/images/bg.png')\n"
        );
    }

    #[tokio::test]
    async fn test_second_run_leaves_files_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        write(
            &src.join("App.js"),
            "const a = require(\"../assets/images/a.png\");\nimport b from '../assets/images/b.jpg';\n",
        );

        let rewriter = rewriter_for(&src);
        rewriter.run().await.unwrap();
        let first = std::fs::read(src.join("App.js")).unwrap();
        let report = rewriter.run().await.unwrap();
        let second = std::fs::read(src.join("App.js")).unwrap();

        assert_eq!(first, second);
        assert!(report.files_updated.is_empty());
        assert_eq!(report.counts.total(), 0);
    }

    #[tokio::test]
    async fn test_skips_node_modules_and_compressed_dir() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let vendored = "import x from './assets/x.png';\n";
        write(&src.join("node_modules/pkg/index.js"), vendored);
        write(&src.join("assets-compressed/meta.js"), vendored);

        let report = rewriter_for(&src).run().await.unwrap();

        assert_eq!(report.files_scanned, 0);
        assert_eq!(
            std::fs::read_to_string(src.join("node_modules/pkg/index.js")).unwrap(),
            vendored
        );
    }

    #[tokio::test]
    async fn test_missing_source_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let rewriter = rewriter_for(&temp_dir.path().join("nope"));
        assert!(rewriter.run().await.is_err());
    }

    #[tokio::test]
    async fn test_helper_generation() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let helper_path = src.join("utils/imageUtils.js");

        let rewriter = ImportRewriter::new(RewriteConfig {
            source_root: src.clone(),
            helper: Some(HelperConfig {
                path: helper_path.clone(),
                probe: ProbeStyle::Async,
                timeout_ms: 750,
            }),
            ..Default::default()
        })
        .unwrap();

        let first = rewriter.run().await.unwrap();
        assert!(first.helper_written);
        assert!(std::fs::read_to_string(&helper_path)
            .unwrap()
            .contains("settle(false), 750)"));

        let second = rewriter.run().await.unwrap();
        assert!(!second.helper_written);
        // the helper itself has no asset references
        assert!(second.files_updated.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_collected_and_pass_continues() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        write(&src.join("good.js"), "import a from './assets/a.jpg';\n");
        std::fs::write(src.join("bad.js"), [0xff, 0xfe, 0xfd]).unwrap();

        let report = rewriter_for(&src).run().await.unwrap();

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_updated, vec![src.join("good.js")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, src.join("bad.js"));
        assert_eq!(std::fs::read(src.join("bad.js")).unwrap(), [0xff, 0xfe, 0xfd]);
    }

    #[tokio::test]
    async fn test_helper_write_failure_keeps_the_report() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        write(&src.join("App.js"), "import a from './assets/a.jpg';\n");
        // a regular file where the helper's directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let helper_path = blocker.join("imageUtils.js");

        let rewriter = ImportRewriter::new(RewriteConfig {
            source_root: src.clone(),
            helper: Some(HelperConfig {
                path: helper_path.clone(),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();

        let report = rewriter.run().await.unwrap();

        assert!(!report.helper_written);
        assert_eq!(report.files_updated, vec![src.join("App.js")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, helper_path);
        assert_eq!(
            std::fs::read_to_string(src.join("App.js")).unwrap(),
            "import a from './assets-compressed/a.jpg';\n"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = ImportRewriter::new(RewriteConfig {
            compressed_dir: "assets".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}

//! # WebP Helper Generation
//!
//! Genera il modulo JavaScript con `supportsWebP()` e `getOptimizedImagePath(path)`.
//!
//! ## Varianti del probe:
//! - **async**: decodifica di un'immagine WebP 1x1, con timeout; risolve sempre
//!   (`false` su errore o timeout) e memorizza il risultato
//! - **sync**: `canvas.toDataURL('image/webp')` dentro un `try`, `false` su errore
//!
//! Il file viene riscritto solo se il contenuto cambia.

use crate::config::{HelperConfig, ProbeStyle};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use tracing::{debug, info};

const TIMEOUT_TOKEN: &str = "__TIMEOUT_MS__";

const ASYNC_TEMPLATE: &str = r#"// Generated by asset-squeezer. Do not edit by hand.

const WEBP_PROBE =
  'data:image/webp;base64,UklGRiQAAABXRUJQVlA4IBgAAAAwAQCdASoBAAEAAwA0JaQAA3AA/vuUAAA=';

let webpSupport = null;
let pendingProbe = null;

// Resolves to true or false, never rejects.
export function supportsWebP() {
  if (webpSupport !== null) return Promise.resolve(webpSupport);
  if (typeof window === 'undefined' || typeof Image === 'undefined') {
    return Promise.resolve(false);
  }
  if (pendingProbe) return pendingProbe;

  pendingProbe = new Promise((resolve) => {
    const probe = new Image();
    let settled = false;

    const settle = (value) => {
      if (settled) return;
      settled = true;
      clearTimeout(timer);
      webpSupport = value;
      resolve(value);
    };

    const timer = setTimeout(() => settle(false), __TIMEOUT_MS__);
    probe.onload = () => settle(probe.width === 1 && probe.height === 1);
    probe.onerror = () => settle(false);
    probe.src = WEBP_PROBE;
  }).catch(() => false);

  return pendingProbe;
}

// Uses the cached probe result; call supportsWebP() once at startup.
export function getOptimizedImagePath(path) {
  if (!path || !/\.(jpe?g|png)$/i.test(path)) return path;
  if (webpSupport === true) {
    return path.replace(/\.(jpe?g|png)$/i, '.webp');
  }
  return path;
}
"#;

const SYNC_TEMPLATE: &str = r#"// Generated by asset-squeezer. Do not edit by hand.

let webpSupport = null;

export function supportsWebP() {
  if (webpSupport !== null) return webpSupport;
  webpSupport = false;
  try {
    if (typeof document !== 'undefined') {
      const canvas = document.createElement('canvas');
      canvas.width = 1;
      canvas.height = 1;
      webpSupport = canvas.toDataURL('image/webp').indexOf('data:image/webp') === 0;
    }
  } catch (e) {
    webpSupport = false;
  }
  return webpSupport;
}

export function getOptimizedImagePath(path) {
  if (!path || !/\.(jpe?g|png)$/i.test(path)) return path;
  return supportsWebP() ? path.replace(/\.(jpe?g|png)$/i, '.webp') : path;
}
"#;

/// Render the helper source for a probe style
pub fn render(style: ProbeStyle, timeout_ms: u64) -> String {
    match style {
        ProbeStyle::Async => ASYNC_TEMPLATE.replace(TIMEOUT_TOKEN, &timeout_ms.to_string()),
        ProbeStyle::Sync => SYNC_TEMPLATE.to_string(),
    }
}

/// Write the helper if its content differs. Returns whether the file was written.
pub async fn write_helper(config: &HelperConfig) -> Result<bool> {
    let content = render(config.probe, config.timeout_ms);

    match tokio::fs::read_to_string(&config.path).await {
        Ok(existing) if existing == content => {
            debug!("Helper already up to date: {}", config.path.display());
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", config.path.display()));
        }
    }

    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tokio::fs::write(&config.path, content)
        .await
        .with_context(|| format!("Failed to write {}", config.path.display()))?;
    info!("🧩 Wrote WebP helper: {}", config.path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_async_helper_carries_timeout() {
        let js = render(ProbeStyle::Async, 2500);
        assert!(js.contains("setTimeout(() => settle(false), 2500)"));
        assert!(!js.contains(TIMEOUT_TOKEN));
        assert!(js.contains("export function supportsWebP()"));
        assert!(js.contains("export function getOptimizedImagePath(path)"));
        assert!(js.contains("webpSupport === true"));
    }

    #[test]
    fn test_sync_helper_uses_canvas() {
        let js = render(ProbeStyle::Sync, 1000);
        assert!(js.contains("toDataURL('image/webp')"));
        assert!(js.contains("catch (e)"));
        assert!(!js.contains("setTimeout"));
    }

    #[tokio::test]
    async fn test_helper_written_only_when_changed() {
        let temp_dir = TempDir::new().unwrap();
        let config = HelperConfig {
            path: temp_dir.path().join("src/utils/imageUtils.js"),
            probe: ProbeStyle::Async,
            timeout_ms: 1000,
        };

        assert!(write_helper(&config).await.unwrap());
        assert!(!write_helper(&config).await.unwrap());
        assert_eq!(
            std::fs::read_to_string(&config.path).unwrap(),
            render(ProbeStyle::Async, 1000)
        );

        let sync = HelperConfig {
            probe: ProbeStyle::Sync,
            ..config
        };
        assert!(write_helper(&sync).await.unwrap());
    }
}

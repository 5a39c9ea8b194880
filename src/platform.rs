//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni usati dalla pipeline
//! (`ffmpeg` per la transcodifica video, `oxipng` per la riduzione palette PNG,
//! `jpegtran` per la passata JPEG lossless).
//! I tool vengono cercati nel `PATH` di sistema, con il nome eseguibile corretto
//! per la piattaforma; il risultato della ricerca viene memorizzato una volta sola.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Platform-specific command manager with cached tool resolution
pub struct PlatformCommands {
    executable_suffix: &'static str,
    path_separator: char,
    resolved: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let (executable_suffix, path_separator) = if cfg!(windows) {
            (".exe", ';')
        } else {
            ("", ':')
        };

        Self {
            executable_suffix,
            path_separator,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Get the platform-specific executable name
    pub fn get_command(&self, base_name: &str) -> String {
        format!("{}{}", base_name, self.executable_suffix)
    }

    /// Resolve a tool to an absolute path on `PATH`, cached per name
    pub fn get_tool_path(&self, base_name: &str) -> Option<PathBuf> {
        if let Ok(cache) = self.resolved.lock() {
            if let Some(hit) = cache.get(base_name) {
                return hit.clone();
            }
        }

        let found = env::var_os("PATH")
            .and_then(|paths| self.find_in(&paths.to_string_lossy(), base_name));
        debug!("Resolved tool {} -> {:?}", base_name, found);

        if let Ok(mut cache) = self.resolved.lock() {
            cache.insert(base_name.to_string(), found.clone());
        }
        found
    }

    /// Check if a command is available on the system
    pub fn is_command_available(&self, base_name: &str) -> bool {
        self.get_tool_path(base_name).is_some()
    }

    fn find_in(&self, search_path: &str, base_name: &str) -> Option<PathBuf> {
        let executable = self.get_command(base_name);
        search_path
            .split(self.path_separator)
            .filter(|dir| !dir.is_empty())
            .map(|dir| Path::new(dir).join(&executable))
            .find(|candidate| candidate.is_file())
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}

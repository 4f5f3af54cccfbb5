//! Server configuration
//!
//! Built once at startup from CLI flags, an optional JSON settings file and
//! built-in defaults (in that order of precedence), then shared read-only.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cli::Cli;
use crate::error::AppError;
use crate::guard;
use crate::search::bridge::{DEFAULT_MAX_CANDIDATES, DEFAULT_OUTPUT_CAPACITY, DEFAULT_TIMEOUT};
use crate::search::enumerator::DEFAULT_MAX_FILES;
use crate::search::{EngineOptions, SearchLimits, UnreadablePolicy};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Settings file contents; every field optional
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_files: Option<usize>,
    pub max_candidates: Option<usize>,
    pub max_results: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub confine_roots: Option<bool>,
    pub skip_unreadable: Option<bool>,
    pub sort_by_score: Option<bool>,
    pub static_dir: Option<PathBuf>,
}

/// Get the default settings file path
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fzweb").join("config.json"))
}

/// Load settings from disk; a missing file yields defaults
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!("No settings file at {}", path.display());
        return Ok(Settings::default());
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;

    let settings: Settings = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

    Ok(settings)
}

/// Which search roots a client may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPolicy {
    /// Any existing directory
    Any,
    /// Only the default root and directories below it
    Confined,
}

/// Immutable server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub default_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub limits: SearchLimits,
    pub root_policy: RootPolicy,
    pub unreadable: UnreadablePolicy,
    pub engine: EngineOptions,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Defaults rooted at `root`, without validation
    #[cfg(test)]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: root.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            limits: SearchLimits::default(),
            root_policy: RootPolicy::Any,
            unreadable: UnreadablePolicy::Abort,
            engine: EngineOptions::default(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }

    /// Merge CLI flags over settings over defaults and validate the default root
    pub fn resolve(cli: &Cli, settings: Settings) -> Result<Self> {
        let root = match cli.dir.clone().or(settings.dir) {
            Some(dir) => dir,
            None => std::env::current_dir().context("Cannot determine current directory")?,
        };

        if !root.is_dir() {
            bail!("Search directory does not exist: {}", root.display());
        }
        let default_root = fs::canonicalize(&root)
            .with_context(|| format!("Cannot resolve search directory {}", root.display()))?;

        let timeout_secs = cli
            .timeout_secs
            .or(settings.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());

        let limits = SearchLimits {
            max_files: cli.max_files.or(settings.max_files).unwrap_or(DEFAULT_MAX_FILES),
            max_candidates: cli
                .max_candidates
                .or(settings.max_candidates)
                .unwrap_or(DEFAULT_MAX_CANDIDATES),
            max_results: cli
                .max_results
                .or(settings.max_results)
                .unwrap_or(DEFAULT_MAX_CANDIDATES),
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        };

        let root_policy = if cli.confine_roots || settings.confine_roots.unwrap_or(false) {
            RootPolicy::Confined
        } else {
            RootPolicy::Any
        };

        let unreadable = if cli.skip_unreadable || settings.skip_unreadable.unwrap_or(false) {
            UnreadablePolicy::Skip
        } else {
            UnreadablePolicy::Abort
        };

        let engine = EngineOptions {
            sort_by_score: cli.sort || settings.sort_by_score.unwrap_or(false),
            ..EngineOptions::default()
        };

        Ok(Self {
            default_root,
            host: cli
                .host
                .clone()
                .or(settings.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(settings.port).unwrap_or(DEFAULT_PORT),
            limits,
            root_policy,
            unreadable,
            engine,
            static_dir: cli
                .static_dir
                .clone()
                .or(settings.static_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }

    /// Pick the root for a request without checking that it exists.
    ///
    /// An empty or missing override selects the default root.
    pub fn select_root(&self, requested: Option<&str>) -> Result<PathBuf, AppError> {
        let requested = match requested.map(str::trim) {
            Some(dir) if !dir.is_empty() => Path::new(dir),
            _ => return Ok(self.default_root.clone()),
        };

        match self.root_policy {
            RootPolicy::Any => Ok(requested.to_path_buf()),
            RootPolicy::Confined => guard::confine_root(requested, &self.default_root),
        }
    }

    /// Pick the root for a search; it must be an existing directory
    pub fn search_root(&self, requested: Option<&str>) -> Result<PathBuf, AppError> {
        let root = self.select_root(requested)?;
        if !root.is_dir() {
            return Err(AppError::DirectoryNotFound(root.display().to_string()));
        }
        Ok(root)
    }
}

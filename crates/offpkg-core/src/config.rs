//! Build configuration.
//!
//! Every field has a default, so an absent or partial `offpkg.toml` is
//! valid. Command-line flags are applied on top by the CLI.
//!
//! ```toml
//! platform = "windows"
//! runtime_version = "4.3"
//! index_mirror = "https://cloud.r-project.org"
//! dependency_kinds = ["depends", "imports", "linking-to"]
//! resolve_strategy = "at-fetch"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use offpkg_schema::{DependencyKind, LibrarySet, Platform, RepositoryTarget, base_libraries};

use crate::error::BuildError;
use crate::paths;

/// Config file name looked up in the offpkg home directory.
pub const CONFIG_FILE: &str = "offpkg.toml";

pub const DEFAULT_MIRROR: &str = "https://cloud.r-project.org";
pub const DEFAULT_RUNTIME_VERSION: &str = "4.3";
pub const DEFAULT_MAX_RESOLVE_ITERATIONS: usize = 1000;

/// Where dependency expansion happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStrategy {
    /// Compute the closure against the source index before fetching.
    #[default]
    Upfront,
    /// Hand the unresolved set to the fetcher and let it expand.
    AtFetch,
}

impl std::str::FromStr for ResolveStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upfront" => Ok(Self::Upfront),
            "at-fetch" => Ok(Self::AtFetch),
            other => Err(format!(
                "unknown resolve strategy '{other}' (expected 'upfront' or 'at-fetch')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Scratch directory for downloads. Defaults to `~/.offpkg/cache`.
    pub cache_dir: Option<PathBuf>,
    pub platform: Platform,
    pub runtime_version: String,
    /// Mirror root: `http(s)://`, `file://` or a plain directory.
    pub index_mirror: String,
    pub dependency_kinds: Vec<DependencyKind>,
    pub resolve_strategy: ResolveStrategy,
    /// Replaces the built-in list of always-present libraries when set.
    pub base_libraries: Option<LibrarySet>,
    pub max_resolve_iterations: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            platform: Platform::host(),
            runtime_version: DEFAULT_RUNTIME_VERSION.to_string(),
            index_mirror: DEFAULT_MIRROR.to_string(),
            dependency_kinds: DependencyKind::DEFAULT.to_vec(),
            resolve_strategy: ResolveStrategy::default(),
            base_libraries: None,
            max_resolve_iterations: DEFAULT_MAX_RESOLVE_ITERATIONS,
        }
    }
}

impl BuildConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|message| BuildError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Load `path` if given, else the home config if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, BuildError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match paths::config_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading home config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn parse(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.runtime_version.trim().is_empty() {
            return Err("runtime_version must not be empty".to_string());
        }
        if config.max_resolve_iterations == 0 {
            return Err("max_resolve_iterations must be at least 1".to_string());
        }
        Ok(config)
    }

    pub fn target(&self) -> RepositoryTarget {
        RepositoryTarget::new(self.platform, self.runtime_version.clone())
    }

    pub fn base_libraries(&self) -> LibrarySet {
        self.base_libraries.clone().unwrap_or_else(base_libraries)
    }

    /// The configured cache directory, falling back to the home default.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] when neither is available.
    pub fn cache_dir(&self) -> Result<PathBuf, BuildError> {
        self.cache_dir
            .clone()
            .or_else(paths::cache_path)
            .ok_or_else(|| {
                BuildError::Configuration(
                    "Could not determine a cache directory. Set OFFPKG_HOME or cache_dir."
                        .to_string(),
                )
            })
    }
}

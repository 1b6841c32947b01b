//! offpkg - offline package repositories
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Builds a portable repository archive on a connected machine and installs
//! from it on a disconnected one.
//!
//! # Workflow
//!
//! ```text
//! offpkg build --dir ./project --output repository.zip    # online
//! offpkg export-installer /media/usb/offpkg-install        # online
//! offpkg-install --archive repository.zip                 # offline
//! ```

pub mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use offpkg_core::{BuildConfig, ResolveStrategy};
use offpkg_install::{DEFAULT_ARCHIVE, InstallArgs};
use offpkg_schema::{DependencyKind, LibraryName, Platform};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "offpkg")]
#[command(author, version, about = "offpkg - offline package repositories")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the libraries a project references
    Scan {
        /// Project directory
        dir: PathBuf,
        /// Only scan the top level of the directory
        #[arg(long)]
        no_recursive: bool,
    },
    /// Print the dependency closure of a project and/or explicit libraries
    Resolve {
        #[command(flatten)]
        plan: PlanArgs,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Build a repository archive
    Build {
        #[command(flatten)]
        plan: PlanArgs,
        /// Archive to write (overwritten if it exists)
        #[arg(short, long, default_value = DEFAULT_ARCHIVE)]
        output: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Install libraries from a repository archive
    Install(InstallArgs),
    /// Copy the standalone installer somewhere for transfer
    ExportInstaller {
        /// Destination path
        dest: PathBuf,
        /// Overwrite an existing destination
        #[arg(short, long)]
        force: bool,
        /// Installer executable to export instead of the bundled one
        #[arg(long, env = "OFFPKG_INSTALLER", hide = true)]
        installer: Option<PathBuf>,
    },
}

/// What to put in the repository.
#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Project directory to scan for library references
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Library to include (repeatable)
    #[arg(long = "lib", value_name = "NAME")]
    pub libraries: Vec<LibraryName>,
    /// Only scan the top level of the project directory
    #[arg(long)]
    pub no_recursive: bool,
}

/// Overrides for `offpkg.toml`.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Config file (defaults to ~/.offpkg/offpkg.toml if present)
    #[arg(long, env = "OFFPKG_CONFIG")]
    pub config: Option<PathBuf>,
    /// Binary platform: windows, macosx or linux
    #[arg(long)]
    pub platform: Option<Platform>,
    /// Runtime version, e.g. 4.3
    #[arg(long)]
    pub runtime_version: Option<String>,
    /// Mirror URL or directory
    #[arg(long, env = "OFFPKG_MIRROR")]
    pub mirror: Option<String>,
    /// Download cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Dependency kinds to follow, comma separated
    #[arg(long, value_delimiter = ',')]
    pub kinds: Vec<DependencyKind>,
    /// Where dependencies are expanded: upfront or at-fetch
    #[arg(long)]
    pub strategy: Option<ResolveStrategy>,
}

impl ConfigArgs {
    /// Load the config file and apply the flags on top.
    pub fn load(&self) -> Result<BuildConfig> {
        let mut config = BuildConfig::load_or_default(self.config.as_deref())?;
        if let Some(platform) = self.platform {
            config.platform = platform;
        }
        if let Some(version) = &self.runtime_version {
            config.runtime_version.clone_from(version);
        }
        if let Some(mirror) = &self.mirror {
            config.index_mirror.clone_from(mirror);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if !self.kinds.is_empty() {
            config.dependency_kinds.clone_from(&self.kinds);
        }
        if let Some(strategy) = self.strategy {
            config.resolve_strategy = strategy;
        }
        debug!(
            platform = %config.platform,
            runtime_version = %config.runtime_version,
            mirror = %config.index_mirror,
            strategy = ?config.resolve_strategy,
            "effective build configuration"
        );
        Ok(config)
    }
}

//! Repository build pipeline.
//!
//! `plan` scans a project and merges explicit names, `resolve` expands the
//! plan to its dependency closure, `fetch` materializes artifacts in a
//! staging tree and `package` zips that tree. [`RepositoryBuilder::build`]
//! runs them in order.
//!
//! With [`ResolveStrategy::AtFetch`] the `resolve` step is skipped and the
//! fetcher expands the set itself. Either way a fetch that loses some
//! libraries is retried once, without expansion, for the ones that made it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use offpkg_schema::{LibrarySet, Reporter, Warning};

use crate::config::{BuildConfig, ResolveStrategy};
use crate::error::BuildError;
use crate::fetch::{FetchOptions, FetchOutcome, Fetcher};
use crate::package::package_repository;
use crate::resolve::{DependencyResolver, closure};
use crate::scan::{PatternScanner, SourceScanner};

/// Staging subdirectory of the cache that becomes the archive root.
const STAGING_DIR: &str = "repository";

/// What to build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Project directory to scan.
    pub dir: Option<PathBuf>,
    /// Libraries to include regardless of what scanning finds.
    pub libraries: LibrarySet,
    pub recursive: bool,
    /// Where to write the archive.
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Scanned and explicit names, before resolution.
    pub planned: LibrarySet,
    pub downloaded: LibrarySet,
    pub failed: LibrarySet,
    pub archive: PathBuf,
    pub warnings: Vec<Warning>,
}

pub struct RepositoryBuilder {
    config: BuildConfig,
    staging: PathBuf,
    scanner: Box<dyn SourceScanner>,
    resolver: Option<Box<dyn DependencyResolver>>,
    fetcher: Box<dyn Fetcher>,
}

impl std::fmt::Debug for RepositoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("config", &self.config)
            .field("staging", &self.staging)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl RepositoryBuilder {
    /// # Errors
    ///
    /// Fails if no cache directory can be determined.
    pub fn new(config: BuildConfig, fetcher: Box<dyn Fetcher>) -> Result<Self, BuildError> {
        let staging = config.cache_dir()?.join(STAGING_DIR);
        Ok(Self {
            config,
            staging,
            scanner: Box::new(PatternScanner),
            resolver: None,
            fetcher,
        })
    }

    pub fn with_scanner(mut self, scanner: Box<dyn SourceScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Required for [`ResolveStrategy::Upfront`].
    pub fn with_resolver(mut self, resolver: Box<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Root of the tree that gets packaged.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Union of everything referenced under `dir` and `explicit`.
    ///
    /// # Errors
    ///
    /// [`BuildError::Configuration`] when there is neither a directory nor
    /// any explicit name; [`BuildError::Scan`] when a file cannot be scanned.
    pub fn plan(
        &self,
        dir: Option<&Path>,
        explicit: &LibrarySet,
        recursive: bool,
    ) -> Result<LibrarySet, BuildError> {
        let Some(dir) = dir else {
            if explicit.is_empty() {
                return Err(BuildError::Configuration(
                    "Nothing to build: give a project directory or at least one library"
                        .to_string(),
                ));
            }
            return Ok(explicit.clone());
        };

        let scanned = self.scanner.scan_all(dir, recursive)?;
        debug!(dir = %dir.display(), count = scanned.len(), "project scanned");
        Ok(scanned.union(explicit))
    }

    /// Expand `set` to its dependency closure.
    ///
    /// # Errors
    ///
    /// [`BuildError::Configuration`] if no resolver was supplied.
    pub fn resolve(&self, set: &LibrarySet) -> Result<LibrarySet, BuildError> {
        let resolver = self.resolver.as_deref().ok_or_else(|| {
            BuildError::Configuration("Up-front resolution needs a dependency resolver".to_string())
        })?;
        Ok(closure(
            resolver,
            set,
            &self.config.dependency_kinds,
            self.config.max_resolve_iterations,
        )?)
    }

    fn fetch_options(&self, expand: bool) -> FetchOptions {
        FetchOptions {
            cache_dir: self.staging.clone(),
            target: self.config.target(),
            kinds: self.config.dependency_kinds.clone(),
            expand,
            base_libraries: self.config.base_libraries(),
            max_iterations: self.config.max_resolve_iterations,
        }
    }

    /// Download `set` into a freshly emptied staging tree.
    ///
    /// If anything fails, the libraries that did succeed are fetched once
    /// more with expansion disabled so the tree and its index describe
    /// exactly that set. Failed names from both rounds are returned.
    pub async fn fetch<R: Reporter + ?Sized>(
        &self,
        set: &LibrarySet,
        reporter: &R,
    ) -> Result<FetchOutcome, BuildError> {
        if tokio::fs::try_exists(&self.staging).await? {
            tokio::fs::remove_dir_all(&self.staging).await?;
        }
        tokio::fs::create_dir_all(&self.staging).await?;

        let expand = self.config.resolve_strategy == ResolveStrategy::AtFetch;
        let first = self
            .fetcher
            .download(set, &self.fetch_options(expand))
            .await?;
        if first.failed.is_empty() || first.succeeded.is_empty() {
            return Ok(first);
        }

        warn!(failed = %first.failed.joined(), "retrying without the failed libraries");
        reporter.info(&format!(
            "Retrying with the {} libraries that resolved",
            first.succeeded.len()
        ));
        let retry = self
            .fetcher
            .download(&first.succeeded, &self.fetch_options(false))
            .await?;

        Ok(FetchOutcome {
            failed: first.failed.union(&retry.failed),
            succeeded: retry.succeeded,
        })
    }

    /// Zip the staging tree into `output`.
    pub fn package(&self, output: &Path) -> Result<PathBuf, BuildError> {
        package_repository(&self.staging, output)
    }

    /// Run plan, resolve (when up front), fetch and package.
    pub async fn build<R: Reporter + ?Sized>(
        &self,
        request: &BuildRequest,
        reporter: &R,
    ) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let mut report = BuildReport::default();

        reporter.section("Planning");
        report.planned = self.plan(request.dir.as_deref(), &request.libraries, request.recursive)?;
        reporter.info(&format!("{} libraries referenced", report.planned.len()));

        let wanted = match self.config.resolve_strategy {
            ResolveStrategy::Upfront => {
                reporter.section("Resolving");
                let resolved = self.resolve(&report.planned)?;
                reporter.info(&format!("{} libraries after resolution", resolved.len()));
                resolved
            }
            ResolveStrategy::AtFetch => report.planned.difference(&self.config.base_libraries()),
        };

        reporter.section("Fetching");
        let outcome = self.fetch(&wanted, reporter).await?;
        report.downloaded = outcome.succeeded;
        report.failed = outcome.failed;
        if !report.failed.is_empty() {
            let warning = Warning::PartialDownload {
                failed: report.failed.clone(),
            };
            reporter.warning(&warning);
            report.warnings.push(warning);
        }

        reporter.section("Packaging");
        report.archive = self.package(&request.output)?;
        info!(
            archive = %report.archive.display(),
            libraries = report.downloaded.len(),
            "build complete"
        );
        reporter.summary(
            report.downloaded.len(),
            "packaged",
            start.elapsed().as_secs_f64(),
        );

        Ok(report)
    }
}

//! Fetching binary artifacts from a package mirror.
//!
//! A mirror follows the usual layout: the source index at
//! `src/contrib/PACKAGES`, binaries and their index under
//! `bin/<platform>/contrib/<version>/`. It may be served over HTTP or sit
//! on the local filesystem.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use offpkg_schema::{
    DependencyKind, INDEX_FILE, INDEX_FILE_GZ, LibrarySet, PackageIndex, RepositoryTarget,
    artifact_file_name,
};

use crate::USER_AGENT;
use crate::error::BuildError;
use crate::resolve::{IndexResolver, ResolutionError, closure};

/// Options for one download call.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Root of the repository tree to populate.
    pub cache_dir: PathBuf,
    pub target: RepositoryTarget,
    pub kinds: Vec<DependencyKind>,
    /// Expand the request to its dependency closure before downloading.
    pub expand: bool,
    pub base_libraries: LibrarySet,
    pub max_iterations: usize,
}

impl FetchOptions {
    /// Absolute contrib directory for the target inside the cache.
    pub fn contrib_path(&self) -> PathBuf {
        self.cache_dir.join(self.target.contrib_dir())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub succeeded: LibrarySet,
    pub failed: LibrarySet,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `refs` into `opts.cache_dir`. Individual failures land in
    /// [`FetchOutcome::failed`]; an `Err` means nothing could be attempted.
    async fn download(
        &self,
        refs: &LibrarySet,
        opts: &FetchOptions,
    ) -> Result<FetchOutcome, BuildError>;
}

#[derive(Debug, Clone)]
enum Location {
    Http(String),
    Local(PathBuf),
}

/// Fetches from a CRAN-style mirror.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    location: Location,
    client: Client,
}

impl MirrorFetcher {
    /// `mirror` is an `http(s)://` URL, a `file://` URL or a directory path.
    pub fn new(mirror: &str) -> Self {
        let location = if mirror.starts_with("http://") || mirror.starts_with("https://") {
            Location::Http(mirror.trim_end_matches('/').to_string())
        } else {
            Location::Local(PathBuf::from(
                mirror.strip_prefix("file://").unwrap_or(mirror),
            ))
        };
        Self {
            location,
            client: Client::new(),
        }
    }

    fn describe(&self, rel: &str) -> String {
        match &self.location {
            Location::Http(base) => format!("{base}/{rel}"),
            Location::Local(root) => root.join(rel).display().to_string(),
        }
    }

    async fn read_text(&self, rel: &str) -> Result<String, ResolutionError> {
        let location = self.describe(rel);
        let unavailable = |message: String| ResolutionError::IndexUnavailable {
            location: location.clone(),
            message,
        };

        match &self.location {
            Location::Http(_) => {
                let resp = self
                    .client
                    .get(&location)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| unavailable(e.to_string()))?;
                resp.text().await.map_err(|e| unavailable(e.to_string()))
            }
            Location::Local(root) => tokio::fs::read_to_string(root.join(rel))
                .await
                .map_err(|e| unavailable(e.to_string())),
        }
    }

    async fn read_index(&self, rel: &str) -> Result<PackageIndex, ResolutionError> {
        let text = self.read_text(rel).await?;
        PackageIndex::parse(&text).map_err(|source| ResolutionError::InvalidIndex {
            location: self.describe(rel),
            source,
        })
    }

    /// The mirror's source index, used for up-front resolution.
    pub async fn source_index(&self) -> Result<PackageIndex, ResolutionError> {
        self.read_index(&format!("src/contrib/{INDEX_FILE}")).await
    }

    /// The binary index for one target.
    pub async fn binary_index(
        &self,
        target: &RepositoryTarget,
    ) -> Result<PackageIndex, ResolutionError> {
        self.read_index(&format!("{}/{INDEX_FILE}", target.contrib_dir()))
            .await
    }

    async fn fetch_file(&self, rel: &str, dest: &Path) -> Result<(), BuildError> {
        match &self.location {
            Location::Http(base) => {
                let url = format!("{base}/{rel}");
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await?
                    .error_for_status()?;

                let mut file = File::create(dest).await?;
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    file.write_all(&chunk?).await?;
                }
                file.flush().await?;
            }
            Location::Local(root) => {
                tokio::fs::copy(root.join(rel), dest).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for MirrorFetcher {
    async fn download(
        &self,
        refs: &LibrarySet,
        opts: &FetchOptions,
    ) -> Result<FetchOutcome, BuildError> {
        let available = self.binary_index(&opts.target).await?;

        let wanted = if opts.expand {
            let resolver = IndexResolver::new(available.clone(), opts.base_libraries.clone());
            closure(&resolver, refs, &opts.kinds, opts.max_iterations)?
        } else {
            refs.clone()
        };

        let contrib = opts.contrib_path();
        tokio::fs::create_dir_all(&contrib).await?;

        let mut outcome = FetchOutcome::default();
        let mut written = PackageIndex::new();

        for name in &wanted {
            let Some(entry) = available.find(name) else {
                warn!(library = %name, target = %opts.target, "not in binary index");
                outcome.failed.insert(name.clone());
                continue;
            };

            let file_name = artifact_file_name(&entry.name, &entry.version, opts.target.platform);
            let dest = contrib.join(&file_name);
            if dest.is_file() {
                debug!(file = %file_name, "already in cache");
            } else {
                let rel = format!("{}/{file_name}", opts.target.contrib_dir());
                if let Err(e) = self.fetch_file(&rel, &dest).await {
                    warn!(library = %name, error = %e, "download failed");
                    tokio::fs::remove_file(&dest).await.ok();
                    outcome.failed.insert(name.clone());
                    continue;
                }
                info!(library = %name, version = %entry.version, "downloaded");
            }

            written.upsert(entry.clone());
            outcome.succeeded.insert(name.clone());
        }

        write_index(&contrib, &written).await?;
        Ok(outcome)
    }
}

/// Write `PACKAGES` and `PACKAGES.gz` for `index` into `contrib`.
pub async fn write_index(contrib: &Path, index: &PackageIndex) -> Result<(), BuildError> {
    let text = index.render();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let compressed = encoder.finish()?;

    tokio::fs::write(contrib.join(INDEX_FILE), text.as_bytes()).await?;
    tokio::fs::write(contrib.join(INDEX_FILE_GZ), compressed).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use mockito::Server;
    use offpkg_schema::{Platform, base_libraries};
    use std::io::Read;
    use tempfile::tempdir;

    const BIN_INDEX: &str = "\
Package: alpha
Version: 1.0
Depends: R (>= 4.0), gamma

Package: beta
Version: 2.1

Package: gamma
Version: 0.3
Imports: utils
";

    fn options(cache: &Path, expand: bool) -> FetchOptions {
        FetchOptions {
            cache_dir: cache.to_path_buf(),
            target: RepositoryTarget::new(Platform::Windows, "4.3"),
            kinds: DependencyKind::DEFAULT.to_vec(),
            expand,
            base_libraries: base_libraries(),
            max_iterations: 1000,
        }
    }

    fn local_mirror(root: &Path) {
        let contrib = root.join("bin/windows/contrib/4.3");
        std::fs::create_dir_all(&contrib).unwrap();
        std::fs::write(contrib.join(INDEX_FILE), BIN_INDEX).unwrap();
        for file in ["alpha_1.0.zip", "beta_2.1.zip", "gamma_0.3.zip"] {
            std::fs::write(contrib.join(file), file.as_bytes()).unwrap();
        }
    }

    #[tokio::test]
    async fn test_local_mirror_without_expansion() {
        let mirror = tempdir().unwrap();
        local_mirror(mirror.path());
        let cache = tempdir().unwrap();

        let fetcher = MirrorFetcher::new(mirror.path().to_str().unwrap());
        let outcome = fetcher
            .download(&LibrarySet::from_names(["alpha", "beta"]), &options(cache.path(), false))
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, LibrarySet::from_names(["alpha", "beta"]));
        assert!(outcome.failed.is_empty());

        let contrib = cache.path().join("bin/windows/contrib/4.3");
        assert!(contrib.join("alpha_1.0.zip").is_file());
        assert!(!contrib.join("gamma_0.3.zip").exists());

        let written = std::fs::read_to_string(contrib.join(INDEX_FILE)).unwrap();
        let index = PackageIndex::parse(&written).unwrap();
        assert_eq!(index.names(), LibrarySet::from_names(["alpha", "beta"]));

        let mut decoded = String::new();
        GzDecoder::new(std::fs::File::open(contrib.join(INDEX_FILE_GZ)).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, written);
    }

    #[tokio::test]
    async fn test_expansion_and_unknown_names() {
        let mirror = tempdir().unwrap();
        local_mirror(mirror.path());
        let cache = tempdir().unwrap();

        let url = format!("file://{}", mirror.path().display());
        let fetcher = MirrorFetcher::new(&url);
        let outcome = fetcher
            .download(&LibrarySet::from_names(["alpha", "bogus"]), &options(cache.path(), true))
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, LibrarySet::from_names(["alpha", "gamma"]));
        assert_eq!(outcome.failed, LibrarySet::from_names(["bogus"]));
    }

    #[tokio::test]
    async fn test_missing_binary_index_is_resolution_error() {
        let mirror = tempdir().unwrap();
        let cache = tempdir().unwrap();

        let fetcher = MirrorFetcher::new(mirror.path().to_str().unwrap());
        let err = fetcher
            .download(&LibrarySet::from_names(["alpha"]), &options(cache.path(), false))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Resolution(ResolutionError::IndexUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_mirror_partial_failure() {
        let mut server = Server::new_async().await;

        let _index = server
            .mock("GET", "/bin/windows/contrib/4.3/PACKAGES")
            .with_status(200)
            .with_body(BIN_INDEX)
            .create_async()
            .await;
        let _alpha = server
            .mock("GET", "/bin/windows/contrib/4.3/alpha_1.0.zip")
            .with_status(200)
            .with_body("alpha-bytes")
            .create_async()
            .await;
        let _beta = server
            .mock("GET", "/bin/windows/contrib/4.3/beta_2.1.zip")
            .with_status(404)
            .create_async()
            .await;

        let cache = tempdir().unwrap();
        let fetcher = MirrorFetcher::new(&format!("{}/", server.url()));
        let outcome = fetcher
            .download(&LibrarySet::from_names(["alpha", "beta"]), &options(cache.path(), false))
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, LibrarySet::from_names(["alpha"]));
        assert_eq!(outcome.failed, LibrarySet::from_names(["beta"]));

        let contrib = cache.path().join("bin/windows/contrib/4.3");
        assert_eq!(
            std::fs::read_to_string(contrib.join("alpha_1.0.zip")).unwrap(),
            "alpha-bytes"
        );
        assert!(!contrib.join("beta_2.1.zip").exists());
    }

    #[tokio::test]
    async fn test_http_source_index() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/src/contrib/PACKAGES")
            .with_status(200)
            .with_body("Package: alpha\nVersion: 1.0\n")
            .create_async()
            .await;

        let fetcher = MirrorFetcher::new(&server.url());
        let index = fetcher.source_index().await.unwrap();
        assert_eq!(index.len(), 1);
    }
}

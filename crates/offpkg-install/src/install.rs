//! Repository installation.
//!
//! The repository archive is a zip whose contrib directory holds one
//! artifact per library, and each artifact is itself an archive of that
//! library's payload. Installing therefore happens in two stages: copy the
//! artifact out of the repository into a private scratch directory, then
//! unpack the artifact into the library directory.
//!
//! Presence of `<lib_dir>/<name>` is the only "already installed" signal, so
//! re-running an install is a no-op for everything already present. Two
//! installers racing on the same library directory are not supported: the
//! existence check and the extraction are not atomic.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use offpkg_schema::{
    LibraryName, LibrarySet, Platform, Reporter, Warning, artifact_entry_pattern, contrib_dir,
    entry_file_name, library_artifact_pattern, runtime_version_from_path,
};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::InstallError;
use crate::extract::{self, ExtractError};

/// Default location of the repository archive, relative to the working
/// directory.
pub const DEFAULT_ARCHIVE: &str = "repository.zip";

/// Inputs to [`install_repository`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Repository archive produced by the builder.
    pub archive: PathBuf,
    /// Only install these libraries; `None` installs every matching artifact.
    pub libraries: Option<LibrarySet>,
    /// Target library directory. Created if missing. Its path must embed the
    /// runtime `major.minor` version.
    pub lib_dir: PathBuf,
    /// Binary flavor to look for in the archive.
    pub platform: Platform,
    /// Parent directory for the private scratch directory. Defaults to the
    /// system temp dir.
    pub scratch_root: Option<PathBuf>,
    /// Report per-library progress.
    pub verbose: bool,
}

impl InstallOptions {
    /// Options installing everything in `archive` into `lib_dir` for the host
    /// platform.
    pub fn new(archive: impl Into<PathBuf>, lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            libraries: None,
            lib_dir: lib_dir.into(),
            platform: Platform::host(),
            scratch_root: None,
            verbose: false,
        }
    }

    /// Restrict the install to `libraries`.
    pub fn with_libraries(mut self, libraries: LibrarySet) -> Self {
        self.libraries = Some(libraries);
        self
    }

    /// Override the platform.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Create the scratch directory under `root`.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Enable per-library progress.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Outcome of an install run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Contrib directory searched inside the archive.
    pub contrib_dir: String,
    /// Archive entries selected for installation.
    pub matched: Vec<String>,
    /// Libraries unpacked into the library directory by this run.
    pub installed: Vec<LibraryName>,
    /// Libraries whose directory already existed.
    pub skipped: Vec<LibraryName>,
    /// Explicitly requested libraries with no artifact in the archive.
    pub missing: LibrarySet,
    /// Non-fatal conditions, in the order they were reported.
    pub warnings: Vec<Warning>,
}

impl InstallReport {
    fn warn<R: Reporter + ?Sized>(&mut self, reporter: &R, warning: Warning) {
        reporter.warning(&warning);
        self.warnings.push(warning);
    }
}

/// Install libraries from a repository archive into a library directory.
///
/// Entries are processed in archive order. A library whose directory already
/// exists is skipped. The first artifact that cannot be read aborts the run;
/// libraries installed before it stay installed. The scratch directory is
/// removed on every exit path.
///
/// # Errors
///
/// Returns [`InstallError::ArchiveRead`] if the repository archive or one of
/// its artifacts is missing or corrupt, and [`InstallError::Io`] if the
/// library or scratch directory cannot be written.
pub fn install_repository<R: Reporter + ?Sized>(
    opts: &InstallOptions,
    reporter: &R,
) -> Result<InstallReport, InstallError> {
    let start = Instant::now();

    if !opts.lib_dir.exists() {
        info!(lib_dir = %opts.lib_dir.display(), "creating library directory");
        fs::create_dir_all(&opts.lib_dir)?;
    }

    // An unrecognisable path leaves the version empty, which matches nothing
    // and ends in the "no packages found" warning below.
    let runtime_version = runtime_version_from_path(&opts.lib_dir).unwrap_or_default();
    let contrib = contrib_dir(opts.platform, &runtime_version);
    let mut report = InstallReport {
        contrib_dir: contrib.clone(),
        ..InstallReport::default()
    };

    let mut archive = open_repository(&opts.archive)?;
    let entry_pattern = artifact_entry_pattern(opts.platform, &runtime_version)?;
    let candidates: Vec<String> = extract::list_entries(&archive)
        .into_iter()
        .filter(|name| entry_pattern.is_match(name))
        .collect();
    debug!(count = candidates.len(), contrib = %contrib, "artifact entries found");

    report.matched = match &opts.libraries {
        None => candidates,
        Some(requested) => {
            let (matched, missing) = select_requested(&candidates, requested, opts.platform)?;
            if !missing.is_empty() {
                let warning = Warning::MissingRequested {
                    requested: requested.len(),
                    found: requested.len() - missing.len(),
                    missing: missing.clone(),
                };
                report.warn(reporter, warning);
            }
            report.missing = missing;
            matched
        }
    };

    if report.matched.is_empty() {
        report.warn(
            reporter,
            Warning::NoPackagesFound {
                contrib_dir: contrib,
            },
        );
        return Ok(report);
    }

    let scratch = scratch_dir(opts.scratch_root.as_deref())?;
    let total = report.matched.len();
    reporter.section("Installing");

    let entries = report.matched.clone();
    for (i, entry) in entries.iter().enumerate() {
        let artifact = scratch.path().join(entry_file_name(entry));
        extract::extract_entry(&mut archive, entry, &artifact)
            .map_err(|e| archive_error(&opts.archive, &e))?;

        let dir_name = extract::top_level_dir(&artifact).map_err(|e| archive_error(&artifact, &e))?;
        let name = LibraryName::new(&dir_name);

        if opts.lib_dir.join(&dir_name).exists() {
            debug!(library = %name, "already installed, skipping");
            reporter.skipped(&name, "already installed");
            report.skipped.push(name);
            fs::remove_file(&artifact)?;
            continue;
        }

        if opts.verbose {
            reporter.installing(&name, i + 1, total);
        }
        let files = extract::extract_artifact(&artifact, &opts.lib_dir)
            .map_err(|e| archive_error(&artifact, &e))?;
        fs::remove_file(&artifact)?;

        if opts.verbose {
            reporter.done(&name, &format!("{} files", files.len()));
        }
        report.installed.push(name);
    }

    scratch.close()?;
    reporter.summary(
        report.installed.len(),
        "installed",
        start.elapsed().as_secs_f64(),
    );
    Ok(report)
}

fn open_repository(path: &Path) -> Result<ZipArchive<BufReader<File>>, InstallError> {
    let file = File::open(path).map_err(|e| InstallError::ArchiveRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| InstallError::ArchiveRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Split `candidates` into entries belonging to a requested library, and the
/// requested libraries with no entry at all.
fn select_requested(
    candidates: &[String],
    requested: &LibrarySet,
    platform: Platform,
) -> Result<(Vec<String>, LibrarySet), InstallError> {
    let mut patterns = Vec::with_capacity(requested.len());
    for name in requested {
        patterns.push((name, library_artifact_pattern(name, platform)?));
    }

    let mut found = LibrarySet::new();
    let matched = candidates
        .iter()
        .filter(|entry| {
            let file_name = entry_file_name(entry);
            match patterns.iter().find(|(_, re)| re.is_match(file_name)) {
                Some((name, _)) => {
                    found.insert((*name).clone());
                    true
                }
                None => false,
            }
        })
        .cloned()
        .collect();

    Ok((matched, requested.difference(&found)))
}

fn scratch_dir(root: Option<&Path>) -> Result<tempfile::TempDir, InstallError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("offpkg-install-");
    let dir = match root {
        Some(root) => {
            fs::create_dir_all(root)?;
            builder.tempdir_in(root)?
        }
        None => builder.tempdir()?,
    };
    Ok(dir)
}

fn archive_error(path: &Path, err: &ExtractError) -> InstallError {
    InstallError::ArchiveRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{write_tar_gz, write_zip};
    use offpkg_schema::NullReporter;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    /// Reporter that remembers warnings and progress calls.
    #[derive(Default)]
    struct Recorder {
        warnings: Mutex<Vec<Warning>>,
        progress: Mutex<Vec<(String, usize, usize)>>,
    }

    impl Reporter for Recorder {
        fn section(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn warning(&self, warning: &Warning) {
            self.warnings.lock().unwrap().push(warning.clone());
        }
        fn installing(&self, name: &LibraryName, current: usize, total: usize) {
            self.progress
                .lock()
                .unwrap()
                .push((name.to_string(), current, total));
        }
        fn skipped(&self, _: &LibraryName, _: &str) {}
        fn done(&self, _: &LibraryName, _: &str) {}
        fn summary(&self, _: usize, _: &str, _: f64) {}
    }

    struct Fixture {
        dir: TempDir,
        archive: PathBuf,
        lib_dir: PathBuf,
        scratch_root: PathBuf,
    }

    impl Fixture {
        /// A windows/4.3 repository holding one zip artifact per name.
        fn new(names: &[&str]) -> Self {
            let dir = tempdir().unwrap();
            let staging = dir.path().join("staging");
            fs::create_dir_all(&staging).unwrap();

            let mut artifacts: Vec<(String, Vec<u8>)> = Vec::new();
            for name in names {
                let artifact = staging.join(format!("{name}_1.0.zip"));
                let description = format!("Package: {name}\nVersion: 1.0\n");
                let description_path = format!("{name}/DESCRIPTION");
                let code_path = format!("{name}/R/{name}");
                write_zip(
                    &artifact,
                    &[
                        (description_path.as_str(), description.as_bytes()),
                        (code_path.as_str(), b"# code".as_slice()),
                    ],
                );
                artifacts.push((
                    format!("bin/windows/contrib/4.3/{name}_1.0.zip"),
                    fs::read(&artifact).unwrap(),
                ));
            }
            artifacts.push((
                "bin/windows/contrib/4.3/PACKAGES".to_string(),
                b"Package: x\nVersion: 1.0\n".to_vec(),
            ));

            let archive = dir.path().join("repository.zip");
            let files: Vec<(&str, &[u8])> = artifacts
                .iter()
                .map(|(n, d)| (n.as_str(), d.as_slice()))
                .collect();
            write_zip(&archive, &files);

            Self {
                lib_dir: dir.path().join("R/win-library/4.3"),
                scratch_root: dir.path().join("scratch"),
                archive,
                dir,
            }
        }

        fn options(&self) -> InstallOptions {
            InstallOptions::new(&self.archive, &self.lib_dir)
                .with_platform(Platform::Windows)
                .with_scratch_root(&self.scratch_root)
        }

        fn installed(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(&self.lib_dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        fn scratch_is_empty(&self) -> bool {
            !self.scratch_root.exists() || fs::read_dir(&self.scratch_root).unwrap().count() == 0
        }
    }

    #[test]
    fn test_installs_everything_and_creates_lib_dir() {
        let fx = Fixture::new(&["alpha", "beta", "gamma"]);
        assert!(!fx.lib_dir.exists());

        let report = install_repository(&fx.options(), &NullReporter).unwrap();

        assert_eq!(fx.installed(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(report.installed.len(), 3);
        assert!(report.warnings.is_empty());
        assert!(fx.lib_dir.join("alpha/DESCRIPTION").exists());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let fx = Fixture::new(&["alpha", "beta"]);
        install_repository(&fx.options(), &NullReporter).unwrap();
        let marker = fx.lib_dir.join("alpha/DESCRIPTION");
        fs::write(&marker, "locally modified").unwrap();

        let report = install_repository(&fx.options(), &NullReporter).unwrap();

        assert!(report.installed.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(fx.installed(), vec!["alpha", "beta"]);
        assert_eq!(fs::read_to_string(marker).unwrap(), "locally modified");
    }

    #[test]
    fn test_selective_install_leaves_others_alone() {
        let fx = Fixture::new(&["alpha", "beta", "gamma"]);
        let opts = fx
            .options()
            .with_libraries(LibrarySet::from_names(["alpha", "beta"]));

        let report = install_repository(&opts, &NullReporter).unwrap();

        assert_eq!(fx.installed(), vec!["alpha", "beta"]);
        assert!(report.missing.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_selective_install_does_not_match_name_prefixes() {
        let fx = Fixture::new(&["alpha", "alphabet"]);
        let opts = fx.options().with_libraries(LibrarySet::from_names(["alpha"]));

        install_repository(&opts, &NullReporter).unwrap();

        assert_eq!(fx.installed(), vec!["alpha"]);
    }

    #[test]
    fn test_missing_requested_names_are_reported_precisely() {
        let fx = Fixture::new(&["alpha", "beta"]);
        let recorder = Recorder::default();
        let opts = fx
            .options()
            .with_libraries(LibrarySet::from_names(["alpha", "zeta"]));

        let report = install_repository(&opts, &recorder).unwrap();

        assert_eq!(fx.installed(), vec!["alpha"]);
        assert_eq!(report.missing, LibrarySet::from_names(["zeta"]));
        assert_eq!(
            *recorder.warnings.lock().unwrap(),
            vec![Warning::MissingRequested {
                missing: LibrarySet::from_names(["zeta"]),
                requested: 2,
                found: 1,
            }]
        );
    }

    #[test]
    fn test_wrong_runtime_version_is_an_empty_no_op() {
        let fx = Fixture::new(&["alpha"]);
        let recorder = Recorder::default();
        let mut opts = fx.options();
        opts.lib_dir = fx.dir.path().join("R/win-library/4.1");

        let report = install_repository(&opts, &recorder).unwrap();

        assert!(report.installed.is_empty());
        assert_eq!(fs::read_dir(&opts.lib_dir).unwrap().count(), 0);
        let warnings = recorder.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0],
            Warning::NoPackagesFound {
                contrib_dir: "bin/windows/contrib/4.1".to_string()
            }
        );
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_lib_dir_without_version_matches_nothing() {
        let fx = Fixture::new(&["alpha"]);
        let mut opts = fx.options();
        opts.lib_dir = fx.dir.path().join("plain-lib");

        let report = install_repository(&opts, &NullReporter).unwrap();

        assert!(report.matched.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_missing_archive_is_fatal() {
        let fx = Fixture::new(&["alpha"]);
        let mut opts = fx.options();
        opts.archive = fx.dir.path().join("nope.zip");

        let err = install_repository(&opts, &NullReporter).unwrap_err();
        assert!(matches!(err, InstallError::ArchiveRead { .. }));
    }

    #[test]
    fn test_corrupt_artifact_aborts_batch_and_cleans_scratch() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("alpha_1.0.zip");
        write_zip(&staging, &[("alpha/DESCRIPTION", b"Package: alpha".as_slice())]);
        let alpha = fs::read(&staging).unwrap();

        let archive = dir.path().join("repository.zip");
        write_zip(
            &archive,
            &[
                ("bin/windows/contrib/4.3/alpha_1.0.zip", alpha.as_slice()),
                ("bin/windows/contrib/4.3/broken_1.0.zip", b"garbage".as_slice()),
                ("bin/windows/contrib/4.3/gamma_1.0.zip", alpha.as_slice()),
            ],
        );
        let lib_dir = dir.path().join("lib/4.3");
        let scratch_root = dir.path().join("scratch");
        let opts = InstallOptions::new(&archive, &lib_dir)
            .with_platform(Platform::Windows)
            .with_scratch_root(&scratch_root);

        let err = install_repository(&opts, &NullReporter).unwrap_err();

        assert!(matches!(err, InstallError::ArchiveRead { .. }));
        assert!(lib_dir.join("alpha").exists(), "earlier installs are kept");
        assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    }

    #[test]
    fn test_tgz_artifacts_on_macos() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("beta_2.0.tgz");
        write_tar_gz(&staging, &[("beta/DESCRIPTION", b"Package: beta".as_slice())]);
        let beta = fs::read(&staging).unwrap();

        let archive = dir.path().join("repository.zip");
        write_zip(
            &archive,
            &[("bin/macosx/contrib/4.4/beta_2.0.tgz", beta.as_slice())],
        );
        let lib_dir = dir.path().join("Library/R/4.4/library");
        let opts = InstallOptions::new(&archive, &lib_dir).with_platform(Platform::MacOs);

        let report = install_repository(&opts, &NullReporter).unwrap();

        assert_eq!(report.installed, vec![LibraryName::new("beta")]);
        assert!(lib_dir.join("beta/DESCRIPTION").exists());
    }

    #[test]
    fn test_verbose_reports_progress() {
        let fx = Fixture::new(&["alpha", "beta"]);
        let recorder = Recorder::default();

        install_repository(&fx.options().verbose(true), &recorder).unwrap();

        assert_eq!(
            *recorder.progress.lock().unwrap(),
            vec![("alpha".to_string(), 1, 2), ("beta".to_string(), 2, 2)]
        );
    }

    #[test]
    fn test_quiet_reports_no_progress() {
        let fx = Fixture::new(&["alpha"]);
        let recorder = Recorder::default();

        install_repository(&fx.options(), &recorder).unwrap();

        assert!(recorder.progress.lock().unwrap().is_empty());
    }
}

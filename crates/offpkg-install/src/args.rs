//! Command-line arguments shared by `offpkg-install` and `offpkg install`.
//!
//! All environment lookups for the installer happen here, so the install
//! logic itself only ever sees explicit options.

use std::path::PathBuf;

use clap::Args;
use offpkg_schema::{LibraryName, LibrarySet, Platform};

use crate::install::{DEFAULT_ARCHIVE, InstallOptions};

/// Arguments for installing from a repository archive.
#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    /// Repository archive to install from
    #[arg(long, env = "OFFPKG_ARCHIVE", default_value = DEFAULT_ARCHIVE)]
    pub archive: PathBuf,

    /// Only install these libraries (repeatable); installs everything if omitted
    #[arg(long = "lib", value_name = "NAME")]
    pub libraries: Vec<LibraryName>,

    /// Target library directory; the first entry of a path list is used
    #[arg(long, env = "R_LIBS_USER", value_parser = first_path)]
    pub lib_dir: PathBuf,

    /// Binary platform to install (defaults to the host platform)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Directory to create the temporary scratch directory in
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Print per-library progress
    #[arg(short, long)]
    pub verbose: bool,
}

impl InstallArgs {
    /// Convert into installer options.
    pub fn into_options(self) -> InstallOptions {
        let mut opts = InstallOptions::new(self.archive, self.lib_dir)
            .with_platform(self.platform.unwrap_or_else(Platform::host))
            .verbose(self.verbose);
        if !self.libraries.is_empty() {
            opts = opts.with_libraries(self.libraries.into_iter().collect::<LibrarySet>());
        }
        if let Some(dir) = self.scratch_dir {
            opts = opts.with_scratch_root(dir);
        }
        opts
    }
}

fn first_path(value: &str) -> Result<PathBuf, String> {
    std::env::split_paths(value)
        .find(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| "library directory must not be empty".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: InstallArgs,
    }

    #[test]
    fn test_subset_and_platform() {
        let cli = TestCli::try_parse_from([
            "test",
            "--lib-dir",
            "/tmp/lib/4.3",
            "--lib",
            "alpha",
            "--lib",
            "beta",
            "--platform",
            "windows",
        ])
        .unwrap();
        let opts = cli.args.into_options();

        assert_eq!(opts.libraries, Some(LibrarySet::from_names(["alpha", "beta"])));
        assert_eq!(opts.platform, Platform::Windows);
        assert_eq!(opts.lib_dir, PathBuf::from("/tmp/lib/4.3"));
    }

    #[test]
    fn test_no_subset_means_everything() {
        let cli = TestCli::try_parse_from(["test", "--lib-dir", "/tmp/lib/4.3"]).unwrap();
        assert_eq!(cli.args.into_options().libraries, None);
    }

    #[test]
    fn test_invalid_library_name_is_rejected() {
        let result = TestCli::try_parse_from(["test", "--lib-dir", "/x/4.3", "--lib", "../etc"]);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_first_path_of_a_list() {
        assert_eq!(
            first_path("/a/4.3:/b/4.3").unwrap(),
            PathBuf::from("/a/4.3")
        );
        assert!(first_path("").is_err());
    }
}

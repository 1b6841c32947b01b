//! Repository layout.
//!
//! Layout: `bin/<platform>/contrib/<runtime-version>/<name>_<version>.<ext>`
//! Layout: `bin/<platform>/contrib/<runtime-version>/PACKAGES{,.gz}`
//!
//! The builder writes this tree and the installer pattern-matches entry
//! names against it directly; the index files are never consulted on the
//! install side.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::platform::Platform;
use crate::types::LibraryName;

/// Plain-text package listing written next to the artifacts.
pub const INDEX_FILE: &str = "PACKAGES";

/// Gzip-compressed copy of [`INDEX_FILE`].
pub const INDEX_FILE_GZ: &str = "PACKAGES.gz";

/// Version component of an artifact filename: `1.0`, `1.2-3`, `0.4.11`.
pub const VERSION_PATTERN: &str = r"[0-9]+(?:[.-][0-9]+)*";

static RUNTIME_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+").expect("Invalid runtime version regex"));

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9._]*)_([0-9]+(?:[.-][0-9]+)*)\.(zip|tgz|tar\.gz)$")
        .expect("Invalid artifact name regex")
});

/// Relative contrib directory for a target, always `/`-separated.
pub fn contrib_dir(platform: Platform, runtime_version: &str) -> String {
    format!("bin/{}/contrib/{runtime_version}", platform.as_str())
}

/// Filename of a library's binary artifact: `<name>_<version>.<ext>`.
pub fn artifact_file_name(name: &LibraryName, version: &str, platform: Platform) -> String {
    format!("{name}_{version}.{}", platform.artifact_ext())
}

/// Split an artifact filename into library name and version.
///
/// Accepts any of the supported artifact extensions so the builder can
/// recognise what it downloaded without knowing the platform.
pub fn parse_artifact_file_name(file_name: &str) -> Option<(LibraryName, String)> {
    let caps = ARTIFACT_NAME.captures(file_name)?;
    Some((LibraryName::new(&caps[1]), caps[2].to_string()))
}

/// Pattern matching archive entries that sit exactly one level below the
/// contrib directory and carry the platform's artifact extension.
///
/// # Errors
///
/// Returns an error only if the escaped pattern exceeds the regex size limit.
pub fn artifact_entry_pattern(
    platform: Platform,
    runtime_version: &str,
) -> Result<Regex, regex::Error> {
    let pattern = format!(
        "^{}/[^/]+\\.{}$",
        regex::escape(&contrib_dir(platform, runtime_version)),
        regex::escape(platform.artifact_ext()),
    );
    Regex::new(&pattern)
}

/// Pattern matching the artifact filename of one specific library.
///
/// # Errors
///
/// Returns an error only if the escaped pattern exceeds the regex size limit.
pub fn library_artifact_pattern(name: &str, platform: Platform) -> Result<Regex, regex::Error> {
    let pattern = format!(
        "^{}_{VERSION_PATTERN}\\.{}$",
        regex::escape(name),
        regex::escape(platform.artifact_ext()),
    );
    Regex::new(&pattern)
}

/// Recover the runtime `major.minor` version embedded in a library path.
///
/// User library directories conventionally end in the runtime version
/// (`~/R/x86_64-pc-linux-gnu-library/4.3`), so the last `major.minor` match
/// in the path wins.
pub fn runtime_version_from_path(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    RUNTIME_VERSION
        .find_iter(&text)
        .last()
        .map(|m| m.as_str().to_string())
}

/// Final `/`-separated component of an archive entry name.
pub fn entry_file_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_artifact_file_name() {
        let name = LibraryName::new("alpha");
        assert_eq!(
            artifact_file_name(&name, "1.0-2", Platform::Windows),
            "alpha_1.0-2.zip"
        );
        assert_eq!(
            artifact_file_name(&name, "1.0", Platform::Linux),
            "alpha_1.0.tar.gz"
        );
    }

    #[test]
    fn test_parse_artifact_file_name() {
        let (name, version) = parse_artifact_file_name("data.table_1.14.8.zip").unwrap();
        assert_eq!(name, "data.table");
        assert_eq!(version, "1.14.8");

        let (name, version) = parse_artifact_file_name("Rcpp_1.0-11.tgz").unwrap();
        assert_eq!(name, "Rcpp");
        assert_eq!(version, "1.0-11");

        assert!(parse_artifact_file_name("PACKAGES").is_none());
        assert!(parse_artifact_file_name("alpha.zip").is_none());
    }

    #[test]
    fn test_entry_pattern_is_one_level_deep() {
        let re = artifact_entry_pattern(Platform::Windows, "4.3").unwrap();
        assert!(re.is_match("bin/windows/contrib/4.3/alpha_1.0.zip"));
        assert!(!re.is_match("bin/windows/contrib/4.3/nested/alpha_1.0.zip"));
        assert!(!re.is_match("bin/windows/contrib/4.3/PACKAGES"));
        assert!(!re.is_match("bin/windows/contrib/4.2/alpha_1.0.zip"));
        // The dot in the version must not act as a wildcard.
        assert!(!re.is_match("bin/windows/contrib/4x3/alpha_1.0.zip"));
    }

    #[test]
    fn test_library_pattern_does_not_match_prefixes() {
        let re = library_artifact_pattern("alpha", Platform::Windows).unwrap();
        assert!(re.is_match("alpha_1.0.zip"));
        assert!(re.is_match("alpha_0.4-11.zip"));
        assert!(!re.is_match("alphabet_1.0.zip"));
        assert!(!re.is_match("alpha_1.0.tgz"));

        let dotted = library_artifact_pattern("data.table", Platform::Windows).unwrap();
        assert!(dotted.is_match("data.table_1.14.8.zip"));
        assert!(!dotted.is_match("dataXtable_1.14.8.zip"));
    }

    #[test]
    fn test_runtime_version_from_path() {
        let unix = PathBuf::from("/home/me/R/x86_64-pc-linux-gnu-library/4.3");
        assert_eq!(runtime_version_from_path(&unix).as_deref(), Some("4.3"));

        let windows = PathBuf::from(r"C:\Users\me\AppData\Local\R\win-library\4.2");
        assert_eq!(runtime_version_from_path(&windows).as_deref(), Some("4.2"));

        let none = PathBuf::from("/opt/libs");
        assert_eq!(runtime_version_from_path(&none), None);
    }

    #[test]
    fn test_entry_file_name() {
        assert_eq!(entry_file_name("bin/windows/contrib/4.3/a_1.zip"), "a_1.zip");
        assert_eq!(entry_file_name("a_1.zip"), "a_1.zip");
    }
}

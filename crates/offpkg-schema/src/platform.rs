//! Binary targets.
//!
//! A repository holds exactly one binary flavor per library, selected by the
//! platform family and the runtime's `major.minor` version. Both components
//! show up verbatim in the contrib path.

use serde::{Deserialize, Serialize};

use crate::types::SchemaError;

/// Operating-system family a binary artifact was built for.
///
/// # Example
///
/// ```
/// use offpkg_schema::Platform;
///
/// let platform: Platform = "windows".parse().unwrap();
/// assert_eq!(platform.artifact_ext(), "zip");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows binaries, packaged as `.zip`.
    Windows,
    /// macOS binaries, packaged as `.tgz`.
    #[serde(rename = "macosx")]
    MacOs,
    /// Linux binaries, packaged as `.tar.gz`.
    Linux,
}

impl Platform {
    /// The platform this process is running on.
    pub fn host() -> Self {
        #[cfg(target_os = "windows")]
        {
            Self::Windows
        }
        #[cfg(target_os = "macos")]
        {
            Self::MacOs
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            Self::Linux
        }
    }

    /// Path segment used under `bin/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macosx",
            Self::Linux => "linux",
        }
    }

    /// File extension of a per-library artifact, without the leading dot.
    pub fn artifact_ext(&self) -> &'static str {
        match self {
            Self::Windows => "zip",
            Self::MacOs => "tgz",
            Self::Linux => "tar.gz",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win" | "win.binary" => Ok(Self::Windows),
            "macosx" | "macos" | "mac" | "mac.binary" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            _ => Err(SchemaError::UnknownPlatform(s.to_string())),
        }
    }
}

/// The `{platform, runtime-version}` pair a repository is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryTarget {
    /// Operating-system family.
    pub platform: Platform,
    /// Runtime `major.minor` version string, e.g. `4.3`.
    pub runtime_version: String,
}

impl RepositoryTarget {
    /// Create a target.
    pub fn new(platform: Platform, runtime_version: impl Into<String>) -> Self {
        Self {
            platform,
            runtime_version: runtime_version.into(),
        }
    }

    /// Relative contrib directory, `bin/<platform>/contrib/<runtime-version>`.
    pub fn contrib_dir(&self) -> String {
        crate::layout::contrib_dir(self.platform, &self.runtime_version)
    }
}

impl std::fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.platform, self.runtime_version)
    }
}

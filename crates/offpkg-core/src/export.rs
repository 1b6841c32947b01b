//! Exporting the standalone installer for transfer to an offline machine.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::BuildError;

/// File name of the standalone installer executable.
pub const INSTALLER_NAME: &str = "offpkg-install";

/// The installer that ships next to the running executable.
pub fn bundled_installer() -> Result<PathBuf, BuildError> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        BuildError::packaging(&exe, "executable has no parent directory")
    })?;
    Ok(dir.join(format!("{INSTALLER_NAME}{}", std::env::consts::EXE_SUFFIX)))
}

/// Copy the bundled installer to `dest`, creating parent directories.
///
/// # Errors
///
/// [`BuildError::Packaging`] if `bundled` is missing, and
/// [`BuildError::DestinationExists`] if `dest` exists and `overwrite` is off.
pub fn export_installer(bundled: &Path, dest: &Path, overwrite: bool) -> Result<PathBuf, BuildError> {
    if !bundled.is_file() {
        return Err(BuildError::packaging(
            bundled,
            "bundled installer is missing; the distribution is incomplete",
        ));
    }
    if dest.exists() && !overwrite {
        return Err(BuildError::DestinationExists(dest.to_path_buf()));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::copy(bundled, dest)?;
    info!(dest = %dest.display(), "installer exported");
    Ok(dest.to_path_buf())
}

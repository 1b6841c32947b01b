use std::path::{Path, PathBuf};

use anyhow::Result;
use offpkg_core::{bundled_installer, export_installer};

pub fn export(dest: &Path, force: bool, installer: Option<PathBuf>) -> Result<()> {
    let bundled = match installer {
        Some(path) => path,
        None => bundled_installer()?,
    };

    let written = export_installer(&bundled, dest, force)?;
    println!("Installer written to {}", written.display());
    Ok(())
}

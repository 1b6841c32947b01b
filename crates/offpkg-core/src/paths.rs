use dirs::home_dir;
use std::path::PathBuf;

/// Returns the offpkg home directory, or None if the user's home cannot be resolved.
pub fn try_offpkg_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("OFFPKG_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".offpkg"))
}

/// Default download cache: ~/.offpkg/cache
pub fn cache_path() -> Option<PathBuf> {
    try_offpkg_home().map(|h| h.join("cache"))
}

/// Default config file: ~/.offpkg/offpkg.toml
pub fn config_path() -> Option<PathBuf> {
    try_offpkg_home().map(|h| h.join(crate::config::CONFIG_FILE))
}

//! Platform cache locations for stub and compiled-module summaries.
//!
//! The directory layout matches the established Python Language Server
//! locations so existing caches keep working.

use std::path::PathBuf;

const CACHE_SUFFIX: &str = "Microsoft/Python Language Server";

/// The per-user analysis cache directory for the host platform, if one can
/// be determined from the environment.
pub fn cache_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        windows_cache_dir()
    } else if cfg!(target_os = "macos") {
        macos_cache_dir()
    } else {
        unix_cache_dir()
    }
}

fn windows_cache_dir() -> Option<PathBuf> {
    let local_app_data = std::env::var_os("LOCALAPPDATA")?;
    Some(PathBuf::from(local_app_data).join(CACHE_SUFFIX))
}

fn macos_cache_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join("Library/Caches").join(CACHE_SUFFIX))
}

fn unix_cache_dir() -> Option<PathBuf> {
    if let Some(xdg_cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        if !xdg_cache_home.is_empty() {
            return Some(PathBuf::from(xdg_cache_home).join(CACHE_SUFFIX));
        }
    }
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(CACHE_SUFFIX))
}

#[cfg(all(test, not(any(windows, target_os = "macos"))))]
mod tests {
    use super::cache_dir;

    #[test]
    fn unix_cache_location() {
        // Whichever of XDG_CACHE_HOME / HOME is set, the suffix is fixed.
        if let Some(dir) = cache_dir() {
            assert!(dir.ends_with("Microsoft/Python Language Server"));
        }
    }
}

//! Special-folder resolution for per-user product directories.
//!
//! One lookup table, one system call, an environment-variable fallback for
//! stripped-down environments (containers, CI) where the platform call comes
//! back empty.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// The well-known per-user folders this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFolder {
    Home,
    Config,
    Cache,
    Data,
}

/// Resolve a special folder, falling back to environment variables when the
/// platform lookup yields nothing.
pub fn resolve(folder: SpecialFolder) -> Option<PathBuf> {
    let system = match folder {
        SpecialFolder::Home => dirs::home_dir(),
        SpecialFolder::Config => dirs::config_dir(),
        SpecialFolder::Cache => dirs::cache_dir(),
        SpecialFolder::Data => dirs::data_dir(),
    };
    system.or_else(|| env_fallback(folder))
}

fn env_fallback(folder: SpecialFolder) -> Option<PathBuf> {
    match folder {
        SpecialFolder::Home => var_path("HOME").or_else(|| var_path("USERPROFILE")),
        SpecialFolder::Config => var_path("XDG_CONFIG_HOME")
            .or_else(|| var_path("APPDATA"))
            .or_else(|| Some(env_fallback(SpecialFolder::Home)?.join(".config"))),
        SpecialFolder::Cache => var_path("XDG_CACHE_HOME")
            .or_else(|| var_path("LOCALAPPDATA"))
            .or_else(|| Some(env_fallback(SpecialFolder::Home)?.join(".cache"))),
        SpecialFolder::Data => var_path("XDG_DATA_HOME")
            .or_else(|| var_path("APPDATA"))
            .or_else(|| Some(env_fallback(SpecialFolder::Home)?.join(".local/share"))),
    }
}

fn var_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Product subdirectory name, following platform naming conventions.
fn product_subdir() -> &'static str {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        "PresenceBridge"
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "presencebridge"
    }
}

/// Per-user configuration directory for this product.
pub fn app_config_dir() -> Result<PathBuf> {
    let base = resolve(SpecialFolder::Config)
        .context("No configuration directory available on this system")?;
    Ok(base.join(product_subdir()))
}

/// Per-user cache directory for this product.
pub fn app_cache_dir() -> Result<PathBuf> {
    let base =
        resolve(SpecialFolder::Cache).context("No cache directory available on this system")?;
    Ok(base.join(product_subdir()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_resolves_on_dev_machines() {
        // HOME (or USERPROFILE on Windows) is set everywhere we run tests.
        assert!(resolve(SpecialFolder::Home).is_some());
    }

    #[test]
    fn product_dirs_end_with_product_name() {
        let config = app_config_dir().unwrap();
        let cache = app_cache_dir().unwrap();
        assert!(config.ends_with(product_subdir()));
        assert!(cache.ends_with(product_subdir()));
        assert_ne!(config, cache);
    }
}

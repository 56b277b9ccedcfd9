//! Icon caching for presence artwork.
//!
//! Companion modules report presence icons as URLs. Native UIs (SwiftUI on
//! macOS, WPF on Windows) do the actual downloading; this module gives them a
//! local cache so the same artwork is not fetched on every presence refresh.
//!
//! - Remote (http/https) URLs are cached under the product cache directory
//! - Local file:// URLs pass through to the filesystem path directly
//! - Cache filenames are derived from the URL hash, keeping the extension
//!   when it looks like one

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::folders;

fn icon_cache_dir() -> Result<PathBuf> {
    Ok(folders::app_cache_dir()?.join("icons"))
}

/// Ensures the icon cache directory exists
fn ensure_cache_dir_exists() -> Result<PathBuf> {
    let cache_dir = icon_cache_dir()?;
    fs::create_dir_all(&cache_dir)
        .context(format!("Failed to create icon cache directory: {:?}", cache_dir))?;
    Ok(cache_dir)
}

/// Generate a cache filename from a URL
fn url_to_cache_filename(url: &str) -> String {
    // Hash-based filename to avoid filesystem issues with URL characters
    let hash = format!("{:x}", md5::compute(url.as_bytes()));

    // Try to preserve the extension
    if let Some(extension) = url.rsplit('.').next() {
        if extension.len() <= 4 && extension.chars().all(|c| c.is_alphanumeric()) {
            return format!("{}.{}", hash, extension);
        }
    }

    hash
}

/// Fetch an icon, returning the path to the cached file.
/// If the icon is not cached yet, returns an error naming the URL: the
/// native UI owns networking and is expected to download, then call
/// [`cache_icon_data`].
pub fn fetch_icon(url: &str) -> Result<PathBuf> {
    let cache_dir = ensure_cache_dir_exists()?;
    let cache_filename = url_to_cache_filename(url);
    let cache_path = cache_dir.join(&cache_filename);

    if cache_path.exists() {
        return Ok(cache_path);
    }

    Err(anyhow!("Icon not cached. Native UI should download from: {}", url))
}

/// Load icon data from the cache.
/// Returns the raw bytes of the icon file.
pub fn load_icon_data(url: &str) -> Result<Vec<u8>> {
    let cache_path = fetch_icon(url)?;
    fs::read(&cache_path).context(format!("Failed to read icon file: {:?}", cache_path))
}

/// Save icon data to the cache.
/// Called from FFI after the native UI downloads the icon.
pub fn cache_icon_data(url: &str, data: &[u8]) -> Result<PathBuf> {
    let cache_dir = ensure_cache_dir_exists()?;
    let cache_filename = url_to_cache_filename(url);
    let cache_path = cache_dir.join(&cache_filename);

    fs::write(&cache_path, data)
        .context(format!("Failed to write icon cache file: {:?}", cache_path))?;

    Ok(cache_path)
}

/// Get the cached icon path if it exists, without attempting to download.
/// For file:// URLs, returns the local path directly.
/// For HTTP(S) URLs, checks the cache.
pub fn get_cached_icon_path(url: &str) -> Option<PathBuf> {
    if url.starts_with("file://") {
        let path = PathBuf::from(url.trim_start_matches("file://"));
        if path.exists() {
            return Some(path);
        }
        return None;
    }

    if let Ok(cache_dir) = icon_cache_dir() {
        let cache_path = cache_dir.join(url_to_cache_filename(url));
        if cache_path.exists() {
            return Some(cache_path);
        }
    }

    None
}

/// Clear the icon cache directory
pub fn clear_icon_cache() -> Result<()> {
    let cache_dir = icon_cache_dir()?;

    if cache_dir.exists() {
        debug!(dir = ?cache_dir, "clearing icon cache");
        fs::remove_dir_all(&cache_dir)
            .context(format!("Failed to clear icon cache: {:?}", cache_dir))?;
        ensure_cache_dir_exists()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_filename_is_stable_and_keeps_short_extensions() {
        let a = url_to_cache_filename("https://cdn.example.com/art/icon.png");
        let b = url_to_cache_filename("https://cdn.example.com/art/icon.png");
        assert_eq!(a, b);
        assert!(a.ends_with(".png"));

        // A query string is not an extension.
        let c = url_to_cache_filename("https://cdn.example.com/icon?size=large");
        assert!(!c.contains('.'));
    }

    #[test]
    fn different_urls_hash_to_different_filenames() {
        let a = url_to_cache_filename("https://example.com/a.png");
        let b = url_to_cache_filename("https://example.com/b.png");
        assert_ne!(a, b);
    }

    #[test]
    fn file_url_passes_through_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let icon = dir.path().join("local.png");
        fs::write(&icon, b"png bytes").unwrap();

        let url = format!("file://{}", icon.display());
        assert_eq!(get_cached_icon_path(&url), Some(icon));

        let missing = format!("file://{}", dir.path().join("gone.png").display());
        assert_eq!(get_cached_icon_path(&missing), None);
    }
}

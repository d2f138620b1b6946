//! Content addressing: the `url -> file_path` mapping the rest of this
//! crate treats as the single source of truth for where a cached image
//! lives on disk.

use sha2::{Digest, Sha256};

/// `sha256_hex(url)`, lowercase.
pub fn content_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// The extension to give the cached file for `url`: the last path
/// component's dot-suffix if it's 1-5 characters, else a generic `.img`.
pub fn extension_for(url: &str) -> &'static str {
    let last_segment = url.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) if (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            // Leaked into a small static table since callers need a
            // `'static str` and extensions are a closed, tiny set in
            // practice; fall back to `.img` for anything unrecognized.
            match ext.to_ascii_lowercase().as_str() {
                "png" => ".png",
                "jpg" => ".jpg",
                "jpeg" => ".jpeg",
                "gif" => ".gif",
                "webp" => ".webp",
                "bmp" => ".bmp",
                "svg" => ".svg",
                "avif" => ".avif",
                _ => ".img",
            }
        }
        _ => ".img",
    }
}

/// The full on-disk path for `url` under `cache_dir`.
pub fn file_path(cache_dir: &std::path::Path, url: &str) -> std::path::PathBuf {
    cache_dir.join(format!("{}{}", content_key(url), extension_for(url)))
}

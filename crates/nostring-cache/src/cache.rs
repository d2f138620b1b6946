//! The image cache: one async mutex serializes every mutating operation
//! (spec §4.6/§5), so "decide to evict" and "write new file" never
//! interleave with a concurrent call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::addressing::file_path;
use crate::store::{self, EntryRow, StoreError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] StoreError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("item of {size} bytes exceeds cache capacity of {max} bytes")]
    ItemTooLarge { size: u64, max: u64 },
}

/// A cached image's metadata, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub url: String,
    pub file_path: PathBuf,
    pub size: u64,
    pub created_at: u64,
    pub last_accessed_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_size: u64,
    pub entry_count: u64,
    pub oldest_created_at: Option<u64>,
    pub newest_created_at: Option<u64>,
}

struct Inner {
    conn: Connection,
    index: HashMap<String, EntryRow>,
}

/// Content-addressed disk cache for fetched images.
pub struct ImageCache {
    cache_dir: PathBuf,
    max_cache_size: u64,
    inner: Mutex<Inner>,
}

impl ImageCache {
    /// Open (or create) the cache at `cache_dir`, with its metadata
    /// database and directory permissions to match.
    pub async fn initialize(cache_dir: impl Into<PathBuf>, max_cache_size: u64) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        set_owner_only_dir(&cache_dir)?;

        let db_path = cache_dir.join("cache.sqlite");
        let conn = store::open_db(&db_path)?;
        let index = store::all_by_last_accessed(&conn)?
            .into_iter()
            .map(|row| (row.url.clone(), row))
            .collect();

        Ok(Self { cache_dir, max_cache_size, inner: Mutex::new(Inner { conn, index }) })
    }

    /// An in-memory-only cache, for tests or environments with no database
    /// handle available.
    pub async fn initialize_in_memory(cache_dir: impl Into<PathBuf>, max_cache_size: u64) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        set_owner_only_dir(&cache_dir)?;
        let conn = store::open_in_memory()?;
        Ok(Self { cache_dir, max_cache_size, inner: Mutex::new(Inner { conn, index: HashMap::new() }) })
    }

    /// Look up `url`. Returns `None` if there's no entry, or if there is an
    /// entry but its backing file is missing from disk.
    ///
    /// Does **not** self-heal a missing-file entry: the stale row is left
    /// in place for the next `cache()` call on the same url to overwrite
    /// (spec §9 open question 1's resolution). This keeps `get()` a pure
    /// read with no surprising side effects.
    pub async fn get(&self, url: &str) -> Result<Option<CachedImage>, CacheError> {
        let mut inner = self.inner.lock().await;
        let Some(row) = inner.index.get(url).cloned() else {
            return Ok(None);
        };
        if !Path::new(&row.file_path).exists() {
            return Ok(None);
        }

        let now = now_secs();
        store::update_last_accessed(&inner.conn, url, now)?;
        if let Some(row) = inner.index.get_mut(url) {
            row.last_accessed_at = now;
        }

        Ok(Some(CachedImage {
            url: row.url,
            file_path: PathBuf::from(row.file_path),
            size: row.size,
            created_at: row.created_at,
            last_accessed_at: now,
        }))
    }

    /// Store `bytes` under `url`, evicting the least-recently-accessed
    /// entries first if needed to stay within `max_cache_size`.
    ///
    /// A single item larger than `max_cache_size` is rejected with
    /// `ItemTooLarge` rather than silently accepted (spec §9 open question
    /// 2's resolution) -- accepting it would leave the cache permanently
    /// over its configured bound.
    pub async fn cache(&self, url: &str, bytes: &[u8]) -> Result<CachedImage, CacheError> {
        let size = bytes.len() as u64;
        if size > self.max_cache_size {
            return Err(CacheError::ItemTooLarge { size, max: self.max_cache_size });
        }

        let mut inner = self.inner.lock().await;
        let path = file_path(&self.cache_dir, url);

        if let Some(existing) = inner.index.get(url).cloned() {
            let _ = std::fs::remove_file(&existing.file_path);
        }

        let current_total: u64 = inner.index.values().map(|e| e.size).sum();
        let projected = current_total.saturating_sub(inner.index.get(url).map(|e| e.size).unwrap_or(0)) + size;
        if projected > self.max_cache_size {
            evict_to_fit(&mut inner, self.max_cache_size.saturating_sub(size))?;
        }

        std::fs::write(&path, bytes)?;
        set_owner_only_file(&path)?;

        let now = now_secs();
        let row = EntryRow {
            url: url.to_string(),
            file_path: path.to_string_lossy().into_owned(),
            created_at: now,
            size,
            last_accessed_at: now,
        };
        store::upsert(&inner.conn, &row)?;
        inner.index.insert(url.to_string(), row.clone());

        Ok(CachedImage {
            url: row.url,
            file_path: PathBuf::from(row.file_path),
            size: row.size,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
        })
    }

    /// Remove `url`'s entry and file. Returns `true` if it existed.
    /// Idempotent: invalidating an already-absent url is a no-op.
    pub async fn invalidate(&self, url: &str) -> Result<bool, CacheError> {
        let mut inner = self.inner.lock().await;
        let Some(row) = inner.index.remove(url) else {
            return Ok(false);
        };
        let _ = std::fs::remove_file(&row.file_path);
        store::delete(&inner.conn, url)?;
        Ok(true)
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let entries: Vec<&EntryRow> = inner.index.values().collect();
        CacheStats {
            total_size: entries.iter().map(|e| e.size).sum(),
            entry_count: entries.len() as u64,
            oldest_created_at: entries.iter().map(|e| e.created_at).min(),
            newest_created_at: entries.iter().map(|e| e.created_at).max(),
        }
    }
}

/// Evict oldest-accessed entries from `inner` until the total size is
/// `<= target_size`. Called with the mutex already held.
fn evict_to_fit(inner: &mut Inner, target_size: u64) -> Result<(), CacheError> {
    let mut entries: Vec<EntryRow> = inner.index.values().cloned().collect();
    entries.sort_by_key(|e| e.last_accessed_at);

    let mut total: u64 = entries.iter().map(|e| e.size).sum();
    for entry in entries {
        if total <= target_size {
            break;
        }
        log::debug!("evicting {} ({} bytes) to stay within cache bound", entry.url, entry.size);
        let _ = std::fs::remove_file(&entry.file_path);
        store::delete(&inner.conn, &entry.url)?;
        inner.index.remove(&entry.url);
        total = total.saturating_sub(entry.size);
    }
    Ok(())
}

/// Nanosecond-resolution epoch timestamp. `last_accessed_at`/`created_at`
/// use this instead of whole seconds so two cache operations executed back
/// to back (as in tests) never tie for LRU ordering.
fn now_secs() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_nanos() as u64
}

#[cfg(unix)]
fn set_owner_only_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn set_owner_only_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_file(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_file(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

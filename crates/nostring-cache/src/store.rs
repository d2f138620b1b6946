//! SQLite metadata for cached entries: `(url, file_path, created_at, size,
//! last_accessed_at)`, indexed on `last_accessed_at` for LRU scans.
//!
//! A missing database handle collapses the cache to in-memory-map-only mode
//! (spec §4.6), which the in-memory `rusqlite::Connection::open_in_memory`
//! path below serves just as well as a literal "no database" branch would,
//! without a second code path to keep in sync.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub url: String,
    pub file_path: String,
    pub created_at: u64,
    pub size: u64,
    pub last_accessed_at: u64,
}

pub fn open_db(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            url             TEXT PRIMARY KEY,
            file_path       TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            size            INTEGER NOT NULL,
            last_accessed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cache_entries_last_accessed
            ON cache_entries(last_accessed_at);",
    )?;
    Ok(())
}

pub fn upsert(conn: &Connection, entry: &EntryRow) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO cache_entries (url, file_path, created_at, size, last_accessed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.url, entry.file_path, entry.created_at, entry.size, entry.last_accessed_at],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, url: &str) -> Result<Option<EntryRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT url, file_path, created_at, size, last_accessed_at FROM cache_entries WHERE url = ?1",
            params![url],
            |row| {
                Ok(EntryRow {
                    url: row.get(0)?,
                    file_path: row.get(1)?,
                    created_at: row.get(2)?,
                    size: row.get(3)?,
                    last_accessed_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn update_last_accessed(conn: &Connection, url: &str, last_accessed_at: u64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE cache_entries SET last_accessed_at = ?2 WHERE url = ?1",
        params![url, last_accessed_at],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, url: &str) -> Result<(), StoreError> {
    conn.execute("DELETE FROM cache_entries WHERE url = ?1", params![url])?;
    Ok(())
}

/// All entries ordered oldest-accessed first, for LRU eviction scans.
pub fn all_by_last_accessed(conn: &Connection) -> Result<Vec<EntryRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT url, file_path, created_at, size, last_accessed_at
         FROM cache_entries ORDER BY last_accessed_at ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(EntryRow {
                url: row.get(0)?,
                file_path: row.get(1)?,
                created_at: row.get(2)?,
                size: row.get(3)?,
                last_accessed_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn total_size(conn: &Connection) -> Result<u64, StoreError> {
    let total: Option<i64> = conn.query_row("SELECT SUM(size) FROM cache_entries", [], |row| row.get(0))?;
    Ok(total.unwrap_or(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(url: &str, size: u64, last_accessed_at: u64) -> EntryRow {
        EntryRow { url: url.to_string(), file_path: format!("/tmp/{url}"), created_at: 0, size, last_accessed_at }
    }

    #[test]
    fn test_upsert_and_find() {
        let conn = open_in_memory().unwrap();
        upsert(&conn, &row("a", 10, 1)).unwrap();
        let found = find(&conn, "a").unwrap().unwrap();
        assert_eq!(found.size, 10);
    }

    #[test]
    fn test_total_size_sums_all_entries() {
        let conn = open_in_memory().unwrap();
        upsert(&conn, &row("a", 10, 1)).unwrap();
        upsert(&conn, &row("b", 20, 2)).unwrap();
        assert_eq!(total_size(&conn).unwrap(), 30);
    }

    #[test]
    fn test_all_by_last_accessed_is_ascending() {
        let conn = open_in_memory().unwrap();
        upsert(&conn, &row("a", 1, 5)).unwrap();
        upsert(&conn, &row("b", 1, 1)).unwrap();
        upsert(&conn, &row("c", 1, 3)).unwrap();
        let urls: Vec<String> = all_by_last_accessed(&conn).unwrap().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["b", "c", "a"]);
    }
}

//! SQLite persistence for P2P session records, so a session survives a
//! restart and the coordinator can route an inbound signal to the right
//! session id without re-negotiating from scratch.

use std::path::Path;
use std::str::FromStr;

use nostr_sdk::PublicKey;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::session::{Role, SessionRecord, SessionStatus};

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),
}

/// Open (or create) the sessions database and run its migration.
pub fn open_db(path: &Path) -> Result<Connection, SessionStoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS p2p_sessions (
            session_id          TEXT PRIMARY KEY,
            identity_pubkey     TEXT NOT NULL,
            contact_pubkey      TEXT NOT NULL,
            role                TEXT NOT NULL,
            status              TEXT NOT NULL,
            last_attempt_at     INTEGER,
            last_success_at     INTEGER,
            last_failure_reason TEXT,
            updated_at          INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_p2p_sessions_contact
            ON p2p_sessions(identity_pubkey, contact_pubkey);",
    )?;
    Ok(conn)
}

/// Open an in-memory database, for tests and for "P2P disabled" gating
/// where no durable state is needed.
pub fn open_in_memory() -> Result<Connection, SessionStoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS p2p_sessions (
            session_id          TEXT PRIMARY KEY,
            identity_pubkey     TEXT NOT NULL,
            contact_pubkey      TEXT NOT NULL,
            role                TEXT NOT NULL,
            status              TEXT NOT NULL,
            last_attempt_at     INTEGER,
            last_success_at     INTEGER,
            last_failure_reason TEXT,
            updated_at          INTEGER NOT NULL
        );",
    )?;
    Ok(conn)
}

pub fn upsert(conn: &Connection, record: &SessionRecord) -> Result<(), SessionStoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO p2p_sessions
            (session_id, identity_pubkey, contact_pubkey, role, status,
             last_attempt_at, last_success_at, last_failure_reason, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.session_id,
            record.identity_pubkey.to_hex(),
            record.contact_pubkey.to_hex(),
            record.role.as_str(),
            record.status.as_str(),
            record.last_attempt_at,
            record.last_success_at,
            record.last_failure_reason,
            record.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
    let row = conn
        .query_row(
            "SELECT session_id, identity_pubkey, contact_pubkey, role, status,
                    last_attempt_at, last_success_at, last_failure_reason, updated_at
             FROM p2p_sessions WHERE session_id = ?1",
            params![session_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<u64>>(5)?,
                    row.get::<_, Option<u64>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, u64>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((session_id, identity_pubkey, contact_pubkey, role, status, last_attempt_at, last_success_at, last_failure_reason, updated_at)) = row else {
        return Ok(None);
    };

    let identity_pubkey = PublicKey::from_str(&identity_pubkey)
        .map_err(|_| SessionStoreError::CorruptRecord("identity_pubkey".into()))?;
    let contact_pubkey = PublicKey::from_str(&contact_pubkey)
        .map_err(|_| SessionStoreError::CorruptRecord("contact_pubkey".into()))?;
    let role = Role::parse(&role).ok_or_else(|| SessionStoreError::CorruptRecord("role".into()))?;
    let status = SessionStatus::parse(&status).ok_or_else(|| SessionStoreError::CorruptRecord("status".into()))?;

    Ok(Some(SessionRecord {
        session_id,
        identity_pubkey,
        contact_pubkey,
        role,
        status,
        last_attempt_at,
        last_success_at,
        last_failure_reason,
        updated_at,
    }))
}

pub fn delete(conn: &Connection, session_id: &str) -> Result<(), SessionStoreError> {
    conn.execute("DELETE FROM p2p_sessions WHERE session_id = ?1", params![session_id])?;
    Ok(())
}

//! Per-session state: role, status, and the persisted record shape.
//!
//! ```text
//! idle -> initiating -> offered (offerer) | received (answerer)
//!                    -> answered -> ice-exchange -> connected | failed
//! ```
//! `failed` and `connected` are both terminal for a session; a fresh link
//! attempt after loss starts a new session rather than reviving this one.

use std::time::{SystemTime, UNIX_EPOCH};

use nostr_sdk::PublicKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Offerer => "offerer",
            Role::Answerer => "answerer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offerer" => Some(Role::Offerer),
            "answerer" => Some(Role::Answerer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Initiating,
    Offered,
    Received,
    Answered,
    IceExchange,
    Connected,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Initiating => "initiating",
            SessionStatus::Offered => "offered",
            SessionStatus::Received => "received",
            SessionStatus::Answered => "answered",
            SessionStatus::IceExchange => "ice-exchange",
            SessionStatus::Connected => "connected",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "idle" => SessionStatus::Idle,
            "initiating" => SessionStatus::Initiating,
            "offered" => SessionStatus::Offered,
            "received" => SessionStatus::Received,
            "answered" => SessionStatus::Answered,
            "ice-exchange" => SessionStatus::IceExchange,
            "connected" => SessionStatus::Connected,
            "failed" => SessionStatus::Failed,
            _ => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Connected | SessionStatus::Failed)
    }
}

/// A persisted P2P session record, keyed by `(identity_pubkey, contact_pubkey, session_id)`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub identity_pubkey: PublicKey,
    pub contact_pubkey: PublicKey,
    pub role: Role,
    pub status: SessionStatus,
    pub last_attempt_at: Option<u64>,
    pub last_success_at: Option<u64>,
    pub last_failure_reason: Option<String>,
    pub updated_at: u64,
}

impl SessionRecord {
    pub fn new_offerer(identity_pubkey: PublicKey, contact_pubkey: PublicKey) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        Self {
            session_id,
            identity_pubkey,
            contact_pubkey,
            role: Role::Offerer,
            status: SessionStatus::Initiating,
            last_attempt_at: Some(now),
            last_success_at: None,
            last_failure_reason: None,
            updated_at: now,
        }
    }

    pub fn new_answerer(session_id: String, identity_pubkey: PublicKey, contact_pubkey: PublicKey) -> Self {
        let now = now_secs();
        Self {
            session_id,
            identity_pubkey,
            contact_pubkey,
            role: Role::Answerer,
            status: SessionStatus::Received,
            last_attempt_at: Some(now),
            last_success_at: None,
            last_failure_reason: None,
            updated_at: now,
        }
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

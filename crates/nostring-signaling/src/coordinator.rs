//! Drives the P2P session state machine: routes gift-wrapped signals to and
//! from the relay pool, and issues commands to the WebRTC engine, which is
//! an external collaborator the coordinator never constructs itself (spec
//! §4.5 calls it out explicitly as such).

use std::path::Path;
use std::sync::Arc;

use nostr_sdk::{Event, Kind, PublicKey};
use nostring_core::nip17::{unwrap_signal, wrap_signal, LocalSignal, SignalEnvelope};
use nostring_core::Keypair;
use nostring_relay::RelayPool;
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::session::{now_secs, Role, SessionRecord, SessionStatus};
use crate::store::{self, SessionStoreError};

#[derive(Error, Debug)]
pub enum SignalingError {
    #[error("identity secret is unavailable")]
    MissingIdentity,
    #[error("session store error: {0}")]
    Store(#[from] SessionStoreError),
    #[error("gift-wrap construction failed: {0}")]
    GiftWrap(#[from] nostring_core::nip17::GiftWrapError),
}

/// Result of an `attempt()` call.
#[derive(Debug, Clone)]
pub enum AttemptResult {
    Started { session_id: String },
    /// P2P is gated off globally; no transport was touched.
    Unavailable,
}

/// A command the coordinator issues to the external WebRTC engine.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Create a peer connection for `session_id` in the given role.
    Initiate { session_id: String, contact_pubkey: PublicKey, role: Role },
    /// Apply an inbound signal (offer/answer/ICE) to an existing connection.
    ApplySignal { session_id: String, signal: LocalSignal },
    /// Tear down the peer connection for `session_id`.
    Close { session_id: String },
}

/// Status reported back by the engine for a session.
#[derive(Debug, Clone)]
pub enum EngineStatus {
    Connected,
    Failed { reason: String },
}

type EngineCallback = Arc<dyn Fn(EngineCommand) + Send + Sync>;

/// Coordinates WebRTC signaling for one Nostr identity.
pub struct Coordinator {
    identity: Keypair,
    relay: Arc<RelayPool>,
    conn: Mutex<Connection>,
    on_engine_command: Mutex<Option<EngineCallback>>,
    p2p_enabled: bool,
}

impl Coordinator {
    pub fn new(identity: Keypair, relay: Arc<RelayPool>, db_path: &Path, p2p_enabled: bool) -> Result<Self, SignalingError> {
        let conn = store::open_db(db_path)?;
        Ok(Self {
            identity,
            relay,
            conn: Mutex::new(conn),
            on_engine_command: Mutex::new(None),
            p2p_enabled,
        })
    }

    pub fn new_in_memory(identity: Keypair, relay: Arc<RelayPool>, p2p_enabled: bool) -> Result<Self, SignalingError> {
        let conn = store::open_in_memory()?;
        Ok(Self {
            identity,
            relay,
            conn: Mutex::new(conn),
            on_engine_command: Mutex::new(None),
            p2p_enabled,
        })
    }

    /// Register the callback invoked whenever the coordinator has a command
    /// for the WebRTC engine.
    pub async fn set_engine_handler<F>(&self, f: F)
    where
        F: Fn(EngineCommand) + Send + Sync + 'static,
    {
        *self.on_engine_command.lock().await = Some(Arc::new(f));
    }

    async fn emit(&self, cmd: EngineCommand) {
        if let Some(cb) = self.on_engine_command.lock().await.as_ref() {
            cb(cmd);
        }
    }

    /// Start a new outbound session to `contact_pubkey`. When P2P is gated
    /// off, returns `Unavailable` without creating a session or touching
    /// the relay pool (spec §4.5 gating).
    pub async fn attempt(&self, contact_pubkey: PublicKey) -> Result<AttemptResult, SignalingError> {
        if !self.p2p_enabled {
            log::info!("p2p disabled, attempt to {} is unavailable", contact_pubkey.to_hex());
            return Ok(AttemptResult::Unavailable);
        }

        let record = SessionRecord::new_offerer(self.identity.public_key(), contact_pubkey);
        let session_id = record.session_id.clone();
        {
            let conn = self.conn.lock().await;
            store::upsert(&conn, &record)?;
        }
        log::info!("p2p session {session_id} initiating as offerer to {}", contact_pubkey.to_hex());
        self.emit(EngineCommand::Initiate { session_id: session_id.clone(), contact_pubkey, role: Role::Offerer }).await;
        Ok(AttemptResult::Started { session_id })
    }

    /// Route an inbound gift-wrapped event. Returns `true` if it was a
    /// signal this coordinator consumed, `false` if it wasn't addressed to
    /// this identity, wasn't a signal payload, or P2P is gated off (in
    /// which case it is dropped silently per spec §4.5).
    pub async fn handle_inbound_event(&self, event: &Event) -> Result<bool, SignalingError> {
        if !self.p2p_enabled {
            return Ok(false);
        }
        if event.kind != Kind::GiftWrap {
            return Ok(false);
        }
        let Some((sender, SignalEnvelope { session_id, signal })) = unwrap_signal(event, &self.identity) else {
            return Ok(false);
        };

        let existing = {
            let conn = self.conn.lock().await;
            store::find(&conn, &session_id)?
        };

        match existing {
            Some(mut record) => {
                record.status = next_status_on_signal(record.status, &signal);
                record.updated_at = now_secs();
                {
                    let conn = self.conn.lock().await;
                    store::upsert(&conn, &record)?;
                }
                self.emit(EngineCommand::ApplySignal { session_id, signal }).await;
            }
            None => {
                if !matches!(signal, LocalSignal::Offer(_)) {
                    log::warn!("signal for unknown session, dropping: not an offer");
                    return Ok(true);
                }
                let record = SessionRecord::new_answerer(session_id.clone(), self.identity.public_key(), sender);
                {
                    let conn = self.conn.lock().await;
                    store::upsert(&conn, &record)?;
                }
                log::info!("p2p session {session_id} received as answerer from {}", sender.to_hex());
                self.emit(EngineCommand::Initiate { session_id: session_id.clone(), contact_pubkey: sender, role: Role::Answerer }).await;
                self.emit(EngineCommand::ApplySignal { session_id, signal }).await;
            }
        }
        Ok(true)
    }

    /// The engine has a local SDP/ICE payload ready to send to the peer.
    /// Publishes it via the relay pool using this identity's key.
    pub async fn on_local_signal_ready(&self, session_id: &str, signal: LocalSignal) -> Result<(), SignalingError> {
        let record = {
            let conn = self.conn.lock().await;
            store::find(&conn, session_id)?
        };
        let Some(mut record) = record else {
            log::warn!("local signal ready for unknown session {session_id}, dropping");
            return Ok(());
        };

        record.status = next_status_on_local_signal(record.status, &signal);
        record.updated_at = now_secs();
        {
            let conn = self.conn.lock().await;
            store::upsert(&conn, &record)?;
        }

        let event = wrap_signal(session_id, &signal, &self.identity, &record.contact_pubkey)?;
        let outcomes = self.relay.publish(event).await;
        if outcomes.iter().all(|o| !o.ok) {
            log::warn!("session {session_id} signal did not reach any relay yet; relay pool will retry via reconnection");
        }
        Ok(())
    }

    /// The engine reports a connection status change for `session_id`.
    pub async fn on_status_change(&self, session_id: &str, status: EngineStatus) -> Result<(), SignalingError> {
        let record = {
            let conn = self.conn.lock().await;
            store::find(&conn, session_id)?
        };
        let Some(mut record) = record else {
            return Ok(());
        };

        match status {
            EngineStatus::Connected => {
                record.status = SessionStatus::Connected;
                record.last_success_at = Some(now_secs());
                log::info!("p2p session {session_id} connected");
            }
            EngineStatus::Failed { reason } => {
                record.status = SessionStatus::Failed;
                record.last_failure_reason = Some(reason.clone());
                log::warn!("p2p session {session_id} failed: {reason}");
            }
        }
        record.updated_at = now_secs();
        let conn = self.conn.lock().await;
        store::upsert(&conn, &record)?;
        Ok(())
    }

    /// Tear down `session_id`: tells the engine to close and marks the
    /// session `failed, reason=user`. Idempotent -- closing an already
    /// closed or unknown session is a no-op beyond the engine command.
    pub async fn close(&self, session_id: &str) -> Result<(), SignalingError> {
        let record = {
            let conn = self.conn.lock().await;
            store::find(&conn, session_id)?
        };
        if let Some(mut record) = record {
            if !record.status.is_terminal() {
                record.status = SessionStatus::Failed;
                record.last_failure_reason = Some("user".to_string());
                record.updated_at = now_secs();
                let conn = self.conn.lock().await;
                store::upsert(&conn, &record)?;
            }
        }
        self.emit(EngineCommand::Close { session_id: session_id.to_string() }).await;
        Ok(())
    }

    /// Look up a session's current record, e.g. for a UI status display.
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, SignalingError> {
        let conn = self.conn.lock().await;
        Ok(store::find(&conn, session_id)?)
    }
}

fn next_status_on_signal(current: SessionStatus, signal: &LocalSignal) -> SessionStatus {
    match (current, signal) {
        // Offerer receives the answerer's Answer after having sent its Offer.
        (SessionStatus::Offered, LocalSignal::Answer(_)) => SessionStatus::Answered,
        (SessionStatus::Answered, LocalSignal::IceCandidate { .. }) => SessionStatus::IceExchange,
        (SessionStatus::IceExchange, LocalSignal::IceCandidate { .. }) => SessionStatus::IceExchange,
        (other, _) => other,
    }
}

fn next_status_on_local_signal(current: SessionStatus, signal: &LocalSignal) -> SessionStatus {
    match (current, signal) {
        (SessionStatus::Initiating, LocalSignal::Offer(_)) => SessionStatus::Offered,
        (SessionStatus::Received, LocalSignal::Answer(_)) => SessionStatus::Answered,
        (other, LocalSignal::IceCandidate { .. }) => {
            if other == SessionStatus::Answered || other == SessionStatus::Offered {
                SessionStatus::IceExchange
            } else {
                other
            }
        }
        (other, _) => other,
    }
}

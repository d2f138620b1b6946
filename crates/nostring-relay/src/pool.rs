//! The relay pool: one connection task per endpoint, a publish API with
//! per-relay results, and filter subscriptions multiplexed across
//! endpoints.
//!
//! `nostr_sdk::Client` hides exactly the granular connection-state and
//! back-off control this pool needs to expose (spec §4.4), so the wire
//! transport here is a direct `tokio-tungstenite` WebSocket, carrying
//! `nostr_sdk`'s own `ClientMessage`/`RelayMessage`/`Event`/`Filter` wire
//! types -- the teacher's daemon-loop idiom (`log::info!`/`log::warn!`,
//! `anyhow`-free internal errors) for the connection loop, nostr-sdk's own
//! types for everything that touches the wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nostr_sdk::{ClientMessage, Event, Filter, RelayMessage, SubscriptionId};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::state::{backoff_delay, normalize_url, RelayState};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MONITOR_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub relay_url: String,
    pub ok: bool,
    pub reason: Option<String>,
}

type PendingAcks = Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), String>>>>>;
type EventCallback = Arc<dyn Fn(String, Event) + Send + Sync>;

struct Endpoint {
    url: String,
    desired_connected: Arc<AtomicBool>,
    state: Arc<Mutex<RelayState>>,
    outbound: mpsc::UnboundedSender<WsMessage>,
    pending_acks: PendingAcks,
    active_subs: Arc<Mutex<HashMap<String, Filter>>>,
}

/// A multi-relay pool. Each endpoint runs its own connect/monitor/reconnect
/// task; the pool itself only routes publish/subscribe calls to whichever
/// endpoints are currently connected.
pub struct RelayPool {
    endpoints: Arc<Mutex<HashMap<String, Endpoint>>>,
    on_event: Arc<Mutex<Option<EventCallback>>>,
}

impl Default for RelayPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPool {
    pub fn new() -> Self {
        Self { endpoints: Arc::new(Mutex::new(HashMap::new())), on_event: Arc::new(Mutex::new(None)) }
    }

    /// Register a callback invoked for every event received on any
    /// subscription, on any relay. The relay url and subscription id are
    /// included so the caller can do its own per-relay dedup (spec §4.4).
    pub async fn set_event_handler<F>(&self, f: F)
    where
        F: Fn(String, Event) + Send + Sync + 'static,
    {
        *self.on_event.lock().await = Some(Arc::new(f));
    }

    /// Add a relay and start its connection task. Idempotent: adding an
    /// already-known (normalized) url is a no-op.
    pub async fn add_relay(&self, url: &str) {
        let normalized = normalize_url(url);
        let mut endpoints = self.endpoints.lock().await;
        if endpoints.contains_key(&normalized) {
            return;
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let desired_connected = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(RelayState::Disconnected));
        let pending_acks: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let active_subs = Arc::new(Mutex::new(HashMap::new()));

        let endpoint = Endpoint {
            url: normalized.clone(),
            desired_connected: desired_connected.clone(),
            state: state.clone(),
            outbound: outbound_tx,
            pending_acks: pending_acks.clone(),
            active_subs: active_subs.clone(),
        };
        endpoints.insert(normalized.clone(), endpoint);
        drop(endpoints);

        let on_event = self.on_event.clone();
        tokio::spawn(connection_task(
            normalized,
            desired_connected,
            state,
            outbound_rx,
            pending_acks,
            active_subs,
            on_event,
        ));
    }

    /// Tear down every endpoint: mark `closed`, cancel back-off, drop
    /// sockets. Idempotent.
    pub async fn disconnect(&self) {
        let endpoints = self.endpoints.lock().await;
        for endpoint in endpoints.values() {
            endpoint.desired_connected.store(false, Ordering::SeqCst);
            *endpoint.state.lock().await = RelayState::Closed;
            // Nudge a blocked connection task: a closing frame makes the
            // write half notice `desired_connected` on its next poll even
            // with no other traffic in flight.
            let _ = endpoint.outbound.send(WsMessage::Close(None));
        }
    }

    /// Current observed state of every known endpoint, keyed by normalized url.
    pub async fn status(&self) -> HashMap<String, RelayState> {
        let endpoints = self.endpoints.lock().await;
        let mut out = HashMap::new();
        for (url, endpoint) in endpoints.iter() {
            out.insert(url.clone(), endpoint.state.lock().await.clone());
        }
        out
    }

    /// Publish `event` to every currently-connected relay. Reports a result
    /// for every relay, connected or not -- the pool never silently drops a
    /// relay from the result set.
    pub async fn publish(&self, event: Event) -> Vec<PublishOutcome> {
        let endpoints = self.endpoints.lock().await;
        let mut outcomes = Vec::with_capacity(endpoints.len());
        let msg = ClientMessage::event(event.clone()).as_json();

        for endpoint in endpoints.values() {
            let connected = matches!(*endpoint.state.lock().await, RelayState::Connected);
            if !connected {
                outcomes.push(PublishOutcome {
                    relay_url: endpoint.url.clone(),
                    ok: false,
                    reason: Some("not connected".to_string()),
                });
                continue;
            }

            let (tx, rx) = oneshot::channel();
            endpoint.pending_acks.lock().await.insert(event.id.to_hex(), tx);

            if endpoint.outbound.send(WsMessage::Text(msg.clone())).is_err() {
                outcomes.push(PublishOutcome {
                    relay_url: endpoint.url.clone(),
                    ok: false,
                    reason: Some("disconnected".to_string()),
                });
                continue;
            }

            match tokio::time::timeout(CONNECT_TIMEOUT, rx).await {
                Ok(Ok(Ok(()))) => outcomes.push(PublishOutcome { relay_url: endpoint.url.clone(), ok: true, reason: None }),
                Ok(Ok(Err(reason))) => outcomes.push(PublishOutcome { relay_url: endpoint.url.clone(), ok: false, reason: Some(reason) }),
                Ok(Err(_)) => outcomes.push(PublishOutcome { relay_url: endpoint.url.clone(), ok: false, reason: Some("disconnected".to_string()) }),
                Err(_) => outcomes.push(PublishOutcome { relay_url: endpoint.url.clone(), ok: false, reason: Some("timeout".to_string()) }),
            }
        }

        outcomes
    }

    /// Open a subscription for `filters` on every currently-connected relay.
    /// Events are delivered to the pool-wide event handler (set via
    /// `set_event_handler`), tagged with the relay url they arrived from;
    /// the caller is responsible for cross-relay dedup by event id.
    pub async fn subscribe(&self, filters: Vec<Filter>) -> SubscriptionHandle {
        let sub_id = SubscriptionId::generate();
        let endpoints = self.endpoints.lock().await;
        let msg = ClientMessage::req(sub_id.clone(), filters.clone()).as_json();

        for endpoint in endpoints.values() {
            if matches!(*endpoint.state.lock().await, RelayState::Connected) {
                let _ = endpoint.outbound.send(WsMessage::Text(msg.clone()));
            }
            for filter in &filters {
                endpoint.active_subs.lock().await.insert(sub_id.to_string(), filter.clone());
            }
        }

        SubscriptionHandle {
            id: sub_id,
            endpoints: self.endpoints.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// A live subscription. `close()` is safe to call more than once.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    endpoints: Arc<Mutex<HashMap<String, Endpoint>>>,
    closed: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let msg = ClientMessage::close(self.id.clone()).as_json();
        let endpoints = self.endpoints.lock().await;
        for endpoint in endpoints.values() {
            let _ = endpoint.outbound.send(WsMessage::Text(msg.clone()));
            endpoint.active_subs.lock().await.remove(&self.id.to_string());
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn connection_task(
    url: String,
    desired_connected: Arc<AtomicBool>,
    state: Arc<Mutex<RelayState>>,
    mut outbound_rx: mpsc::UnboundedReceiver<WsMessage>,
    pending_acks: PendingAcks,
    active_subs: Arc<Mutex<HashMap<String, Filter>>>,
    on_event: Arc<Mutex<Option<EventCallback>>>,
) {
    let mut attempt: u32 = 0;

    while desired_connected.load(Ordering::SeqCst) {
        *state.lock().await = RelayState::Connecting;
        log::info!("connecting to relay {url}");

        let connect_result = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(&url)).await;

        let ws_stream = match connect_result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                log::warn!("relay {url} connect failed: {e}");
                attempt += 1;
                enter_backoff(&state, &desired_connected, attempt).await;
                continue;
            }
            Err(_) => {
                log::warn!("relay {url} connect timed out after {CONNECT_TIMEOUT:?}");
                attempt += 1;
                enter_backoff(&state, &desired_connected, attempt).await;
                continue;
            }
        };

        log::info!("relay {url} connected");
        *state.lock().await = RelayState::Connected;
        attempt = 0;

        let (mut write, mut read) = ws_stream.split();

        // Re-issue any subscriptions that were active before this (re)connect.
        for (sub_id, filter) in active_subs.lock().await.iter() {
            let msg = ClientMessage::req(SubscriptionId::new(sub_id), vec![filter.clone()]).as_json();
            if write.send(WsMessage::Text(msg)).await.is_err() {
                log::warn!("relay {url} failed to re-issue subscription {sub_id} after reconnect");
            }
        }

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(msg) => {
                            if write.send(msg).await.is_err() {
                                log::warn!("relay {url} write failed, reconnecting");
                                break;
                            }
                        }
                        None => {
                            // Pool dropped; nothing more to send, still keep reading
                            // until the socket itself closes.
                        }
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            handle_incoming(&url, &text, &pending_acks, &on_event).await;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            log::warn!("relay {url} closed by peer");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::warn!("relay {url} read error: {e}");
                            break;
                        }
                    }
                }
            }

            if !desired_connected.load(Ordering::SeqCst) {
                break;
            }
        }

        fail_all_pending(&pending_acks, "disconnected").await;

        if !desired_connected.load(Ordering::SeqCst) {
            *state.lock().await = RelayState::Closed;
            return;
        }

        attempt += 1;
        enter_backoff(&state, &desired_connected, attempt).await;
    }

    *state.lock().await = RelayState::Closed;
}

/// Sleep out the back-off delay for `attempt`, checking every tick of
/// `MONITOR_INTERVAL` whether `disconnect()` has cancelled the endpoint so a
/// long back-off doesn't outlive the caller's desire to stay connected.
async fn enter_backoff(state: &Arc<Mutex<RelayState>>, desired_connected: &Arc<AtomicBool>, attempt: u32) {
    let mut remaining = backoff_delay(attempt);
    *state.lock().await = RelayState::Backoff { attempt };
    while remaining > Duration::ZERO && desired_connected.load(Ordering::SeqCst) {
        let tick = remaining.min(MONITOR_INTERVAL);
        tokio::time::sleep(tick).await;
        remaining = remaining.saturating_sub(tick);
    }
}

async fn handle_incoming(url: &str, text: &str, pending_acks: &PendingAcks, on_event: &Arc<Mutex<Option<EventCallback>>>) {
    let parsed = match RelayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("relay {url} sent unparseable message: {e}");
            return;
        }
    };

    match parsed {
        RelayMessage::Ok { event_id, status, message } => {
            if let Some(tx) = pending_acks.lock().await.remove(&event_id.to_hex()) {
                let result = if status { Ok(()) } else { Err(message) };
                let _ = tx.send(result);
            }
        }
        RelayMessage::Event { event, .. } => {
            if let Some(cb) = on_event.lock().await.as_ref() {
                cb(url.to_string(), *event);
            }
        }
        RelayMessage::Notice(notice) => {
            log::debug!("relay {url} notice: {notice}");
        }
        _ => {}
    }
}

async fn fail_all_pending(pending_acks: &PendingAcks, reason: &str) {
    let mut acks = pending_acks.lock().await;
    for (_, tx) in acks.drain() {
        let _ = tx.send(Err(reason.to_string()));
    }
}

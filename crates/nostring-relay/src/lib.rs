//! Multi-relay WebSocket pool: per-endpoint connection state machine,
//! exponential back-off reconnection, publish with per-relay results, and
//! filter subscriptions multiplexed across every connected relay.

pub mod pool;
pub mod state;

pub use pool::{PublishOutcome, RelayPool, SubscriptionHandle};
pub use state::{backoff_delay, normalize_url, RelayState};

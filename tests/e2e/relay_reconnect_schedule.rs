//! Scenario 3 (spec §8): a relay endpoint that cannot be reached cycles
//! through back-off attempts at 1, 2, 4, 8, 16, then 30s forever. Uses
//! `tokio::time::pause` so the real `RelayPool` connection-attempt loop is
//! exercised without the test taking over a minute of wall clock.

use nostring_relay::{RelayPool, RelayState};
use std::time::Duration;

#[tokio::test]
async fn relay_reconnect_follows_backoff_schedule() {
    // Bind then immediately drop: nothing is listening on this port, so
    // every connection attempt fails fast with "connection refused" rather
    // than hanging until `CONNECT_TIMEOUT`.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    tokio::time::pause();

    let pool = RelayPool::new();
    let url = format!("ws://127.0.0.1:{port}/");
    pool.add_relay(&url).await;

    let expected_secs = [1u64, 2, 4, 8, 16, 30, 30];
    for (i, secs) in expected_secs.iter().enumerate() {
        let attempt = (i + 1) as u32;
        wait_for_backoff(&pool, &url, attempt).await;
        tokio::time::advance(Duration::from_secs(*secs)).await;
    }
}

/// Poll `pool.status()` until `url` reports `Backoff { attempt }`, yielding
/// between checks so the connection task's spawned future gets to run.
async fn wait_for_backoff(pool: &RelayPool, url: &str, attempt: u32) {
    for _ in 0..10_000 {
        let status = pool.status().await;
        if let Some(RelayState::Backoff { attempt: a }) = status.get(url) {
            if *a == attempt {
                return;
            }
        }
        tokio::task::yield_now().await;
    }
    panic!("relay {url} never reached back-off attempt {attempt}");
}

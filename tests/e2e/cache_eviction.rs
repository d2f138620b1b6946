//! Scenario 4 (spec §8): with a 200-byte cap, caching A (100 bytes), then B
//! (100 bytes), then C (100 bytes) evicts the least-recently-accessed entry
//! (A) to stay within budget, leaving {B, C}.

use nostring_cache::ImageCache;

#[tokio::test]
async fn cache_eviction_drops_oldest_to_fit_budget() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ImageCache::initialize(dir.path().join("cache"), 200).await.unwrap();

    cache.cache("https://example.com/a.png", &[0u8; 100]).await.unwrap();
    cache.cache("https://example.com/b.png", &[0u8; 100]).await.unwrap();
    cache.cache("https://example.com/c.png", &[0u8; 100]).await.unwrap();

    let stats = cache.stats().await;
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.total_size, 200);

    assert!(cache.get("https://example.com/a.png").await.unwrap().is_none());
    assert!(cache.get("https://example.com/b.png").await.unwrap().is_some());
    assert!(cache.get("https://example.com/c.png").await.unwrap().is_some());

    assert!(!cache.invalidate("https://example.com/a.png").await.unwrap());
}

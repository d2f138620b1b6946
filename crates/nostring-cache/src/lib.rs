//! Image cache (C6): SHA-256 content-addressed disk storage with SQLite
//! metadata, LRU eviction, and mutex-serialized mutating operations.

pub mod addressing;
pub mod cache;
pub mod store;

pub use addressing::{content_key, extension_for, file_path};
pub use cache::{CacheError, CacheStats, CachedImage, ImageCache};

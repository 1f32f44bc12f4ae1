mod filesystem;

pub use filesystem::FilesystemCache;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),
}

/// Key-value store for rendered sitemap documents.
/// Entries are opaque strings; a later `set` on the same key replaces the entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// A zero `ttl` keeps the entry until it is deleted.
    async fn set(&self, key: &str, content: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Drop every entry. Returns how many were removed.
    async fn flush_all(&self) -> Result<u64, CacheError>;
}

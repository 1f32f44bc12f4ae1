use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ring::digest;

use super::{CacheError, CacheStore};

const ENTRY_EXTENSION: &str = "cache";

/// Filesystem cache: one file per key, named after a digest of the key.
///
/// The first line of each file holds the expiry as a unix timestamp (`0` for
/// no expiry); the rest is the cached content. Entries are written to a
/// temporary file and renamed into place, so a reader sees either the old entry
/// or the new one, never a torn write.
pub struct FilesystemCache {
    base_path: PathBuf,
}

impl FilesystemCache {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = digest::digest(&digest::SHA256, key.as_bytes());
        let name = URL_SAFE_NO_PAD.encode(hash.as_ref());
        self.base_path.join(format!("{name}.{ENTRY_EXTENSION}"))
    }
}

#[async_trait]
impl CacheStore for FilesystemCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (header, content) = raw
            .split_once('\n')
            .ok_or_else(|| CacheError::Corrupt(key.to_string()))?;
        let expires_at: i64 = header
            .trim()
            .parse()
            .map_err(|_| CacheError::Corrupt(key.to_string()))?;

        if expires_at != 0 && expires_at <= Utc::now().timestamp() {
            tracing::debug!(key, "Cache entry expired");
            return Ok(None);
        }

        Ok(Some(content.to_string()))
    }

    async fn set(&self, key: &str, content: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = if ttl.is_zero() {
            0
        } else {
            Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2)
        };

        let path = self.entry_path(key);
        let tmp_path = self
            .base_path
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let mut data = String::with_capacity(content.len() + 24);
        data.push_str(&expires_at.to_string());
        data.push('\n');
        data.push_str(content);

        let written = match tokio::fs::write(&tmp_path, data.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // A partial write may have created the file
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn flush_all(&self) -> Result<u64, CacheError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

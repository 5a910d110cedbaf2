//! In-process TTL cache
//!
//! Provides:
//! - Generic get/set operations with TTL
//! - Key builders for namespacing
//!
//! Values are stored as JSON so any serde type can be cached. The cache lives
//! for the process lifetime; a restart only loses the speed-up.

use crate::config::CacheConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    expires_at: Instant,
    value: serde_json::Value,
}

/// TTL-bounded key/value cache
pub struct Cache {
    entries: RwLock<HashMap<String, Entry>>,
    config: CacheConfig,
    name: &'static str,
}

impl Cache {
    /// Create a cache whose hit/miss metrics carry `name`
    pub fn named(name: &'static str, config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            name,
        }
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Get a live value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let full_key = self.key(key);
        let value = {
            let entries = self.entries.read().await;
            entries
                .get(&full_key)
                .filter(|entry| entry.expires_at > Instant::now())
                .map(|entry| entry.value.clone())
        };

        match value {
            Some(json) => {
                let parsed = serde_json::from_value(json).map_err(|e| AppError::Internal {
                    message: format!("Failed to parse cached value: {}", e),
                })?;
                debug!(key = %full_key, "Cache hit");
                metrics::record_cache(true, self.name);
                Ok(Some(parsed))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                metrics::record_cache(false, self.name);
                Ok(None)
            }
        }
    }

    /// Set a value in cache with default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.config.ttl_secs).await
    }

    /// Set a value in cache with custom TTL
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let full_key = self.key(key);
        let json = serde_json::to_value(value)?;
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            full_key.clone(),
            Entry {
                expires_at: now + Duration::from_secs(ttl_secs),
                value: json,
            },
        );

        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    /// Number of stored entries, expired ones included until the next write
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cache key builder helpers
pub mod keys {
    use sha2::{Digest, Sha256};

    /// Hex SHA-256 of raw bytes
    pub fn content_hash(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Build an uploaded-document cache key
    pub fn document(bytes: &[u8]) -> String {
        format!("document:{}", content_hash(bytes))
    }
}

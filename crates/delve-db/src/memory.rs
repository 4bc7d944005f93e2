//! In-process storage backend.
//!
//! [`MemoryBackend`] keeps documents in a map behind an async lock. It backs
//! local development and every test in the workspace, and can be told to
//! fail or stall so retry and deadline behavior can be exercised without a
//! live `Dragonfly` instance.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// In-memory [`StorageBackend`] with failure injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: RwLock<BTreeMap<String, serde_json::Value>>,
    write_counts: RwLock<BTreeMap<String, u64>>,
    failing_keys: RwLock<BTreeSet<String>>,
    pending_failures: AtomicU32,
    unavailable: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations fail with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Make every operation fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every operation on `key` fail until switched back.
    pub async fn set_key_unavailable(&self, key: &str, unavailable: bool) {
        let mut keys = self.failing_keys.write().await;
        if unavailable {
            keys.insert(key.to_owned());
        } else {
            keys.remove(key);
        }
    }

    /// Stall every write for `delay` before applying it.
    pub fn set_write_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of successful writes to `key`.
    pub async fn write_count(&self, key: &str) -> u64 {
        self.write_counts.read().await.get(key).copied().unwrap_or(0)
    }

    /// Current document at `key`, bypassing failure injection.
    pub async fn peek(&self, key: &str) -> Option<serde_json::Value> {
        self.documents.read().await.get(key).cloned()
    }

    /// Store a document directly, bypassing failure injection and counters.
    pub async fn seed(&self, key: &str, value: serde_json::Value) {
        self.documents.write().await.insert(key.to_owned(), value);
    }

    async fn injected_failure(&self, op: &str, key: &str) -> Result<(), StorageError> {
        let key_down = self.failing_keys.read().await.contains(key);
        if key_down || self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Transient(format!("{op} {key}: backend unavailable")));
        }
        let took = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if took.is_ok() {
            return Err(StorageError::Transient(format!("{op} {key}: injected failure")));
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        self.injected_failure("get", key).await?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        self.injected_failure("set", key).await?;
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.documents
            .write()
            .await
            .insert(key.to_owned(), value.clone());
        let mut counts = self.write_counts.write().await;
        let count = counts.entry(key.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.injected_failure("remove", key).await?;
        self.documents.write().await.remove(key);
        Ok(())
    }
}

//! The key-value storage seam.
//!
//! A [`StorageBackend`] stores one JSON document per key. Backends may be
//! eventually consistent and may fail transiently; callers wrap every call
//! in a [`RetryBudget`](crate::retry::RetryBudget).

use std::future::Future;
use std::sync::Arc;

use crate::error::StorageError;

/// Durable key-value store holding JSON documents.
pub trait StorageBackend: Send + Sync + 'static {
    /// Read the document at `key`, or `None` if the key is absent.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, StorageError>> + Send;

    /// Write `value` at `key`, replacing any previous document.
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete the document at `key`. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<B: StorageBackend> StorageBackend for Arc<B> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, StorageError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).remove(key)
    }
}

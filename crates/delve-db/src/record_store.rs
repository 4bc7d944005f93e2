//! Load and save of whole player records.
//!
//! [`RecordStore`] is the only component that touches a
//! [`StorageBackend`] directly. Each player maps to a single key and each
//! save writes the full record in one `set`, so a concurrent reader sees
//! either the previous record or the new one, never a mix.
//!
//! # Key Schema
//!
//! `{prefix}:{player_id}:record`

use delve_types::{CURRENT_SCHEMA_VERSION, PlayerId, PlayerRecord};

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::migration::{self, Migrated};
use crate::retry::{RetryBudget, RetryPolicy, with_retry};

/// Default key prefix for player records.
pub const DEFAULT_KEY_PREFIX: &str = "delve:player";

/// Where a loaded record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
    /// No stored record existed; the record is schema defaults.
    Fresh,
    /// A stored record was read and migrated.
    Stored {
        /// Schema version the stored record was written with.
        from_version: u32,
        /// Fields repaired during migration.
        recovered_fields: Vec<String>,
    },
}

/// A record returned by [`RecordStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRecord {
    /// The record at the current schema version.
    pub record: PlayerRecord,
    /// Whether it was stored or freshly defaulted.
    pub origin: RecordOrigin,
}

/// Player record persistence over a [`StorageBackend`].
#[derive(Debug)]
pub struct RecordStore<B> {
    backend: B,
    key_prefix: String,
    policy: RetryPolicy,
}

impl<B: StorageBackend> RecordStore<B> {
    /// Create a store that retries each operation per `policy`.
    pub fn new(backend: B, key_prefix: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
            policy,
        }
    }

    /// The underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The attempt-count policy used by [`load`](Self::load) and friends.
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Storage key for `player_id`.
    pub fn key(&self, player_id: PlayerId) -> String {
        format!("{}:{player_id}:record", self.key_prefix)
    }

    /// Load and migrate the record for `player_id`.
    ///
    /// An absent record yields schema defaults with [`RecordOrigin::Fresh`].
    /// Transient failures are retried per the store's policy; once retries
    /// are exhausted the last error is returned.
    pub async fn load(&self, player_id: PlayerId) -> Result<LoadedRecord, StorageError> {
        let key = self.key(player_id);
        let raw = self.read(&key, self.policy.into()).await?;

        let Some(raw) = raw else {
            tracing::debug!(%player_id, "No stored record, using defaults");
            return Ok(LoadedRecord {
                record: PlayerRecord::default(),
                origin: RecordOrigin::Fresh,
            });
        };

        let Migrated {
            record,
            from_version,
            recovered_fields,
        } = migration::migrate(raw)?;

        tracing::debug!(%player_id, from_version, "Loaded stored record");
        Ok(LoadedRecord {
            record,
            origin: RecordOrigin::Stored {
                from_version,
                recovered_fields,
            },
        })
    }

    /// Whether a record is stored for `player_id`.
    pub async fn exists(&self, player_id: PlayerId) -> Result<bool, StorageError> {
        self.exists_within(player_id, self.policy.into()).await
    }

    /// Whether a record is stored for `player_id`, probing within `budget`.
    pub async fn exists_within(
        &self,
        player_id: PlayerId,
        budget: RetryBudget,
    ) -> Result<bool, StorageError> {
        let key = self.key(player_id);
        Ok(self.read(&key, budget).await?.is_some())
    }

    /// Write `record` for `player_id` within `budget`.
    ///
    /// The stored document always carries [`CURRENT_SCHEMA_VERSION`].
    pub async fn save(
        &self,
        player_id: PlayerId,
        record: &PlayerRecord,
        budget: RetryBudget,
    ) -> Result<(), StorageError> {
        let key = self.key(player_id);
        let mut value = serde_json::to_value(record)?;
        if let Some(doc) = value.as_object_mut() {
            doc.insert("version".to_owned(), CURRENT_SCHEMA_VERSION.into());
        }

        let backend = &self.backend;
        let key_ref = key.as_str();
        let value_ref = &value;
        with_retry(budget, "set", key_ref, move || backend.set(key_ref, value_ref)).await?;

        tracing::debug!(%player_id, "Saved record");
        Ok(())
    }

    /// Remove the stored record for `player_id`.
    pub async fn wipe(&self, player_id: PlayerId) -> Result<(), StorageError> {
        let key = self.key(player_id);
        let backend = &self.backend;
        let key_ref = key.as_str();
        with_retry(self.policy.into(), "remove", key_ref, move || backend.remove(key_ref)).await?;

        tracing::info!(%player_id, "Wiped stored record");
        Ok(())
    }

    async fn read(
        &self,
        key: &str,
        budget: RetryBudget,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let backend = &self.backend;
        with_retry(budget, "get", key, move || backend.get(key)).await
    }
}

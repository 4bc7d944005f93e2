//! `Dragonfly` (Redis-compatible) storage backend.
//!
//! Each player record is one JSON string value. Key patterns:
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{prefix}:{player_id}:record` | JSON | Full [`PlayerRecord`](delve_types::PlayerRecord) |

use fred::prelude::*;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyBackend {
    client: Client,
}

impl DragonflyBackend {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the URL cannot be parsed.
    /// Returns [`StorageError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let config = Config::from_url(url)
            .map_err(|e| StorageError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl StorageBackend for DragonflyBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let value: Option<String> = self.client.get(key).await?;
        match value {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }
}

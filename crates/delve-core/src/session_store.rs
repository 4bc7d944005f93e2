//! Live sessions keyed by player.
//!
//! A session is created on join and destroyed on leave; nothing else holds
//! per-player state. Each session sits behind its own async mutex, so the
//! autosave pass, the leave sequence, and gameplay handlers for the same
//! player are serialized while different players never contend.

use std::collections::BTreeMap;
use std::sync::Arc;

use delve_types::PlayerId;
use tokio::sync::{Mutex, RwLock};

use crate::error::GatewayError;
use crate::session::PlayerSession;

/// Shared handle to one player's session.
pub type SessionHandle = Arc<Mutex<PlayerSession>>;

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct PlayerSessionStore {
    sessions: RwLock<BTreeMap<PlayerId, SessionHandle>>,
}

impl PlayerSessionStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyJoined`] if the player already has one.
    pub async fn insert(&self, session: PlayerSession) -> Result<SessionHandle, GatewayError> {
        let player_id = session.player_id();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&player_id) {
            return Err(GatewayError::AlreadyJoined(player_id));
        }
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(player_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// The session for `player_id`, if live.
    pub async fn get(&self, player_id: PlayerId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&player_id).cloned()
    }

    /// Drop the session for `player_id`.
    pub async fn remove(&self, player_id: PlayerId) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&player_id)
    }

    /// Whether `player_id` has a live session.
    pub async fn contains(&self, player_id: PlayerId) -> bool {
        self.sessions.read().await.contains_key(&player_id)
    }

    /// Every live session, in player order.
    pub async fn handles(&self) -> Vec<(PlayerId, SessionHandle)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

//! Load/save orchestration for live player sessions.
//!
//! The [`PersistenceGateway`] is the only path between sessions and
//! storage. It owns the record store, the session registry, and the
//! process-wide shutdown flag.
//!
//! # Lifecycle
//!
//! ```text
//! join ----> load + migrate ----> PlayerSession (live truth)
//!              | (retries exhausted)
//!              +--> defaults, flagged "unsaved baseline"
//!
//! every autosave interval:  collect + save each live session
//! leave:                    collect + save once
//!                             ok:     flag saved, discard
//!                             failed: keep the departure record for the
//!                                     next autosave or the shutdown flush
//! shutdown:                 collect + save every unflagged session
//!                           within one deadline, at most once per process
//! ```
//!
//! Every write for a player happens while that player's session lock is
//! held, so an autosave can never land after (and overwrite) the record a
//! leave just wrote.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use delve_db::{
    LoadedRecord, RecordOrigin, RecordStore, RetryBudget, StorageBackend, StorageError,
};
use delve_economy::InventoryLimits;
use delve_structures::Catalog;
use delve_types::{InventorySnapshot, PlayerId, PlayerRecord, StructureStates};
use futures::future::join_all;
use tokio::time::Instant;

use crate::config::{PersistenceConfig, ServerConfig};
use crate::error::GatewayError;
use crate::hooks::Capabilities;
use crate::session::PlayerSession;
use crate::session_store::{PlayerSessionStore, SessionHandle};
use crate::shutdown::ShutdownSignal;

/// How a session's starting state was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOrigin {
    /// No stored record; the player starts from defaults.
    Fresh,
    /// A stored record was loaded and migrated.
    Stored {
        /// Schema version of the stored record.
        from_version: u32,
        /// Fields repaired during migration.
        recovered_fields: Vec<String>,
    },
    /// Storage could not be read; the session runs on defaults and will not
    /// overwrite a record that turns out to exist.
    UnsavedBaseline,
    /// The player's previous session was still waiting to be saved after a
    /// failed leave; it was reopened instead of reloading storage.
    Resumed,
}

/// A freshly joined session.
#[derive(Debug, Clone)]
pub struct Joined {
    /// Handle to the live session.
    pub handle: SessionHandle,
    /// Where the starting state came from.
    pub origin: JoinOrigin,
}

/// Result of saving one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was written.
    Saved,
    /// Storage failed after retries or the deadline passed.
    Failed,
    /// Nothing was written: the session was already saved for good, or it
    /// is an unsaved baseline and a stored record exists.
    Skipped,
}

/// Counts from one autosave pass or the shutdown flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Sessions written.
    pub saved: usize,
    /// Sessions whose write failed.
    pub failed: usize,
    /// Sessions deliberately not written.
    pub skipped: usize,
}

impl SaveSummary {
    fn from_outcomes(outcomes: &[SaveOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                let slot = match outcome {
                    SaveOutcome::Saved => &mut summary.saved,
                    SaveOutcome::Failed => &mut summary.failed,
                    SaveOutcome::Skipped => &mut summary.skipped,
                };
                *slot = slot.saturating_add(1);
                summary
            })
    }
}

/// Orchestrates load, autosave, leave, and shutdown persistence.
#[derive(Debug)]
pub struct PersistenceGateway<B> {
    store: RecordStore<B>,
    sessions: PlayerSessionStore,
    settings: PersistenceConfig,
    limits: InventoryLimits,
    catalog: Arc<Catalog>,
    caps: Capabilities,
    flushed: AtomicBool,
}

impl<B: StorageBackend> PersistenceGateway<B> {
    /// Create a gateway over an existing record store.
    pub fn new(
        store: RecordStore<B>,
        settings: PersistenceConfig,
        limits: InventoryLimits,
        catalog: Arc<Catalog>,
        caps: Capabilities,
    ) -> Self {
        Self {
            store,
            sessions: PlayerSessionStore::new(),
            settings,
            limits,
            catalog,
            caps,
            flushed: AtomicBool::new(false),
        }
    }

    /// Create a gateway from a validated server configuration.
    pub fn from_config(backend: B, config: &ServerConfig, caps: Capabilities) -> Self {
        let store = RecordStore::new(
            backend,
            config.storage.key_prefix.clone(),
            config.persistence.retry_policy(),
        );
        Self::new(
            store,
            config.persistence.clone(),
            config.inventory_limits(),
            Arc::new(config.catalog.clone()),
            caps,
        )
    }

    /// The underlying record store.
    pub const fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    /// The live session registry.
    pub const fn sessions(&self) -> &PlayerSessionStore {
        &self.sessions
    }

    /// Timing settings.
    pub const fn settings(&self) -> &PersistenceConfig {
        &self.settings
    }

    fn attempts(&self) -> RetryBudget {
        self.settings.retry_policy().into()
    }

    // =========================================================================
    // Load / collect / save
    // =========================================================================

    /// Load and migrate the stored record for `player_id`.
    pub async fn load(&self, player_id: PlayerId) -> Result<LoadedRecord, StorageError> {
        self.store.load(player_id).await
    }

    /// Load the player's record and start a live session.
    ///
    /// If storage cannot be read the session starts from defaults and is
    /// flagged as an unsaved baseline.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyJoined`] if the player already has a
    /// live session.
    pub async fn join(&self, player_id: PlayerId) -> Result<Joined, GatewayError> {
        if let Some(handle) = self.sessions.get(player_id).await {
            let mut session = handle.lock().await;
            if !session.is_departed() {
                return Err(GatewayError::AlreadyJoined(player_id));
            }
            session.resume();
            let unsaved_baseline = session.is_unsaved_baseline();
            drop(session);

            tracing::info!(%player_id, "Player rejoined before the leave save landed");
            self.caps.hooks.session_started(player_id, unsaved_baseline);
            return Ok(Joined {
                handle,
                origin: JoinOrigin::Resumed,
            });
        }

        let (record, origin) = match self.store.load(player_id).await {
            Ok(LoadedRecord {
                record,
                origin: RecordOrigin::Fresh,
            }) => (record, JoinOrigin::Fresh),
            Ok(LoadedRecord {
                record,
                origin:
                    RecordOrigin::Stored {
                        from_version,
                        recovered_fields,
                    },
            }) => (
                record,
                JoinOrigin::Stored {
                    from_version,
                    recovered_fields,
                },
            ),
            Err(e) => {
                tracing::warn!(
                    %player_id,
                    error = %e,
                    "Load failed, starting session from unsaved baseline"
                );
                (PlayerRecord::default(), JoinOrigin::UnsavedBaseline)
            }
        };

        let unsaved_baseline = origin == JoinOrigin::UnsavedBaseline;
        let session = PlayerSession::from_record(
            player_id,
            record,
            self.limits.clone(),
            Arc::clone(&self.catalog),
            self.caps.clone(),
            unsaved_baseline,
        );
        let handle = self.sessions.insert(session).await?;

        tracing::info!(%player_id, ?origin, "Player joined");
        self.caps.hooks.session_started(player_id, unsaved_baseline);
        Ok(Joined { handle, origin })
    }

    /// The live session for `player_id`. A departed session waiting for
    /// its save is not live.
    pub async fn session(&self, player_id: PlayerId) -> Option<SessionHandle> {
        let handle = self.sessions.get(player_id).await?;
        let departed = handle.lock().await.is_departed();
        (!departed).then_some(handle)
    }

    /// Run `f` against the player's live session under its lock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session or
    /// has already left.
    pub async fn with_session<R>(
        &self,
        player_id: PlayerId,
        f: impl FnOnce(&mut PlayerSession) -> R,
    ) -> Result<R, GatewayError> {
        let handle = self
            .sessions
            .get(player_id)
            .await
            .ok_or(GatewayError::NotJoined(player_id))?;
        let mut session = handle.lock().await;
        if session.is_departed() {
            return Err(GatewayError::NotJoined(player_id));
        }
        Ok(f(&mut session))
    }

    /// Snapshot the player's live state into a record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn collect(&self, player_id: PlayerId) -> Result<PlayerRecord, GatewayError> {
        self.with_session(player_id, PlayerSession::collect).await
    }

    /// Write `record` with the normal retry policy. Never fails; returns
    /// whether the write landed.
    pub async fn save(&self, player_id: PlayerId, record: &PlayerRecord) -> bool {
        let ok = match self.store.save(player_id, record, self.attempts()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "Save failed");
                false
            }
        };
        self.caps.hooks.record_saved(player_id, ok);
        ok
    }

    /// Collect and write one locked session within `budget`.
    async fn save_session(&self, session: &mut PlayerSession, budget: RetryBudget) -> SaveOutcome {
        let player_id = session.player_id();

        if session.is_unsaved_baseline() {
            match self.store.exists_within(player_id, budget).await {
                Ok(false) => session.clear_unsaved_baseline(),
                Ok(true) => {
                    tracing::warn!(
                        %player_id,
                        "Stored record exists for unsaved baseline, refusing to overwrite"
                    );
                    return SaveOutcome::Skipped;
                }
                Err(e) => {
                    tracing::warn!(%player_id, error = %e, "Baseline probe failed");
                    self.caps.hooks.record_saved(player_id, false);
                    return SaveOutcome::Failed;
                }
            }
        }

        let record = session.record_for_save();
        let at = record.last_saved_at;
        match self.store.save(player_id, &record, budget).await {
            Ok(()) => {
                session.mark_persisted(at);
                self.caps.hooks.record_saved(player_id, true);
                SaveOutcome::Saved
            }
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "Save failed");
                self.caps.hooks.record_saved(player_id, false);
                SaveOutcome::Failed
            }
        }
    }

    // =========================================================================
    // Leave
    // =========================================================================

    /// Save the player once and discard the session.
    ///
    /// Returns whether the player's latest state is in storage. A session
    /// already saved by the shutdown flush is not written again. When the
    /// write fails the record collected here stays registered, and the next
    /// autosave pass or the shutdown flush retries it; a rejoin before then
    /// reopens the session.
    pub async fn leave(&self, player_id: PlayerId) -> bool {
        let Some(handle) = self.sessions.get(player_id).await else {
            tracing::debug!(%player_id, "Leave for unknown player");
            return false;
        };

        let outcome = {
            let mut session = handle.lock().await;
            if session.is_departed() {
                tracing::debug!(%player_id, "Leave for departed player");
                return false;
            }
            let outcome = if session.is_saved() {
                SaveOutcome::Saved
            } else {
                session.depart();
                self.save_session(&mut session, self.attempts()).await
            };
            match outcome {
                SaveOutcome::Saved => {
                    session.mark_saved();
                    self.sessions.remove(player_id).await;
                    tracing::info!(%player_id, "Player left");
                }
                SaveOutcome::Skipped => {
                    // The baseline guard refuses this record for good.
                    self.sessions.remove(player_id).await;
                    tracing::warn!(%player_id, "Player left without a save");
                }
                SaveOutcome::Failed => {
                    tracing::warn!(%player_id, "Leave save failed, keeping record for retry");
                }
            }
            outcome
        };
        self.caps.hooks.session_ended(player_id);
        outcome == SaveOutcome::Saved
    }

    // =========================================================================
    // Autosave
    // =========================================================================

    /// Save every live session once, independently.
    pub async fn autosave_once(&self) -> SaveSummary {
        let handles = self.sessions.handles().await;
        let budget = self.attempts();

        let outcomes = join_all(handles.into_iter().map(|(player_id, handle)| async move {
            let mut session = handle.lock().await;
            if session.is_saved() {
                return SaveOutcome::Skipped;
            }
            let outcome = self.save_session(&mut session, budget).await;
            if session.is_departed() && outcome != SaveOutcome::Failed {
                // Removed under the session lock so a concurrent rejoin
                // cannot reopen it first.
                session.mark_saved();
                self.sessions.remove(player_id).await;
                tracing::info!(%player_id, "Departed player's record settled");
            }
            outcome
        }))
        .await;

        let summary = SaveSummary::from_outcomes(&outcomes);
        if summary.failed > 0 {
            tracing::warn!(
                saved = summary.saved,
                failed = summary.failed,
                skipped = summary.skipped,
                "Autosave pass finished with failures"
            );
        } else {
            tracing::debug!(
                saved = summary.saved,
                skipped = summary.skipped,
                "Autosave pass finished"
            );
        }
        summary
    }

    /// Run autosave passes on the configured interval until `shutdown`.
    pub async fn run_autosave(&self, shutdown: &ShutdownSignal) {
        let period = self.settings.autosave_interval();
        let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = period.as_secs(), "Autosave loop starting");
        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = interval.tick() => {
                    self.autosave_once().await;
                }
            }
        }
        tracing::info!("Autosave loop stopped");
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Save every session not already flagged, within the shutdown deadline.
    ///
    /// Runs at most once per gateway; later calls return `None`. Sessions
    /// written here are flagged so a later leave does not write them again.
    pub async fn shutdown_flush(&self) -> Option<SaveSummary> {
        if self.flushed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shutdown flush already ran");
            return None;
        }

        let now = Instant::now();
        let deadline = now
            .checked_add(self.settings.shutdown_deadline())
            .unwrap_or(now);
        let budget = RetryBudget::Deadline {
            deadline,
            delay: self.settings.retry_policy().delay,
        };
        let handles = self.sessions.handles().await;
        tracing::info!(
            players = handles.len(),
            deadline_ms = self.settings.shutdown_deadline_ms,
            "Shutdown flush starting"
        );

        let outcomes = join_all(handles.into_iter().map(|(player_id, handle)| async move {
            let flush = async {
                let mut session = handle.lock().await;
                if session.is_saved() {
                    return SaveOutcome::Skipped;
                }
                let outcome = self.save_session(&mut session, budget).await;
                if outcome == SaveOutcome::Saved {
                    session.mark_saved();
                }
                outcome
            };
            if let Ok(outcome) = tokio::time::timeout_at(deadline, flush).await {
                outcome
            } else {
                tracing::warn!(%player_id, "Shutdown flush deadline passed");
                SaveOutcome::Failed
            }
        }))
        .await;

        let summary = SaveSummary::from_outcomes(&outcomes);
        tracing::info!(
            saved = summary.saved,
            failed = summary.failed,
            skipped = summary.skipped,
            "Shutdown flush finished"
        );
        Some(summary)
    }

    // =========================================================================
    // Admin and collaborators
    // =========================================================================

    /// Delete the stored record of an offline player.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PlayerOnline`] if the player has a live
    /// session, or [`GatewayError::Storage`] if the delete fails.
    pub async fn wipe(&self, player_id: PlayerId) -> Result<(), GatewayError> {
        if self.sessions.contains(player_id).await {
            return Err(GatewayError::PlayerOnline(player_id));
        }
        self.store.wipe(player_id).await?;
        Ok(())
    }

    /// The player's opaque tutorial blob.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn tutorial_state(&self, player_id: PlayerId) -> Result<serde_json::Value, GatewayError> {
        self.with_session(player_id, |s| s.tutorial_state().clone())
            .await
    }

    /// Replace the player's opaque tutorial blob.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn set_tutorial_state(
        &self,
        player_id: PlayerId,
        state: serde_json::Value,
    ) -> Result<(), GatewayError> {
        self.with_session(player_id, |s| s.set_tutorial_state(state))
            .await
    }

    /// Copy out the player's inventory.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn inventory_snapshot(
        &self,
        player_id: PlayerId,
    ) -> Result<InventorySnapshot, GatewayError> {
        self.with_session(player_id, |s| s.inventory_snapshot()).await
    }

    /// Replace the player's inventory.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn apply_inventory_snapshot(
        &self,
        player_id: PlayerId,
        snapshot: InventorySnapshot,
    ) -> Result<(), GatewayError> {
        self.with_session(player_id, |s| s.apply_inventory_snapshot(snapshot))
            .await
    }

    /// Copy out the player's incubator and pen states.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn structure_states(
        &self,
        player_id: PlayerId,
    ) -> Result<StructureStates, GatewayError> {
        self.with_session(player_id, |s| s.structure_states()).await
    }

    /// Replace the player's incubator and pen states; pen timers restart.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotJoined`] if the player has no session.
    pub async fn set_structure_states(
        &self,
        player_id: PlayerId,
        states: StructureStates,
    ) -> Result<(), GatewayError> {
        self.with_session(player_id, |s| s.set_structure_states(states))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use delve_db::{DEFAULT_KEY_PREFIX, MemoryBackend, RetryPolicy};
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000;

    fn gateway() -> (PersistenceGateway<Arc<MemoryBackend>>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = RecordStore::new(
            Arc::clone(&backend),
            DEFAULT_KEY_PREFIX,
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_secs(1),
            },
        );
        let caps = Capabilities::default()
            .with_clock(Arc::new(ManualClock::new(START)))
            .with_rng_seed(1);
        let gateway = PersistenceGateway::new(
            store,
            PersistenceConfig::default(),
            InventoryLimits::default(),
            Arc::new(Catalog::default()),
            caps,
        );
        (gateway, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_join_uses_defaults() {
        let (gateway, _) = gateway();
        let id = PlayerId::new();
        let joined = gateway.join(id).await.unwrap();
        assert_eq!(joined.origin, JoinOrigin::Fresh);
        let record = gateway.collect(id).await.unwrap();
        assert_eq!(record.currency, 0);
        assert_eq!(record.pickaxe_level, 1);
        assert_eq!(record.backpack_level, 1);
        assert!(record.egg_inventory.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn double_join_is_rejected() {
        let (gateway, _) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        assert!(matches!(
            gateway.join(id).await,
            Err(GatewayError::AlreadyJoined(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn save_reports_failure_instead_of_erroring() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        backend.set_unavailable(true);
        assert!(!gateway.save(id, &PlayerRecord::default()).await);
        backend.set_unavailable(false);
        assert!(gateway.save(id, &PlayerRecord::default()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn leave_saves_once_and_discards() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        gateway
            .with_session(id, |s| s.record_mining_hit("iron", 10, 1, 1))
            .await
            .unwrap()
            .unwrap();

        assert!(gateway.leave(id).await);
        assert!(gateway.session(id).await.is_none());
        let key = gateway.store().key(id);
        assert_eq!(backend.write_count(&key).await, 1);
        assert_eq!(backend.peek(&key).await.unwrap()["storageUsed"], json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_leave_is_retried_by_next_autosave() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        gateway
            .with_session(id, |s| s.record_mining_hit("iron", 10, 1, 1))
            .await
            .unwrap()
            .unwrap();

        backend.set_unavailable(true);
        assert!(!gateway.leave(id).await);
        assert!(gateway.session(id).await.is_none());
        assert!(matches!(
            gateway.with_session(id, |_| ()).await,
            Err(GatewayError::NotJoined(_))
        ));

        backend.set_unavailable(false);
        let summary = gateway.autosave_once().await;
        assert_eq!(summary.saved, 1);
        assert!(!gateway.sessions().contains(id).await);
        let key = gateway.store().key(id);
        assert_eq!(backend.peek(&key).await.unwrap()["storageUsed"], json!(1));

        // Settled, so later passes have nothing to write.
        assert_eq!(gateway.autosave_once().await, SaveSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn rejoin_after_failed_leave_resumes_session() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        gateway
            .with_session(id, |s| s.record_mining_hit("iron", 10, 1, 1))
            .await
            .unwrap()
            .unwrap();

        backend.set_unavailable(true);
        assert!(!gateway.leave(id).await);
        backend.set_unavailable(false);

        let joined = gateway.join(id).await.unwrap();
        assert_eq!(joined.origin, JoinOrigin::Resumed);
        assert_eq!(
            gateway
                .with_session(id, |s| s.ledger().storage_used())
                .await
                .unwrap(),
            1
        );
        assert!(gateway.leave(id).await);
        assert!(!gateway.sessions().contains(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flush_runs_at_most_once() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();

        let summary = gateway.shutdown_flush().await.unwrap();
        assert_eq!(summary.saved, 1);
        assert!(gateway.shutdown_flush().await.is_none());

        // Already flushed, so leaving does not write again.
        assert!(gateway.leave(id).await);
        assert_eq!(backend.write_count(&gateway.store().key(id)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_baseline_never_overwrites_existing_record() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        let key = gateway.store().key(id);
        backend.seed(&key, json!({ "version": 3, "currency": 9000 })).await;

        backend.fail_next(3);
        let joined = gateway.join(id).await.unwrap();
        assert_eq!(joined.origin, JoinOrigin::UnsavedBaseline);

        let summary = gateway.autosave_once().await;
        assert_eq!(summary.skipped, 1);
        assert!(!gateway.leave(id).await);
        assert_eq!(backend.peek(&key).await.unwrap()["currency"], json!(9000));
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_baseline_saves_when_storage_is_empty() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        backend.fail_next(3);
        gateway.join(id).await.unwrap();

        let summary = gateway.autosave_once().await;
        assert_eq!(summary.saved, 1);
        let session = gateway.session(id).await.unwrap();
        assert!(!session.lock().await.is_unsaved_baseline());
    }

    #[tokio::test(start_paused = true)]
    async fn wipe_requires_offline_player() {
        let (gateway, backend) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        assert!(matches!(
            gateway.wipe(id).await,
            Err(GatewayError::PlayerOnline(_))
        ));
        gateway.leave(id).await;
        gateway.wipe(id).await.unwrap();
        assert!(backend.peek(&gateway.store().key(id)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn tutorial_state_is_opaque() {
        let (gateway, _) = gateway();
        let id = PlayerId::new();
        gateway.join(id).await.unwrap();
        gateway
            .set_tutorial_state(id, json!({ "step": "dig", "done": [1, 2] }))
            .await
            .unwrap();
        assert_eq!(
            gateway.tutorial_state(id).await.unwrap(),
            json!({ "step": "dig", "done": [1, 2] })
        );
        assert!(matches!(
            gateway.tutorial_state(PlayerId::new()).await,
            Err(GatewayError::NotJoined(_))
        ));
    }

    #[test]
    fn summary_counts_outcomes() {
        let summary = SaveSummary::from_outcomes(&[
            SaveOutcome::Saved,
            SaveOutcome::Failed,
            SaveOutcome::Saved,
            SaveOutcome::Skipped,
        ]);
        assert_eq!(
            summary,
            SaveSummary {
                saved: 2,
                failed: 1,
                skipped: 1
            }
        );
    }
}

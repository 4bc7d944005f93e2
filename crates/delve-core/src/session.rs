//! One player's live state between join and leave.
//!
//! A [`PlayerSession`] owns the player's [`InventoryLedger`] and
//! [`StructureEngine`], plus the progression and tutorial data that ride
//! along in the persisted record. Gameplay handlers mutate it through the
//! methods below; the gateway turns it back into a [`PlayerRecord`] with
//! [`PlayerSession::collect`].
//!
//! Sessions are not shared between players. The gateway wraps each one in a
//! mutex so a save never observes a half-applied action.

use std::sync::Arc;

use delve_economy::{InventoryError, InventoryLedger, InventoryLimits, OreAdded};
use delve_structures::{Catalog, Released, RemovedUnit, StructureEngine, StructureError};
use delve_types::{
    EggDescriptor, EggId, IncubatorState, InventorySnapshot, PenState, PlayerId, PlayerRecord,
    Progression, Rarity, StructureId, StructureKind, StructureStates, UnitDescriptor, UnitId,
    Variant,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::ActionError;
use crate::hooks::Capabilities;

/// Outcome of a mining hit that landed in the backpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningOutcome {
    /// Backpack state after the addition.
    pub added: OreAdded,
    /// Whether this ore kind was mined for the first time.
    pub first_discovery: bool,
}

/// Outcome of a successful hatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HatchOutcome {
    /// The new unit, now in inventory.
    pub unit: UnitDescriptor,
    /// Whether the species was hatched for the first time.
    pub first_discovery: bool,
}

/// Live state for one player.
#[derive(Debug)]
pub struct PlayerSession {
    player_id: PlayerId,
    ledger: InventoryLedger,
    structures: StructureEngine,
    progression: Progression,
    tutorial_state: serde_json::Value,
    last_saved_at: i64,
    play_anchor: i64,
    unsaved_baseline: bool,
    saved: bool,
    departed: Option<PlayerRecord>,
    catalog: Arc<Catalog>,
    caps: Capabilities,
    rng: StdRng,
}

impl PlayerSession {
    /// Build a session from a loaded record.
    ///
    /// Pen accrual restarts at the current time; no income is granted for
    /// time spent offline. `unsaved_baseline` marks a session whose stored
    /// record could not be read.
    pub fn from_record(
        player_id: PlayerId,
        record: PlayerRecord,
        limits: InventoryLimits,
        catalog: Arc<Catalog>,
        caps: Capabilities,
        unsaved_baseline: bool,
    ) -> Self {
        let now = caps.now();
        let last_saved_at = record.last_saved_at;
        let (inventory, states, progression, tutorial_state) = record.into_parts();
        let ledger = InventoryLedger::from_snapshot(inventory, progression.equipped_backpack, limits);
        let structures = StructureEngine::restore(states, now);
        let rng = caps
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            player_id,
            ledger,
            structures,
            progression,
            tutorial_state,
            last_saved_at,
            play_anchor: now,
            unsaved_baseline,
            saved: false,
            departed: None,
            catalog,
            caps,
            rng,
        }
    }

    /// The player this session belongs to.
    pub const fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Read-only view of the inventory ledger.
    pub const fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    /// Read-only view of the player's structures.
    pub const fn structures(&self) -> &StructureEngine {
        &self.structures
    }

    /// Levels, discoveries, and statistics.
    pub const fn progression(&self) -> &Progression {
        &self.progression
    }

    /// When the record was last written successfully (0 if never).
    pub const fn last_saved_at(&self) -> i64 {
        self.last_saved_at
    }

    // =========================================================================
    // Persistence bookkeeping
    // =========================================================================

    /// Snapshot the session into a record stamped at the current time.
    ///
    /// Session time since the previous collect is folded into
    /// `stats.play_time_seconds`, so repeated collects never double count.
    pub fn collect(&mut self) -> PlayerRecord {
        let now = self.caps.now();
        let played = u64::try_from(now.saturating_sub(self.play_anchor)).unwrap_or(0);
        self.progression.stats.play_time_seconds =
            self.progression.stats.play_time_seconds.saturating_add(played);
        self.play_anchor = now.max(self.play_anchor);

        PlayerRecord::from_parts(
            self.ledger.snapshot(),
            self.structures.states(),
            self.progression.clone(),
            self.tutorial_state.clone(),
            now,
        )
    }

    /// Note a successful write of a record collected at `at`.
    pub(crate) const fn mark_persisted(&mut self, at: i64) {
        self.last_saved_at = at;
        self.unsaved_baseline = false;
    }

    /// Whether the stored record could not be read at join.
    pub const fn is_unsaved_baseline(&self) -> bool {
        self.unsaved_baseline
    }

    /// Drop the unsaved-baseline flag once storage is known to be empty.
    pub(crate) const fn clear_unsaved_baseline(&mut self) {
        self.unsaved_baseline = false;
    }

    /// Whether the leave sequence or shutdown flush already saved this
    /// session.
    pub const fn is_saved(&self) -> bool {
        self.saved
    }

    /// Flag the session as saved for good.
    pub(crate) const fn mark_saved(&mut self) {
        self.saved = true;
    }

    /// Whether the player left and the session only waits for its final
    /// record to reach storage.
    pub const fn is_departed(&self) -> bool {
        self.departed.is_some()
    }

    /// Freeze the session at the player's departure. Later saves write the
    /// record collected here, so retries do not count offline play time.
    pub(crate) fn depart(&mut self) {
        if self.departed.is_none() {
            self.departed = Some(self.collect());
        }
    }

    /// Reopen a departed session for a rejoining player. Pen timers and the
    /// play-time anchor restart now, as on a fresh load.
    pub(crate) fn resume(&mut self) {
        self.departed = None;
        self.saved = false;
        self.play_anchor = self.caps.now();
        self.set_structure_states(self.structures.states());
    }

    /// The record the next save should write.
    pub(crate) fn record_for_save(&mut self) -> PlayerRecord {
        match &self.departed {
            Some(record) => record.clone(),
            None => self.collect(),
        }
    }

    /// The opaque tutorial blob.
    pub const fn tutorial_state(&self) -> &serde_json::Value {
        &self.tutorial_state
    }

    /// Replace the opaque tutorial blob.
    pub fn set_tutorial_state(&mut self, state: serde_json::Value) {
        self.tutorial_state = state;
    }

    /// Copy out the inventory for collaborators.
    pub fn inventory_snapshot(&self) -> InventorySnapshot {
        self.ledger.snapshot()
    }

    /// Replace the inventory wholesale, keeping the equipped level.
    pub fn apply_inventory_snapshot(&mut self, snapshot: InventorySnapshot) {
        self.ledger = InventoryLedger::from_snapshot(
            snapshot,
            self.progression.equipped_backpack,
            self.ledger.limits().clone(),
        );
    }

    /// Copy out incubator and pen states for collaborators.
    pub fn structure_states(&self) -> StructureStates {
        self.structures.states()
    }

    /// Replace incubator and pen states. Pen timers restart now; empty
    /// structures the player already owned stay owned.
    pub fn set_structure_states(&mut self, states: StructureStates) {
        let mut restored = StructureEngine::restore(states, self.caps.now());
        for (&id, &kind) in self.structures.owned() {
            // A restored state wins when the kinds disagree.
            let _ = restored.claim(id, kind);
        }
        self.structures = restored;
    }

    // =========================================================================
    // Mining and selling
    // =========================================================================

    /// Put a mined ore into the backpack and update mining statistics.
    ///
    /// `depth` and `layer` describe where the hit landed; the deepest values
    /// seen are kept.
    pub fn record_mining_hit(
        &mut self,
        kind: &str,
        value: u64,
        depth: u32,
        layer: u32,
    ) -> Result<MiningOutcome, ActionError> {
        let added = match self.ledger.add_ore(kind, value) {
            Ok(added) => added,
            Err(e) => {
                if matches!(e, InventoryError::BackpackFull { .. }) {
                    self.caps
                        .hooks
                        .backpack_full(self.player_id, self.ledger.capacity());
                }
                return Err(e.into());
            }
        };

        let stats = &mut self.progression.stats;
        stats.blocks_mined = stats.blocks_mined.saturating_add(1);
        stats.deepest_depth = stats.deepest_depth.max(depth);
        self.progression.max_layer_reached = self.progression.max_layer_reached.max(layer);
        let first_discovery = self.progression.discover_ore(kind);

        let hooks = &self.caps.hooks;
        hooks.ore_added(self.player_id, kind, &added);
        if first_discovery {
            tracing::info!(player_id = %self.player_id, ore = kind, "New ore discovered");
            hooks.ore_discovered(self.player_id, kind);
        }

        Ok(MiningOutcome {
            added,
            first_discovery,
        })
    }

    /// Sell the whole backpack. Returns the amount credited.
    pub fn sell(&mut self) -> Result<u64, ActionError> {
        let amount = self.ledger.sell()?;
        if amount > 0 {
            self.add_cash_earned(amount);
            self.caps
                .hooks
                .sold(self.player_id, amount, self.ledger.currency());
        }
        Ok(amount)
    }

    /// Equip an owned backpack level. Returns the new capacity.
    ///
    /// Lowering the level never evicts ore.
    pub fn equip_backpack(&mut self, level: u32) -> Result<u32, ActionError> {
        let owned = self.progression.backpack_level;
        if level == 0 || level > owned {
            return Err(ActionError::LevelNotOwned {
                requested: level,
                owned,
            });
        }
        self.progression.equipped_backpack = level;
        self.ledger.set_equipped_backpack(level);
        Ok(self.ledger.capacity())
    }

    /// Equip an owned pickaxe level.
    pub fn equip_pickaxe(&mut self, level: u32) -> Result<(), ActionError> {
        let owned = self.progression.pickaxe_level;
        if level == 0 || level > owned {
            return Err(ActionError::LevelNotOwned {
                requested: level,
                owned,
            });
        }
        self.progression.equipped_pickaxe = level;
        Ok(())
    }

    // =========================================================================
    // Eggs and structures
    // =========================================================================

    /// Add a freshly dropped egg to inventory.
    pub fn grant_egg(&mut self, rarity: Rarity, variant: Variant) -> Result<EggDescriptor, ActionError> {
        let egg = EggDescriptor {
            id: EggId::new(),
            rarity,
            variant,
            acquired_at: self.caps.now(),
        };
        self.ledger.add_egg(egg.clone())?;
        self.caps.hooks.egg_granted(self.player_id, &egg);
        Ok(egg)
    }

    /// Register a structure placed on the player's plot.
    pub fn claim_structure(&mut self, id: StructureId, kind: StructureKind) -> Result<(), ActionError> {
        Ok(self.structures.claim(id, kind)?)
    }

    /// Give up a structure, returning its contents to inventory.
    pub fn release_structure(&mut self, id: StructureId) -> Result<Released, ActionError> {
        let now = self.caps.now();
        let released = self
            .structures
            .release(id, &mut self.ledger, &self.catalog, now)
            .inspect_err(|e| self.credit_blocked_removal(e))?;
        if let Some(removed) = &released.unit {
            self.add_cash_earned(removed.collected);
        }
        Ok(released)
    }

    /// Start incubating an egg from inventory.
    pub fn place_egg(&mut self, id: StructureId, egg_id: EggId) -> Result<IncubatorState, ActionError> {
        let now = self.caps.now();
        let state = self
            .structures
            .place_egg(id, egg_id, &mut self.ledger, &self.catalog, now)?
            .clone();
        self.caps.hooks.egg_placed(self.player_id, &state);
        Ok(state)
    }

    /// Seconds until the incubator's egg is ready.
    pub fn time_remaining(&self, id: StructureId) -> Result<u64, ActionError> {
        Ok(self.structures.time_remaining(id, self.caps.now())?)
    }

    /// Make the incubator's egg ready immediately.
    pub fn speed_up(&mut self, id: StructureId) -> Result<(), ActionError> {
        Ok(self.structures.speed_up(id, self.caps.now())?)
    }

    /// Abort incubation and return the egg to inventory.
    pub fn cancel_incubation(&mut self, id: StructureId) -> Result<EggDescriptor, ActionError> {
        Ok(self.structures.cancel(id, &mut self.ledger)?)
    }

    /// Hatch a ready egg and record the species discovery.
    pub fn hatch(&mut self, id: StructureId) -> Result<HatchOutcome, ActionError> {
        let now = self.caps.now();
        let unit = self
            .structures
            .hatch(id, &mut self.ledger, &self.catalog, &mut self.rng, now)?;
        let first_discovery = self.progression.record_hatch(&unit.species_id);
        if first_discovery {
            tracing::info!(
                player_id = %self.player_id,
                species = unit.species_id.as_str(),
                "New species discovered"
            );
        }
        self.caps
            .hooks
            .hatched(self.player_id, id, &unit, first_discovery);
        Ok(HatchOutcome {
            unit,
            first_discovery,
        })
    }

    /// Move a unit from inventory into a pen.
    pub fn place_unit(&mut self, id: StructureId, unit_id: UnitId) -> Result<PenState, ActionError> {
        let now = self.caps.now();
        let state = self
            .structures
            .place_unit(id, unit_id, &mut self.ledger, now)?
            .clone();
        self.caps.hooks.unit_placed(self.player_id, &state);
        Ok(state)
    }

    /// Currency the pen would pay out now.
    pub fn pending_income(&self, id: StructureId) -> Result<u64, ActionError> {
        Ok(self
            .structures
            .pending_income(id, &self.catalog, self.caps.now())?)
    }

    /// Pay a pen's accrued income into currency.
    pub fn collect_pen(&mut self, id: StructureId) -> Result<u64, ActionError> {
        let now = self.caps.now();
        let amount = self
            .structures
            .collect(id, &mut self.ledger, &self.catalog, now)?;
        self.add_cash_earned(amount);
        self.caps
            .hooks
            .income_collected(self.player_id, id, amount, self.ledger.currency());
        Ok(amount)
    }

    /// Collect, then move the pen's unit back to inventory.
    ///
    /// When the inventory is full the unit stays in the pen and the call
    /// declines with `RemoveBlocked`, but the income already collected is
    /// kept and counted.
    pub fn remove_unit(&mut self, id: StructureId) -> Result<RemovedUnit, ActionError> {
        let now = self.caps.now();
        let removed = self
            .structures
            .remove_unit(id, &mut self.ledger, &self.catalog, now)
            .inspect_err(|e| self.credit_blocked_removal(e))?;
        self.add_cash_earned(removed.collected);
        Ok(removed)
    }

    fn credit_blocked_removal(&mut self, err: &StructureError) {
        if let StructureError::RemoveBlocked { collected, .. } = err {
            self.add_cash_earned(*collected);
        }
    }

    fn add_cash_earned(&mut self, amount: u64) {
        let stats = &mut self.progression.stats;
        stats.cash_earned = stats.cash_earned.saturating_add(amount);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_economy::CapacityTable;
    use delve_types::DeclineReason;

    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000;

    fn session_with(record: PlayerRecord, limits: InventoryLimits) -> (PlayerSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let caps = Capabilities::default()
            .with_clock(clock.clone())
            .with_rng_seed(7);
        let session = PlayerSession::from_record(
            PlayerId::new(),
            record,
            limits,
            Arc::new(Catalog::default()),
            caps,
            false,
        );
        (session, clock)
    }

    fn session() -> (PlayerSession, Arc<ManualClock>) {
        session_with(PlayerRecord::default(), InventoryLimits::default())
    }

    #[test]
    fn mining_updates_stats_and_discovery() {
        let (mut s, _) = session();
        let first = s.record_mining_hit("iron", 10, 12, 2).unwrap();
        assert!(first.first_discovery);
        let second = s.record_mining_hit("iron", 10, 5, 1).unwrap();
        assert!(!second.first_discovery);
        assert_eq!(second.added.storage_used, 2);

        let p = s.progression();
        assert_eq!(p.stats.blocks_mined, 2);
        assert_eq!(p.stats.deepest_depth, 12);
        assert_eq!(p.max_layer_reached, 2);
        assert_eq!(p.discovered_ore_ids.get("iron"), Some(&true));
    }

    #[test]
    fn full_backpack_declines_without_counting() {
        let limits = InventoryLimits {
            backpack: CapacityTable::new(vec![2]).unwrap(),
            unit_capacity: 30,
        };
        let (mut s, _) = session_with(PlayerRecord::default(), limits);
        s.record_mining_hit("coal", 1, 1, 1).unwrap();
        s.record_mining_hit("coal", 1, 1, 1).unwrap();
        let err = s.record_mining_hit("gold", 50, 9, 3).unwrap_err();
        assert_eq!(err.reason(), DeclineReason::CapacityExceeded);
        assert_eq!(s.progression().stats.blocks_mined, 2);
        assert!(!s.progression().discovered_ore_ids.contains_key("gold"));
    }

    #[test]
    fn sell_counts_cash_earned() {
        let (mut s, _) = session();
        for _ in 0..3 {
            s.record_mining_hit("iron", 10, 1, 1).unwrap();
        }
        assert_eq!(s.sell().unwrap(), 30);
        assert_eq!(s.ledger().currency(), 30);
        assert_eq!(s.progression().stats.cash_earned, 30);
        assert_eq!(s.sell().unwrap(), 0);
    }

    #[test]
    fn equip_backpack_is_bounded_by_owned_level() {
        let mut record = PlayerRecord::default();
        record.backpack_level = 3;
        record.equipped_backpack = 3;
        let (mut s, _) = session_with(record, InventoryLimits::default());
        assert_eq!(s.ledger().capacity(), 200);

        assert_eq!(s.equip_backpack(1).unwrap(), 50);
        let err = s.equip_backpack(4).unwrap_err();
        assert_eq!(
            err,
            ActionError::LevelNotOwned {
                requested: 4,
                owned: 3
            }
        );
        assert_eq!(s.collect().equipped_backpack, 1);
    }

    #[test]
    fn lowering_backpack_keeps_ore() {
        let mut record = PlayerRecord::default();
        record.backpack_level = 2;
        record.equipped_backpack = 2;
        let limits = InventoryLimits {
            backpack: CapacityTable::new(vec![1, 3]).unwrap(),
            unit_capacity: 30,
        };
        let (mut s, _) = session_with(record, limits);
        for _ in 0..3 {
            s.record_mining_hit("iron", 1, 1, 1).unwrap();
        }
        s.equip_backpack(1).unwrap();
        assert_eq!(s.ledger().storage_used(), 3);
        assert!(s.record_mining_hit("iron", 1, 1, 1).is_err());
    }

    #[test]
    fn egg_to_unit_to_income() {
        let (mut s, clock) = session();
        let incubator = StructureId::new();
        let pen = StructureId::new();
        s.claim_structure(incubator, StructureKind::Incubator).unwrap();
        s.claim_structure(pen, StructureKind::Pen).unwrap();

        let egg = s.grant_egg(Rarity::Common, Variant::Golden).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        assert_eq!(s.time_remaining(incubator).unwrap(), 30);

        clock.advance(29);
        let err = s.hatch(incubator).unwrap_err();
        assert_eq!(err.reason(), DeclineReason::NotReady);

        clock.advance(2);
        let hatched = s.hatch(incubator).unwrap();
        assert!(hatched.first_discovery);
        assert_eq!(hatched.unit.variant, Variant::Golden);
        assert_eq!(s.progression().stats.species_found, 1);

        s.place_unit(pen, hatched.unit.id).unwrap();
        clock.advance(10);
        let expected = s.pending_income(pen).unwrap();
        assert!(expected > 0);
        assert_eq!(s.collect_pen(pen).unwrap(), expected);
        assert_eq!(s.progression().stats.cash_earned, expected);
        assert_eq!(
            s.collect_pen(pen).unwrap_err().reason(),
            DeclineReason::NothingToCollect
        );
    }

    #[test]
    fn blocked_removal_still_counts_collected_cash() {
        let limits = InventoryLimits {
            backpack: CapacityTable::default(),
            unit_capacity: 1,
        };
        let (mut s, clock) = session_with(PlayerRecord::default(), limits);
        let incubator = StructureId::new();
        let pen = StructureId::new();
        s.claim_structure(incubator, StructureKind::Incubator).unwrap();
        s.claim_structure(pen, StructureKind::Pen).unwrap();

        let egg = s.grant_egg(Rarity::Common, Variant::Normal).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        s.speed_up(incubator).unwrap();
        let first = s.hatch(incubator).unwrap().unit;
        s.place_unit(pen, first.id).unwrap();

        let egg = s.grant_egg(Rarity::Common, Variant::Normal).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        s.speed_up(incubator).unwrap();
        s.hatch(incubator).unwrap();

        clock.advance(100);
        let err = s.remove_unit(pen).unwrap_err();
        let collected = match &err {
            ActionError::Structure(StructureError::RemoveBlocked {
                collected, source, ..
            }) => {
                assert!(matches!(source, InventoryError::UnitCapacityFull { .. }));
                *collected
            }
            _ => 0,
        };
        assert_eq!(err.reason(), DeclineReason::CapacityExceeded);
        assert!(collected > 0);
        assert_eq!(s.ledger().currency(), collected);
        assert_eq!(s.progression().stats.cash_earned, collected);
        assert!(s.structures().pen(pen).is_some());
    }

    #[test]
    fn collect_folds_play_time_once() {
        let (mut s, clock) = session();
        clock.advance(90);
        let first = s.collect();
        assert_eq!(first.stats.play_time_seconds, 90);
        assert_eq!(first.last_saved_at, START + 90);
        let again = s.collect();
        assert_eq!(again.stats.play_time_seconds, 90);
        clock.advance(10);
        assert_eq!(s.collect().stats.play_time_seconds, 100);
    }

    #[test]
    fn restored_pen_does_not_pay_for_offline_time() {
        let (mut s, clock) = session();
        let incubator = StructureId::new();
        let pen = StructureId::new();
        s.claim_structure(incubator, StructureKind::Incubator).unwrap();
        s.claim_structure(pen, StructureKind::Pen).unwrap();
        let egg = s.grant_egg(Rarity::Rare, Variant::Normal).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        s.speed_up(incubator).unwrap();
        let unit = s.hatch(incubator).unwrap().unit;
        s.place_unit(pen, unit.id).unwrap();
        let record = s.collect();

        clock.advance(3600);
        let caps = Capabilities::default().with_clock(clock.clone());
        let restored = PlayerSession::from_record(
            s.player_id(),
            record,
            InventoryLimits::default(),
            Arc::new(Catalog::default()),
            caps,
            false,
        );
        assert_eq!(restored.pending_income(pen).unwrap(), 0);
    }

    #[test]
    fn set_structure_states_keeps_empty_claims() {
        let (mut s, _) = session();
        let empty_pen = StructureId::new();
        s.claim_structure(empty_pen, StructureKind::Pen).unwrap();
        s.set_structure_states(StructureStates::default());
        assert_eq!(s.structures().kind_of(empty_pen).unwrap(), StructureKind::Pen);
    }

    #[test]
    fn tutorial_blob_round_trips_through_collect() {
        let (mut s, _) = session();
        s.set_tutorial_state(serde_json::json!({ "step": 3 }));
        assert_eq!(s.collect().tutorial_state, serde_json::json!({ "step": 3 }));
    }
}

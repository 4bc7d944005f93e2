//! Event hooks that write session activity to the log.

use delve_core::EventHooks;
use delve_economy::OreAdded;
use delve_types::{EggDescriptor, IncubatorState, PenState, PlayerId, StructureId, UnitDescriptor};
use tracing::{debug, info, warn};

/// Logs every session event at `debug`, and lifecycle events at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl EventHooks for TracingHooks {
    fn session_started(&self, player: PlayerId, unsaved_baseline: bool) {
        if unsaved_baseline {
            warn!(%player, "Session started from an unsaved baseline");
        } else {
            info!(%player, "Session started");
        }
    }

    fn session_ended(&self, player: PlayerId) {
        info!(%player, "Session ended");
    }

    fn ore_added(&self, player: PlayerId, kind: &str, added: &OreAdded) {
        debug!(
            %player,
            kind,
            storage_used = added.storage_used,
            capacity = added.capacity,
            "Ore added"
        );
    }

    fn ore_discovered(&self, player: PlayerId, kind: &str) {
        debug!(%player, kind, "Ore discovered");
    }

    fn backpack_full(&self, player: PlayerId, capacity: u32) {
        debug!(%player, capacity, "Backpack full");
    }

    fn sold(&self, player: PlayerId, amount: u64, currency: u64) {
        debug!(%player, amount, currency, "Backpack sold");
    }

    fn egg_granted(&self, player: PlayerId, egg: &EggDescriptor) {
        debug!(%player, egg_id = %egg.id, rarity = ?egg.rarity, "Egg granted");
    }

    fn egg_placed(&self, player: PlayerId, state: &IncubatorState) {
        debug!(
            %player,
            structure_id = %state.structure_id,
            egg_id = %state.egg_id,
            hatch_duration_seconds = state.hatch_duration_seconds,
            "Egg placed"
        );
    }

    fn hatched(
        &self,
        player: PlayerId,
        structure: StructureId,
        unit: &UnitDescriptor,
        first_discovery: bool,
    ) {
        debug!(
            %player,
            structure_id = %structure,
            unit_id = %unit.id,
            species_id = %unit.species_id,
            first_discovery,
            "Egg hatched"
        );
    }

    fn unit_placed(&self, player: PlayerId, state: &PenState) {
        debug!(
            %player,
            structure_id = %state.structure_id,
            unit_id = %state.unit_id,
            "Unit placed"
        );
    }

    fn income_collected(&self, player: PlayerId, structure: StructureId, amount: u64, currency: u64) {
        debug!(%player, structure_id = %structure, amount, currency, "Income collected");
    }

    fn record_saved(&self, player: PlayerId, ok: bool) {
        if ok {
            debug!(%player, "Record saved");
        } else {
            warn!(%player, "Record save failed");
        }
    }
}

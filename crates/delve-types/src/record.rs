//! The durable, versioned player record and its progression sub-record.
//!
//! [`PlayerRecord`] is the single value written to storage per player. Every
//! field defaults when absent, so a record written by an older schema
//! deserializes without error; the migration layer in `delve-db` then
//! remaps deprecated fields and stamps [`CURRENT_SCHEMA_VERSION`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{EggId, StructureId, UnitId};
use crate::structs::{
    EggDescriptor, IncubatorState, InventorySnapshot, OreBucket, PenState, StructureStates,
    UnitDescriptor,
};

/// Schema version stamped on every save.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Lifetime statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ProgressionStats {
    /// Ores mined into the backpack.
    pub blocks_mined: u64,
    /// Currency earned from selling and pen collection.
    pub cash_earned: u64,
    /// Distinct species discovered.
    pub species_found: u32,
    /// Deepest depth reached while mining.
    pub deepest_depth: u32,
    /// Total seconds spent in session.
    pub play_time_seconds: u64,
}

/// Levels, discoveries, and statistics: everything in a record that is
/// neither inventory nor structure state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    /// Highest pickaxe level owned.
    pub pickaxe_level: u32,
    /// Highest backpack level owned.
    pub backpack_level: u32,
    /// Pickaxe level currently equipped.
    pub equipped_pickaxe: u32,
    /// Backpack level currently equipped; selects backpack capacity.
    pub equipped_backpack: u32,
    /// Deepest world layer reached.
    pub max_layer_reached: u32,
    /// Number of units hatched per species.
    pub species_counts: BTreeMap<String, u32>,
    /// Ore kinds ever mined.
    pub discovered_ore_ids: BTreeMap<String, bool>,
    /// Species ever hatched.
    pub discovered_species_ids: BTreeMap<String, bool>,
    /// Lifetime statistics.
    pub stats: ProgressionStats,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            pickaxe_level: 1,
            backpack_level: 1,
            equipped_pickaxe: 1,
            equipped_backpack: 1,
            max_layer_reached: 1,
            species_counts: BTreeMap::new(),
            discovered_ore_ids: BTreeMap::new(),
            discovered_species_ids: BTreeMap::new(),
            stats: ProgressionStats::default(),
        }
    }
}

impl Progression {
    /// Mark an ore kind as discovered. Returns `true` the first time.
    pub fn discover_ore(&mut self, ore: &str) -> bool {
        self.discovered_ore_ids.insert(ore.to_owned(), true) != Some(true)
    }

    /// Record one hatch of `species`. Returns `true` if this is the first
    /// time the species has been discovered.
    pub fn record_hatch(&mut self, species: &str) -> bool {
        let count = self.species_counts.entry(species.to_owned()).or_insert(0);
        *count = count.saturating_add(1);

        let first = self.discovered_species_ids.insert(species.to_owned(), true) != Some(true);
        if first {
            self.stats.species_found = self.stats.species_found.saturating_add(1);
        }
        first
    }

    /// Whether `species` has been discovered.
    pub fn has_species(&self, species: &str) -> bool {
        self.discovered_species_ids.get(species).copied().unwrap_or(false)
    }
}

/// The persisted aggregate for one player.
///
/// Inventory counters are stored flat at the top level; see the
/// `delve-economy` ledger for their invariants.
///
/// A document decoded directly with serde reports [`CURRENT_SCHEMA_VERSION`]
/// when its `version` is missing, because absent fields take their
/// defaults. Read stored documents through `delve_db::migrate`, which
/// inspects the raw version before decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlayerRecord {
    /// Schema version this record was written with.
    pub version: u32,
    /// Spendable currency.
    pub currency: u64,
    /// Backpack slots in use.
    pub storage_used: u32,
    /// Summed sale value of the backpack.
    pub inventory_value: u64,
    /// Backpack contents grouped by ore kind.
    pub ore_breakdown: BTreeMap<String, OreBucket>,
    /// Highest pickaxe level owned.
    pub pickaxe_level: u32,
    /// Highest backpack level owned.
    pub backpack_level: u32,
    /// Pickaxe level equipped.
    pub equipped_pickaxe: u32,
    /// Backpack level equipped.
    pub equipped_backpack: u32,
    /// Deepest world layer reached.
    pub max_layer_reached: u32,
    /// Hatch count per species.
    pub species_counts: BTreeMap<String, u32>,
    /// Ore kinds ever mined.
    pub discovered_ore_ids: BTreeMap<String, bool>,
    /// Species ever hatched.
    pub discovered_species_ids: BTreeMap<String, bool>,
    /// Lifetime statistics.
    pub stats: ProgressionStats,
    /// When the record was last written (Unix seconds, 0 if never).
    pub last_saved_at: i64,
    /// Eggs held, keyed by GUID.
    pub egg_inventory: BTreeMap<EggId, EggDescriptor>,
    /// Units held, keyed by GUID.
    pub unit_inventory: BTreeMap<UnitId, UnitDescriptor>,
    /// Occupied incubators.
    pub incubator_states: BTreeMap<StructureId, IncubatorState>,
    /// Occupied pens.
    pub pen_states: BTreeMap<StructureId, PenState>,
    /// Opaque tutorial blob owned by the tutorial collaborator.
    #[ts(type = "unknown")]
    pub tutorial_state: serde_json::Value,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self::from_parts(
            InventorySnapshot::default(),
            StructureStates::default(),
            Progression::default(),
            serde_json::Value::Null,
            0,
        )
    }
}

impl PlayerRecord {
    /// Assemble a record from its live sub-states, stamped with the
    /// current schema version.
    pub fn from_parts(
        inventory: InventorySnapshot,
        structures: StructureStates,
        progression: Progression,
        tutorial_state: serde_json::Value,
        last_saved_at: i64,
    ) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            currency: inventory.currency,
            storage_used: inventory.storage_used,
            inventory_value: inventory.inventory_value,
            ore_breakdown: inventory.ore_breakdown,
            pickaxe_level: progression.pickaxe_level,
            backpack_level: progression.backpack_level,
            equipped_pickaxe: progression.equipped_pickaxe,
            equipped_backpack: progression.equipped_backpack,
            max_layer_reached: progression.max_layer_reached,
            species_counts: progression.species_counts,
            discovered_ore_ids: progression.discovered_ore_ids,
            discovered_species_ids: progression.discovered_species_ids,
            stats: progression.stats,
            last_saved_at,
            egg_inventory: inventory.eggs,
            unit_inventory: inventory.units,
            incubator_states: structures.incubators,
            pen_states: structures.pens,
            tutorial_state,
        }
    }

    /// Split the record into the sub-states handed to each collaborator.
    pub fn into_parts(
        self,
    ) -> (InventorySnapshot, StructureStates, Progression, serde_json::Value) {
        let inventory = InventorySnapshot {
            currency: self.currency,
            storage_used: self.storage_used,
            inventory_value: self.inventory_value,
            ore_breakdown: self.ore_breakdown,
            eggs: self.egg_inventory,
            units: self.unit_inventory,
        };
        let structures = StructureStates {
            incubators: self.incubator_states,
            pens: self.pen_states,
        };
        let progression = Progression {
            pickaxe_level: self.pickaxe_level,
            backpack_level: self.backpack_level,
            equipped_pickaxe: self.equipped_pickaxe,
            equipped_backpack: self.equipped_backpack,
            max_layer_reached: self.max_layer_reached,
            species_counts: self.species_counts,
            discovered_ore_ids: self.discovered_ore_ids,
            discovered_species_ids: self.discovered_species_ids,
            stats: self.stats,
        };
        (inventory, structures, progression, self.tutorial_state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_documented_baseline() {
        let record = PlayerRecord::default();
        assert_eq!(record.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(record.currency, 0);
        assert_eq!(record.pickaxe_level, 1);
        assert_eq!(record.backpack_level, 1);
        assert_eq!(record.equipped_backpack, 1);
        assert!(record.ore_breakdown.is_empty());
        assert!(record.egg_inventory.is_empty());
        assert!(record.pen_states.is_empty());
    }

    #[test]
    fn missing_fields_default_instead_of_failing() {
        let record: PlayerRecord = serde_json::from_str(r#"{"currency": 42}"#).unwrap();
        assert_eq!(record.currency, 42);
        assert_eq!(record.backpack_level, 1);
        assert!(record.unit_inventory.is_empty());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(PlayerRecord::default()).unwrap();
        assert!(json.get("storageUsed").is_some());
        assert!(json.get("equippedBackpack").is_some());
        assert!(json.get("incubatorStates").is_some());
        assert!(json.get("stats").and_then(|s| s.get("playTimeSeconds")).is_some());
    }

    #[test]
    fn parts_survive_split_and_reassembly() {
        let mut record = PlayerRecord::default();
        record.currency = 900;
        record.max_layer_reached = 4;
        record.tutorial_state = serde_json::json!({"step": 3});

        let (inventory, structures, progression, tutorial) = record.clone().into_parts();
        let rebuilt = PlayerRecord::from_parts(inventory, structures, progression, tutorial, 0);
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn species_discovery_is_first_time_only() {
        let mut progression = Progression::default();
        assert!(progression.record_hatch("mole"));
        assert!(!progression.record_hatch("mole"));
        assert_eq!(progression.species_counts.get("mole").copied(), Some(2));
        assert_eq!(progression.stats.species_found, 1);
        assert!(progression.has_species("mole"));
    }

    #[test]
    fn ore_discovery_is_first_time_only() {
        let mut progression = Progression::default();
        assert!(progression.discover_ore("copper"));
        assert!(!progression.discover_ore("copper"));
    }
}

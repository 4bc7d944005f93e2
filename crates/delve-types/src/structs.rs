//! Descriptors, structure states, and inventory snapshots.
//!
//! All timestamps are Unix seconds (`i64`). Field names serialize in
//! camelCase to match the persisted record layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Rarity, Variant};
use crate::ids::{EggId, StructureId, UnitId};

// ---------------------------------------------------------------------------
// Unique game objects
// ---------------------------------------------------------------------------

/// An egg held by a player.
///
/// Eggs are immutable. An egg is consumed exactly once, when it is placed
/// into an incubator; cancelling the incubation hands the same descriptor
/// back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EggDescriptor {
    /// Egg GUID.
    pub id: EggId,
    /// Rarity tier, which fixes hatch duration and species pool.
    pub rarity: Rarity,
    /// Variant inherited by the hatched unit.
    pub variant: Variant,
    /// When the egg was acquired (Unix seconds).
    pub acquired_at: i64,
}

/// A hatched unit held by a player.
///
/// Units are only ever created by a completed hatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UnitDescriptor {
    /// Unit GUID.
    pub id: UnitId,
    /// Catalog species identifier.
    pub species_id: String,
    /// Rarity inherited from the egg.
    pub rarity: Rarity,
    /// Variant inherited from the egg.
    pub variant: Variant,
    /// Unit level (starts at 1).
    pub level: u32,
    /// When the unit hatched (Unix seconds).
    pub hatched_at: i64,
}

// ---------------------------------------------------------------------------
// Structure states
// ---------------------------------------------------------------------------

/// An occupied incubator.
///
/// At most one exists per structure. The embedded descriptor is the exact
/// egg removed from inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct IncubatorState {
    /// The incubator holding the egg.
    pub structure_id: StructureId,
    /// GUID of the embedded egg.
    pub egg_id: EggId,
    /// The embedded egg.
    pub egg: EggDescriptor,
    /// When incubation started (Unix seconds).
    pub start_time: i64,
    /// Seconds from start until the egg is ready.
    pub hatch_duration_seconds: u64,
}

/// An occupied pen.
///
/// At most one exists per structure. Income per second is derived from the
/// embedded unit and the catalog; it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PenState {
    /// The pen holding the unit.
    pub structure_id: StructureId,
    /// GUID of the embedded unit.
    pub unit_id: UnitId,
    /// The embedded unit.
    pub unit: UnitDescriptor,
    /// When the unit was placed (Unix seconds).
    pub placed_time: i64,
    /// When income was last collected (Unix seconds).
    pub last_collect_time: i64,
}

/// Incubator and pen states for one player, keyed by structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StructureStates {
    /// Occupied incubators.
    pub incubators: BTreeMap<StructureId, IncubatorState>,
    /// Occupied pens.
    pub pens: BTreeMap<StructureId, PenState>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Per-ore-kind bucket in the backpack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct OreBucket {
    /// Number of ores of this kind held.
    pub qty: u32,
    /// Summed sale value of this kind.
    pub total_value: u64,
    /// Value of one ore, fixed at first insertion.
    pub unit_value: u64,
}

/// Everything the inventory ledger owns, as a detached value.
///
/// Produced by the ledger before a save and applied back after a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InventorySnapshot {
    /// Spendable currency.
    pub currency: u64,
    /// Backpack slots in use (one per ore).
    pub storage_used: u32,
    /// Summed sale value of everything in the backpack.
    pub inventory_value: u64,
    /// Backpack contents grouped by ore kind.
    pub ore_breakdown: BTreeMap<String, OreBucket>,
    /// Eggs held, keyed by GUID.
    pub eggs: BTreeMap<EggId, EggDescriptor>,
    /// Units held, keyed by GUID.
    pub units: BTreeMap<UnitId, UnitDescriptor>,
}

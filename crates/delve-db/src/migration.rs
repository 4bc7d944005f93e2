//! Schema migration for stored player records.
//!
//! Stored documents are brought to [`CURRENT_SCHEMA_VERSION`] in three
//! passes over the raw JSON:
//!
//! 1. **Upgrade**: version-specific remaps of deprecated fields.
//! 2. **Decode**: field-by-field, so one malformed field (or one malformed
//!    map entry) is dropped and defaulted instead of failing the record.
//! 3. **Normalize**: repair cross-field invariants (levels, map keys,
//!    descriptor ownership, backpack counters).
//!
//! Migration is idempotent: migrating an already-current record yields the
//! same record. The only rejection is a record written by a newer schema.
//!
//! # Version history
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | Initial layout; no `version` field, no equipped levels. |
//! | 2 | `equippedPickaxe` / `equippedBackpack` added, default to owned level. |
//! | 3 | Top-level statistics moved under `stats`. |

use std::collections::BTreeMap;

use delve_types::{CURRENT_SCHEMA_VERSION, OreBucket, PlayerRecord, ProgressionStats};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::MigrationError;

/// Statistics stored at the top level before version 3.
const LEGACY_STAT_KEYS: [&str; 5] = [
    "blocksMined",
    "cashEarned",
    "speciesFound",
    "deepestDepth",
    "playTimeSeconds",
];

/// Breakdown bucket holding backpack counters stored without a breakdown.
pub const UNSORTED_ORE_KIND: &str = "unsorted";

/// A record brought to the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migrated {
    /// The migrated record, stamped with [`CURRENT_SCHEMA_VERSION`].
    pub record: PlayerRecord,
    /// Version the stored document was written with (0 if unreadable).
    pub from_version: u32,
    /// Fields or map entries that were dropped or repaired.
    pub recovered_fields: Vec<String>,
}

impl Migrated {
    /// Whether the stored document needed any repair.
    pub fn recovered(&self) -> bool {
        !self.recovered_fields.is_empty()
    }
}

/// Migrate a raw stored document to the current schema.
pub fn migrate(raw: Value) -> Result<Migrated, MigrationError> {
    let Value::Object(mut doc) = raw else {
        tracing::warn!("Stored record is not a JSON object, using defaults");
        return Ok(Migrated {
            record: PlayerRecord::default(),
            from_version: 0,
            recovered_fields: vec!["$root".to_owned()],
        });
    };

    let mut recovered = Vec::new();
    let from_version = read_version(&doc, &mut recovered)?;

    if from_version < 2 {
        upgrade_v1_to_v2(&mut doc);
    }
    if from_version < 3 {
        upgrade_v2_to_v3(&mut doc);
    }

    let mut record = decode(doc, &mut recovered);
    normalize(&mut record, &mut recovered);
    record.version = CURRENT_SCHEMA_VERSION;

    if !recovered.is_empty() {
        tracing::warn!(
            from_version,
            fields = ?recovered,
            "Recovered malformed fields while migrating record"
        );
    }
    if from_version != CURRENT_SCHEMA_VERSION {
        tracing::debug!(
            from_version,
            to_version = CURRENT_SCHEMA_VERSION,
            "Migrated record"
        );
    }

    Ok(Migrated {
        record,
        from_version,
        recovered_fields: recovered,
    })
}

fn read_version(doc: &Map<String, Value>, recovered: &mut Vec<String>) -> Result<u32, MigrationError> {
    let Some(raw) = doc.get("version") else {
        return Ok(1);
    };
    let Some(found) = raw.as_u64() else {
        recovered.push("version".to_owned());
        return Ok(1);
    };
    match u32::try_from(found) {
        Ok(v) if v <= CURRENT_SCHEMA_VERSION => Ok(v.max(1)),
        _ => Err(MigrationError::FutureVersion {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        }),
    }
}

// =========================================================================
// Upgrades
// =========================================================================

/// Equipped levels did not exist; players had their best gear on.
fn upgrade_v1_to_v2(doc: &mut Map<String, Value>) {
    for (owned, equipped) in [
        ("pickaxeLevel", "equippedPickaxe"),
        ("backpackLevel", "equippedBackpack"),
    ] {
        if doc.contains_key(equipped) {
            continue;
        }
        if let Some(level) = doc.get(owned).cloned() {
            doc.insert(equipped.to_owned(), level);
        }
    }
}

/// Statistics moved from the top level into `stats`.
fn upgrade_v2_to_v3(doc: &mut Map<String, Value>) {
    let mut moved = Map::new();
    for key in LEGACY_STAT_KEYS {
        if let Some(value) = doc.remove(key) {
            moved.insert(key.to_owned(), value);
        }
    }
    if moved.is_empty() {
        return;
    }

    let stats = doc
        .entry("stats")
        .or_insert_with(|| Value::Object(Map::new()));
    if !stats.is_object() {
        *stats = Value::Object(Map::new());
    }
    if let Value::Object(stats) = stats {
        for (key, value) in moved {
            stats.entry(key).or_insert(value);
        }
    }
}

// =========================================================================
// Lenient decode
// =========================================================================

fn decode(mut doc: Map<String, Value>, recovered: &mut Vec<String>) -> PlayerRecord {
    let mut record = PlayerRecord::default();

    macro_rules! scalar {
        ($field:ident, $key:literal) => {
            if let Some(value) = doc.remove($key) {
                match serde_json::from_value(value) {
                    Ok(decoded) => record.$field = decoded,
                    Err(_) => recovered.push($key.to_owned()),
                }
            }
        };
    }

    macro_rules! entries {
        ($field:ident, $key:literal) => {
            if let Some(value) = doc.remove($key) {
                record.$field = decode_entries(value, $key, recovered);
            }
        };
    }

    scalar!(currency, "currency");
    scalar!(storage_used, "storageUsed");
    scalar!(inventory_value, "inventoryValue");
    scalar!(pickaxe_level, "pickaxeLevel");
    scalar!(backpack_level, "backpackLevel");
    scalar!(equipped_pickaxe, "equippedPickaxe");
    scalar!(equipped_backpack, "equippedBackpack");
    scalar!(max_layer_reached, "maxLayerReached");
    scalar!(last_saved_at, "lastSavedAt");

    entries!(ore_breakdown, "oreBreakdown");
    entries!(species_counts, "speciesCounts");
    entries!(discovered_ore_ids, "discoveredOreIds");
    entries!(discovered_species_ids, "discoveredSpeciesIds");
    entries!(egg_inventory, "eggInventory");
    entries!(unit_inventory, "unitInventory");
    entries!(incubator_states, "incubatorStates");
    entries!(pen_states, "penStates");

    if let Some(stats) = doc.remove("stats") {
        record.stats = decode_stats(stats, recovered);
    }
    if let Some(tutorial) = doc.remove("tutorialState") {
        record.tutorial_state = tutorial;
    }

    record
}

/// Decode lifetime statistics one counter at a time.
fn decode_stats(value: Value, recovered: &mut Vec<String>) -> ProgressionStats {
    let mut stats = ProgressionStats::default();
    let Value::Object(mut map) = value else {
        if !value.is_null() {
            recovered.push("stats".to_owned());
        }
        return stats;
    };

    macro_rules! stat {
        ($field:ident, $key:literal) => {
            if let Some(value) = map.remove($key) {
                match serde_json::from_value(value) {
                    Ok(decoded) => stats.$field = decoded,
                    Err(_) => recovered.push(concat!("stats.", $key).to_owned()),
                }
            }
        };
    }

    stat!(blocks_mined, "blocksMined");
    stat!(cash_earned, "cashEarned");
    stat!(species_found, "speciesFound");
    stat!(deepest_depth, "deepestDepth");
    stat!(play_time_seconds, "playTimeSeconds");

    stats
}

/// Decode a JSON object entry by entry, dropping entries that fail.
fn decode_entries<K, V>(value: Value, field: &str, recovered: &mut Vec<String>) -> BTreeMap<K, V>
where
    K: DeserializeOwned + Ord,
    V: DeserializeOwned,
{
    let Value::Object(map) = value else {
        if !value.is_null() {
            recovered.push(field.to_owned());
        }
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (raw_key, raw_value) in map {
        let key = serde_json::from_value::<K>(Value::String(raw_key.clone()));
        let entry = serde_json::from_value::<V>(raw_value);
        match (key, entry) {
            (Ok(k), Ok(v)) => {
                out.insert(k, v);
            }
            _ => recovered.push(format!("{field}.{raw_key}")),
        }
    }
    out
}

// =========================================================================
// Normalization
// =========================================================================

fn normalize(record: &mut PlayerRecord, recovered: &mut Vec<String>) {
    normalize_levels(record, recovered);
    normalize_descriptor_keys(record, recovered);
    normalize_occupancy(record, recovered);
    normalize_backpack(record, recovered);
}

fn normalize_levels(record: &mut PlayerRecord, recovered: &mut Vec<String>) {
    for (key, level) in [
        ("pickaxeLevel", &mut record.pickaxe_level),
        ("backpackLevel", &mut record.backpack_level),
        ("maxLayerReached", &mut record.max_layer_reached),
    ] {
        if *level == 0 {
            *level = 1;
            recovered.push(key.to_owned());
        }
    }

    // Zero means "never set"; anything above the owned level is clamped.
    for (key, equipped, owned) in [
        ("equippedPickaxe", &mut record.equipped_pickaxe, record.pickaxe_level),
        ("equippedBackpack", &mut record.equipped_backpack, record.backpack_level),
    ] {
        if *equipped == 0 {
            *equipped = owned;
        } else if *equipped > owned {
            *equipped = owned;
            recovered.push(key.to_owned());
        }
    }
}

/// Descriptors are the source of truth for their own identity.
fn normalize_descriptor_keys(record: &mut PlayerRecord, recovered: &mut Vec<String>) {
    let eggs = std::mem::take(&mut record.egg_inventory);
    for (key, egg) in eggs {
        if key != egg.id {
            recovered.push(format!("eggInventory.{key}"));
        }
        record.egg_inventory.insert(egg.id, egg);
    }

    let units = std::mem::take(&mut record.unit_inventory);
    for (key, unit) in units {
        if key != unit.id {
            recovered.push(format!("unitInventory.{key}"));
        }
        record.unit_inventory.insert(unit.id, unit);
    }

    for (key, state) in &mut record.incubator_states {
        if state.structure_id != *key || state.egg_id != state.egg.id {
            state.structure_id = *key;
            state.egg_id = state.egg.id;
            recovered.push(format!("incubatorStates.{key}"));
        }
    }

    for (key, state) in &mut record.pen_states {
        if state.structure_id != *key || state.unit_id != state.unit.id {
            state.structure_id = *key;
            state.unit_id = state.unit.id;
            recovered.push(format!("penStates.{key}"));
        }
    }
}

/// An egg or unit lives in exactly one place; a structure wins over inventory.
fn normalize_occupancy(record: &mut PlayerRecord, recovered: &mut Vec<String>) {
    for state in record.incubator_states.values() {
        if record.egg_inventory.remove(&state.egg_id).is_some() {
            recovered.push(format!("eggInventory.{}", state.egg_id));
        }
    }
    for state in record.pen_states.values() {
        if record.unit_inventory.remove(&state.unit_id).is_some() {
            recovered.push(format!("unitInventory.{}", state.unit_id));
        }
    }
}

/// Backpack counters must equal the sums over the ore breakdown.
///
/// Counters stored without any breakdown are kept and moved into a single
/// [`UNSORTED_ORE_KIND`] bucket; a value with no slot in use occupies one.
fn normalize_backpack(record: &mut PlayerRecord, recovered: &mut Vec<String>) {
    let before = record.ore_breakdown.len();
    record.ore_breakdown.retain(|_, bucket| bucket.qty > 0);
    if record.ore_breakdown.len() != before {
        recovered.push("oreBreakdown".to_owned());
    }

    if record.ore_breakdown.is_empty() && (record.storage_used > 0 || record.inventory_value > 0) {
        let qty = record.storage_used.max(1);
        if qty != record.storage_used {
            record.storage_used = qty;
            recovered.push("storageUsed".to_owned());
        }
        let unit_value = record
            .inventory_value
            .checked_div(u64::from(qty))
            .unwrap_or(0);
        record.ore_breakdown.insert(
            UNSORTED_ORE_KIND.to_owned(),
            OreBucket {
                qty,
                total_value: record.inventory_value,
                unit_value,
            },
        );
        recovered.push("oreBreakdown".to_owned());
        return;
    }

    let storage_used = record
        .ore_breakdown
        .values()
        .fold(0_u32, |acc, bucket| acc.saturating_add(bucket.qty));
    let inventory_value = record
        .ore_breakdown
        .values()
        .fold(0_u64, |acc, bucket| acc.saturating_add(bucket.total_value));

    if record.storage_used != storage_used {
        record.storage_used = storage_used;
        recovered.push("storageUsed".to_owned());
    }
    if record.inventory_value != inventory_value {
        record.inventory_value = inventory_value;
        recovered.push("inventoryValue".to_owned());
    }
}

//! Shared type definitions for the Delve player economy.
//!
//! This crate is the single source of truth for the persisted player record
//! and every value that crosses a crate boundary. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the client UI.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for players and unique game objects
//! - [`enums`] -- Rarity, variant, structure kind, and decline reasons
//! - [`structs`] -- Egg/unit descriptors, structure states, inventory snapshot
//! - [`record`] -- The versioned [`PlayerRecord`] and its progression sub-record

pub mod enums;
pub mod ids;
pub mod record;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{DeclineReason, Rarity, StructureKind, Variant};
pub use ids::{EggId, PlayerId, StructureId, UnitId};
pub use record::{CURRENT_SCHEMA_VERSION, PlayerRecord, Progression, ProgressionStats};
pub use structs::{
    EggDescriptor, IncubatorState, InventorySnapshot, OreBucket, PenState, StructureStates,
    UnitDescriptor,
};

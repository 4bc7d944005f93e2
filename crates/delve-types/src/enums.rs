//! Enumeration types shared by the economy, structure, and persistence crates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Rarity
// ---------------------------------------------------------------------------

/// Rarity tier of an egg and of the species it can hatch into.
///
/// Rarity drives hatch duration and the pool of species a hatch rolls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Most frequent drop.
    Common,
    /// Slightly rarer drop.
    Uncommon,
    /// Rare drop.
    Rare,
    /// Epic drop.
    Epic,
    /// Legendary drop.
    Legendary,
    /// Rarest tier.
    Mythic,
}

impl Rarity {
    /// Every rarity in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
    ];
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Cosmetic variant carried by an egg and inherited by the unit it hatches.
///
/// Variants scale pen income through a configured multiplier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Variant {
    /// The plain variant.
    #[default]
    Normal,
    /// Gold-tinted variant.
    Golden,
    /// Rainbow variant.
    Rainbow,
}

impl Variant {
    /// Every variant.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Golden, Self::Rainbow];
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// The kind of a placed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StructureKind {
    /// Holds one egg until it is ready to hatch.
    Incubator,
    /// Holds one unit that accrues currency over time.
    Pen,
}

// ---------------------------------------------------------------------------
// Decline reasons
// ---------------------------------------------------------------------------

/// Why a mutating gameplay operation was declined.
///
/// Domain failures are never exceptional: every operation either succeeds
/// or declines with one of these reasons, which the UI layer can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DeclineReason {
    /// The backpack, unit inventory, or another bounded container is full.
    CapacityExceeded,
    /// The caller does not own the target structure.
    OwnershipViolation,
    /// The referenced egg, unit, structure, or player does not exist.
    NotFound,
    /// The structure already holds an item.
    DuplicateOccupancy,
    /// The structure is empty.
    NotOccupied,
    /// The incubator is still counting down.
    NotReady,
    /// The pen has not accrued anything since the last collection.
    NothingToCollect,
    /// The operation targets the wrong kind of structure.
    WrongStructureKind,
    /// A counter would overflow.
    ArithmeticOverflow,
}

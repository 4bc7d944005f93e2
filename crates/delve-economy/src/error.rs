//! Error types for the delve-economy crate.
//!
//! Every failure here is a declined operation, not a fault: the ledger is
//! left exactly as it was before the call.

use delve_types::{DeclineReason, EggId, UnitId};

/// Errors that can occur during inventory ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// The backpack has no free slot at the equipped level.
    #[error("backpack full: {storage_used} of {capacity} slots used")]
    BackpackFull {
        /// Slots currently in use.
        storage_used: u32,
        /// Capacity at the equipped backpack level.
        capacity: u32,
    },

    /// The unit inventory is at its limit.
    #[error("unit inventory full: holding {held} of {capacity}")]
    UnitCapacityFull {
        /// Units currently held.
        held: usize,
        /// Maximum units a player may hold.
        capacity: u32,
    },

    /// The egg is not in the inventory.
    #[error("egg not found in inventory: {0}")]
    EggNotFound(EggId),

    /// The unit is not in the inventory.
    #[error("unit not found in inventory: {0}")]
    UnitNotFound(UnitId),

    /// An egg with the same GUID is already held.
    #[error("egg already in inventory: {0}")]
    DuplicateEgg(EggId),

    /// A unit with the same GUID is already held.
    #[error("unit already in inventory: {0}")]
    DuplicateUnit(UnitId),

    /// A counter would overflow.
    #[error("arithmetic overflow in inventory computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// The backpack capacity table is empty or decreasing.
    #[error("invalid backpack capacity table: {reason}")]
    InvalidCapacityTable {
        /// Why the table was rejected.
        reason: String,
    },
}

impl InventoryError {
    /// The player-facing decline reason for this error.
    pub const fn reason(&self) -> DeclineReason {
        match self {
            Self::BackpackFull { .. } | Self::UnitCapacityFull { .. } => {
                DeclineReason::CapacityExceeded
            }
            Self::EggNotFound(_) | Self::UnitNotFound(_) => DeclineReason::NotFound,
            Self::DuplicateEgg(_) | Self::DuplicateUnit(_) => DeclineReason::DuplicateOccupancy,
            Self::ArithmeticOverflow { .. } | Self::InvalidCapacityTable { .. } => {
                DeclineReason::ArithmeticOverflow
            }
        }
    }
}

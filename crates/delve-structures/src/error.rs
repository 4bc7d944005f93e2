//! Error types for the `delve-structures` crate.
//!
//! Every variant is a declined interaction; [`StructureError::reason`] maps
//! it onto the shared [`DeclineReason`] taxonomy.

use delve_economy::InventoryError;
use delve_types::{DeclineReason, StructureId, StructureKind};

/// Errors that can occur during incubator and pen operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// The player does not own the structure.
    #[error("structure {0} is not owned by this player")]
    NotOwner(StructureId),

    /// The structure exists but is the wrong kind for the operation.
    #[error("structure {structure} is a {actual:?}, expected {expected:?}")]
    WrongKind {
        /// The targeted structure.
        structure: StructureId,
        /// Kind the operation needs.
        expected: StructureKind,
        /// Kind the structure actually is.
        actual: StructureKind,
    },

    /// The structure already holds an egg or unit.
    #[error("structure {0} is already occupied")]
    Occupied(StructureId),

    /// The structure is empty.
    #[error("structure {0} is empty")]
    Empty(StructureId),

    /// The incubator is still counting down.
    #[error("incubator {structure} not ready: {remaining_seconds}s remaining")]
    NotReady {
        /// The incubator.
        structure: StructureId,
        /// Seconds until the egg can hatch.
        remaining_seconds: u64,
    },

    /// The pen has accrued nothing since the last collection.
    #[error("nothing to collect from pen {0}")]
    NothingToCollect(StructureId),

    /// An inventory operation declined.
    #[error("inventory declined: {0}")]
    Inventory(#[from] InventoryError),

    /// Removing a unit from a pen collected income but could not return the
    /// unit to inventory. The unit stays in the pen; the income is kept.
    #[error("unit stays in pen {structure} ({collected} collected): {source}")]
    RemoveBlocked {
        /// The pen.
        structure: StructureId,
        /// Currency credited before the return was attempted.
        collected: u64,
        /// Why the inventory refused the unit.
        source: InventoryError,
    },

    /// A time or income computation overflowed.
    #[error("arithmetic overflow in structure computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}

impl StructureError {
    /// The player-facing decline reason for this error.
    pub const fn reason(&self) -> DeclineReason {
        match self {
            Self::NotOwner(_) => DeclineReason::OwnershipViolation,
            Self::WrongKind { .. } => DeclineReason::WrongStructureKind,
            Self::Occupied(_) => DeclineReason::DuplicateOccupancy,
            Self::Empty(_) => DeclineReason::NotOccupied,
            Self::NotReady { .. } => DeclineReason::NotReady,
            Self::NothingToCollect(_) => DeclineReason::NothingToCollect,
            Self::Inventory(source) | Self::RemoveBlocked { source, .. } => source.reason(),
            Self::ArithmeticOverflow { .. } => DeclineReason::ArithmeticOverflow,
        }
    }
}

/// Build an overflow error for the named computation.
pub(crate) fn overflow(context: &str) -> StructureError {
    StructureError::ArithmeticOverflow {
        context: context.to_owned(),
    }
}

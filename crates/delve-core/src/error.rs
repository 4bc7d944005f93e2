//! Error types for sessions and the persistence gateway.

use delve_db::StorageError;
use delve_economy::InventoryError;
use delve_structures::StructureError;
use delve_types::{DeclineReason, PlayerId};

/// A gameplay action on a live session was declined.
///
/// Declines are ordinary outcomes: the session is unchanged (apart from
/// the documented pen-removal asymmetry) and [`reason`](Self::reason)
/// tells the caller why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The inventory ledger declined.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// A structure declined.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// The requested equipment level is not owned.
    #[error("level {requested} is not owned (highest owned: {owned})")]
    LevelNotOwned {
        /// Level the caller asked to equip.
        requested: u32,
        /// Highest level the player owns.
        owned: u32,
    },
}

impl ActionError {
    /// Map the decline onto the wire-level reason taxonomy.
    pub const fn reason(&self) -> DeclineReason {
        match self {
            Self::Inventory(e) => e.reason(),
            Self::Structure(e) => e.reason(),
            Self::LevelNotOwned { .. } => DeclineReason::OwnershipViolation,
        }
    }
}

/// Errors from [`PersistenceGateway`](crate::gateway::PersistenceGateway)
/// operations that are not plain save results.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The player has no live session.
    #[error("player {0} has no live session")]
    NotJoined(PlayerId),

    /// The player already has a live session.
    #[error("player {0} already has a live session")]
    AlreadyJoined(PlayerId),

    /// The operation needs the player offline.
    #[error("player {0} is online")]
    PlayerOnline(PlayerId),

    /// Storage failed after retries.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

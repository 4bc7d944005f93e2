//! Capacity-gated inventory ledger for the Delve player economy.
//!
//! The ledger is pure in-memory state with no I/O. Mining, selling, and the
//! structure engine mutate it during a session; the persistence gateway
//! reads it back as an [`InventorySnapshot`](delve_types::InventorySnapshot)
//! before each save.
//!
//! # Modules
//!
//! - [`capacity`] -- Backpack capacity table and unit limit ([`InventoryLimits`])
//! - [`error`] -- Error types for ledger operations ([`InventoryError`])
//! - [`holdings`] -- Egg and unit holdings on the ledger
//! - [`ledger`] -- [`InventoryLedger`]: currency, backpack ores, sell

pub mod capacity;
pub mod error;
pub mod holdings;
pub mod ledger;

pub use capacity::{
    CapacityTable, DEFAULT_BACKPACK_CAPACITIES, DEFAULT_UNIT_CAPACITY, InventoryLimits,
};
pub use error::InventoryError;
pub use ledger::{InventoryLedger, OreAdded};

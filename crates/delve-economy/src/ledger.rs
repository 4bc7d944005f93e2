//! The per-player inventory ledger: currency, backpack ores, eggs, units.
//!
//! [`InventoryLedger`] is the live session truth for everything a player
//! carries. It is built from an [`InventorySnapshot`] after a load and
//! turned back into one before a save.
//!
//! # Invariants
//!
//! - `storage_used <= capacity(equipped_backpack)` after every successful
//!   [`add_ore`](InventoryLedger::add_ore). Lowering the equipped level never
//!   evicts ore; later additions simply decline until the player sells.
//! - Every failed mutation leaves the ledger unchanged.
//! - All arithmetic is checked -- no silent overflows, no panics.

use std::collections::BTreeMap;

use delve_types::{EggDescriptor, EggId, InventorySnapshot, OreBucket, UnitDescriptor, UnitId};

use crate::capacity::InventoryLimits;
use crate::error::InventoryError;

/// Result of a successful [`InventoryLedger::add_ore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OreAdded {
    /// Slots in use after the addition.
    pub storage_used: u32,
    /// Capacity at the equipped level.
    pub capacity: u32,
    /// Whether this ore opened a new bucket in the breakdown.
    pub new_bucket: bool,
}

/// Live inventory state for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLedger {
    pub(crate) currency: u64,
    pub(crate) storage_used: u32,
    pub(crate) inventory_value: u64,
    pub(crate) ore_breakdown: BTreeMap<String, OreBucket>,
    pub(crate) eggs: BTreeMap<EggId, EggDescriptor>,
    pub(crate) units: BTreeMap<UnitId, UnitDescriptor>,
    pub(crate) equipped_backpack: u32,
    pub(crate) limits: InventoryLimits,
}

impl InventoryLedger {
    /// Create an empty ledger at backpack level 1.
    pub fn new(limits: InventoryLimits) -> Self {
        Self::from_snapshot(InventorySnapshot::default(), 1, limits)
    }

    /// Rebuild a ledger from a persisted snapshot.
    ///
    /// The snapshot is applied as-is: a stored `storage_used` above the
    /// equipped capacity is kept and simply blocks further ore.
    pub fn from_snapshot(
        snapshot: InventorySnapshot,
        equipped_backpack: u32,
        limits: InventoryLimits,
    ) -> Self {
        Self {
            currency: snapshot.currency,
            storage_used: snapshot.storage_used,
            inventory_value: snapshot.inventory_value,
            ore_breakdown: snapshot.ore_breakdown,
            eggs: snapshot.eggs,
            units: snapshot.units,
            equipped_backpack,
            limits,
        }
    }

    /// Copy the ledger into a detached snapshot.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            currency: self.currency,
            storage_used: self.storage_used,
            inventory_value: self.inventory_value,
            ore_breakdown: self.ore_breakdown.clone(),
            eggs: self.eggs.clone(),
            units: self.units.clone(),
        }
    }

    // =========================================================================
    // Backpack
    // =========================================================================

    /// Backpack capacity at the equipped level.
    pub fn capacity(&self) -> u32 {
        self.limits.backpack.capacity(self.equipped_backpack)
    }

    /// Limits this ledger enforces.
    pub const fn limits(&self) -> &InventoryLimits {
        &self.limits
    }

    /// Backpack capacity at an arbitrary level.
    pub fn capacity_at(&self, level: u32) -> u32 {
        self.limits.backpack.capacity(level)
    }

    /// Equipped backpack level.
    pub const fn equipped_backpack(&self) -> u32 {
        self.equipped_backpack
    }

    /// Change the equipped backpack level. Never evicts ore.
    pub const fn set_equipped_backpack(&mut self, level: u32) {
        self.equipped_backpack = level;
    }

    /// Slots in use.
    pub const fn storage_used(&self) -> u32 {
        self.storage_used
    }

    /// Summed sale value of the backpack.
    pub const fn inventory_value(&self) -> u64 {
        self.inventory_value
    }

    /// Backpack contents grouped by ore kind.
    pub const fn ore_breakdown(&self) -> &BTreeMap<String, OreBucket> {
        &self.ore_breakdown
    }

    /// Whether the backpack has no free slot at the equipped level.
    pub fn is_full(&self) -> bool {
        self.storage_used >= self.capacity()
    }

    /// Put one ore of `kind` worth `value` into the backpack.
    ///
    /// A new bucket takes `value` as its unit value; later ores of the same
    /// kind only add to quantity and total.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::BackpackFull`] if no slot is free, or
    /// [`InventoryError::ArithmeticOverflow`] if a counter would overflow.
    /// The ledger is unchanged on error.
    pub fn add_ore(&mut self, kind: &str, value: u64) -> Result<OreAdded, InventoryError> {
        let capacity = self.capacity();
        if self.storage_used >= capacity {
            return Err(InventoryError::BackpackFull {
                storage_used: self.storage_used,
                capacity,
            });
        }

        // Compute every new counter before touching state.
        let storage_used = self
            .storage_used
            .checked_add(1)
            .ok_or_else(|| overflow("storage_used"))?;
        let inventory_value = self
            .inventory_value
            .checked_add(value)
            .ok_or_else(|| overflow("inventory_value"))?;
        let existing = self.ore_breakdown.get(kind);
        let new_bucket = existing.is_none();
        let bucket = match existing {
            Some(bucket) => OreBucket {
                qty: bucket.qty.checked_add(1).ok_or_else(|| overflow("ore qty"))?,
                total_value: bucket
                    .total_value
                    .checked_add(value)
                    .ok_or_else(|| overflow("ore total_value"))?,
                unit_value: bucket.unit_value,
            },
            None => OreBucket {
                qty: 1,
                total_value: value,
                unit_value: value,
            },
        };

        self.storage_used = storage_used;
        self.inventory_value = inventory_value;
        self.ore_breakdown.insert(kind.to_owned(), bucket);

        Ok(OreAdded {
            storage_used,
            capacity,
            new_bucket,
        })
    }

    /// Sell the whole backpack: move its value into currency and empty it.
    ///
    /// Returns the amount credited. Selling an empty backpack is a no-op
    /// returning zero.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::ArithmeticOverflow`] if currency would
    /// overflow. The ledger is unchanged on error.
    pub fn sell(&mut self) -> Result<u64, InventoryError> {
        if self.storage_used == 0 {
            return Ok(0);
        }

        let amount = self.inventory_value;
        self.currency = self
            .currency
            .checked_add(amount)
            .ok_or_else(|| overflow("currency on sell"))?;
        self.storage_used = 0;
        self.inventory_value = 0;
        self.ore_breakdown.clear();

        tracing::debug!(amount, currency = self.currency, "Backpack sold");
        Ok(amount)
    }

    // =========================================================================
    // Currency
    // =========================================================================

    /// Spendable currency.
    pub const fn currency(&self) -> u64 {
        self.currency
    }

    /// Credit `amount` to currency and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::ArithmeticOverflow`] if currency would
    /// overflow.
    pub fn add_currency(&mut self, amount: u64) -> Result<u64, InventoryError> {
        self.currency = self
            .currency
            .checked_add(amount)
            .ok_or_else(|| overflow("currency"))?;
        Ok(self.currency)
    }
}

/// Build an overflow error for the named counter.
pub(crate) fn overflow(context: &str) -> InventoryError {
    InventoryError::ArithmeticOverflow {
        context: context.to_owned(),
    }
}

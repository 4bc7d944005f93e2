//! Egg and unit holdings.
//!
//! Eggs and units are unique objects that move between the inventory and
//! structures. The ledger only ever inserts or removes whole descriptors;
//! callers moving an object insert at the destination before removing at
//! the source (or take from the source only once the destination is known
//! to accept), so a declined move never drops anything.

use std::collections::BTreeMap;

use delve_types::{EggDescriptor, EggId, UnitDescriptor, UnitId};

use crate::error::InventoryError;
use crate::ledger::InventoryLedger;

impl InventoryLedger {
    // =========================================================================
    // Eggs
    // =========================================================================

    /// Eggs held, keyed by GUID.
    pub const fn eggs(&self) -> &BTreeMap<EggId, EggDescriptor> {
        &self.eggs
    }

    /// Look up a held egg.
    pub fn egg(&self, id: EggId) -> Option<&EggDescriptor> {
        self.eggs.get(&id)
    }

    /// Add an egg. Eggs are not capacity-limited.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::DuplicateEgg`] if the GUID is already held.
    pub fn add_egg(&mut self, egg: EggDescriptor) -> Result<(), InventoryError> {
        if self.eggs.contains_key(&egg.id) {
            return Err(InventoryError::DuplicateEgg(egg.id));
        }
        self.eggs.insert(egg.id, egg);
        Ok(())
    }

    /// Remove and return an egg.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::EggNotFound`] if the egg is not held.
    pub fn take_egg(&mut self, id: EggId) -> Result<EggDescriptor, InventoryError> {
        self.eggs.remove(&id).ok_or(InventoryError::EggNotFound(id))
    }

    // =========================================================================
    // Units
    // =========================================================================

    /// Units held, keyed by GUID.
    pub const fn units(&self) -> &BTreeMap<UnitId, UnitDescriptor> {
        &self.units
    }

    /// Look up a held unit.
    pub fn unit(&self, id: UnitId) -> Option<&UnitDescriptor> {
        self.units.get(&id)
    }

    /// Maximum units held at once.
    pub const fn unit_capacity(&self) -> u32 {
        self.limits.unit_capacity
    }

    /// Check that one more unit fits.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnitCapacityFull`] if the inventory is at
    /// its unit limit.
    pub fn ensure_unit_room(&self) -> Result<(), InventoryError> {
        let capacity = self.limits.unit_capacity;
        let held = self.units.len();
        if held >= usize::try_from(capacity).unwrap_or(usize::MAX) {
            return Err(InventoryError::UnitCapacityFull { held, capacity });
        }
        Ok(())
    }

    /// Add a unit, enforcing the unit limit before insertion.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnitCapacityFull`] if the inventory is full,
    /// or [`InventoryError::DuplicateUnit`] if the GUID is already held.
    pub fn add_unit(&mut self, unit: UnitDescriptor) -> Result<(), InventoryError> {
        self.ensure_unit_room()?;
        if self.units.contains_key(&unit.id) {
            return Err(InventoryError::DuplicateUnit(unit.id));
        }
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Remove and return a unit.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnitNotFound`] if the unit is not held.
    pub fn take_unit(&mut self, id: UnitId) -> Result<UnitDescriptor, InventoryError> {
        self.units.remove(&id).ok_or(InventoryError::UnitNotFound(id))
    }
}

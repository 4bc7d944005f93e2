//! Per-player structure engine.
//!
//! [`StructureEngine`] owns one player's incubators and pens. Each operation
//! validates ownership, kind, and occupancy before touching the inventory,
//! and moves eggs and units transactionally: the destination accepts the
//! object before the source gives it up, so a declined operation leaves
//! both the inventory and the structure exactly as they were.

use std::collections::BTreeMap;

use rand::Rng;
use rust_decimal::Decimal;

use delve_economy::InventoryLedger;
use delve_types::{
    EggDescriptor, EggId, IncubatorState, PenState, StructureId, StructureKind, StructureStates,
    UnitDescriptor, UnitId,
};

use crate::catalog::Catalog;
use crate::error::StructureError;
use crate::{incubator, pen};

/// Result of removing a unit from a pen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedUnit {
    /// The unit, now back in inventory.
    pub unit: UnitDescriptor,
    /// Income collected on the way out (may be zero).
    pub collected: u64,
}

/// Result of releasing a structure's ownership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Released {
    /// Egg returned to inventory, if the incubator was occupied.
    pub egg: Option<EggDescriptor>,
    /// Unit returned to inventory, if the pen was occupied.
    pub unit: Option<RemovedUnit>,
}

/// One player's incubators and pens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureEngine {
    owned: BTreeMap<StructureId, StructureKind>,
    incubators: BTreeMap<StructureId, IncubatorState>,
    pens: BTreeMap<StructureId, PenState>,
}

impl StructureEngine {
    /// Create an engine with no structures.
    pub const fn new() -> Self {
        Self {
            owned: BTreeMap::new(),
            incubators: BTreeMap::new(),
            pens: BTreeMap::new(),
        }
    }

    /// Rebuild an engine from persisted states.
    ///
    /// Every structure with a state is owned. Each pen's `last_collect_time`
    /// is reset to `now` so no income is granted for time spent offline.
    ///
    /// Records persist occupancy, not ownership: an empty incubator or pen
    /// the player had claimed is not owned after a restore until plot
    /// placement claims it again with [`StructureEngine::claim`].
    pub fn restore(states: StructureStates, now: i64) -> Self {
        let mut engine = Self::new();
        for (id, state) in states.incubators {
            engine.owned.insert(id, StructureKind::Incubator);
            engine.incubators.insert(id, state);
        }
        for (id, mut state) in states.pens {
            state.last_collect_time = now;
            engine.owned.insert(id, StructureKind::Pen);
            engine.pens.insert(id, state);
        }
        engine
    }

    /// Copy out the current incubator and pen states.
    pub fn states(&self) -> StructureStates {
        StructureStates {
            incubators: self.incubators.clone(),
            pens: self.pens.clone(),
        }
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Register a structure placed by this player.
    ///
    /// Claiming an already-owned structure of the same kind is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::WrongKind`] if the structure is already
    /// owned as the other kind.
    pub fn claim(&mut self, id: StructureId, kind: StructureKind) -> Result<(), StructureError> {
        match self.owned.get(&id) {
            Some(&actual) if actual != kind => Err(StructureError::WrongKind {
                structure: id,
                expected: kind,
                actual,
            }),
            Some(_) => Ok(()),
            None => {
                self.owned.insert(id, kind);
                Ok(())
            }
        }
    }

    /// Give up a structure, returning whatever it holds to inventory.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotOwner`] if the structure is not owned, or
    /// [`StructureError::RemoveBlocked`] if an occupied pen's unit cannot be
    /// returned (the structure is then kept).
    pub fn release(
        &mut self,
        id: StructureId,
        ledger: &mut InventoryLedger,
        catalog: &Catalog,
        now: i64,
    ) -> Result<Released, StructureError> {
        let kind = self.kind_of(id)?;
        let mut released = Released::default();
        match kind {
            StructureKind::Incubator if self.incubators.contains_key(&id) => {
                released.egg = Some(self.cancel(id, ledger)?);
            }
            StructureKind::Pen if self.pens.contains_key(&id) => {
                released.unit = Some(self.remove_unit(id, ledger, catalog, now)?);
            }
            StructureKind::Incubator | StructureKind::Pen => {}
        }
        self.owned.remove(&id);
        Ok(released)
    }

    /// Kind of an owned structure.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotOwner`] if the structure is not owned.
    pub fn kind_of(&self, id: StructureId) -> Result<StructureKind, StructureError> {
        self.owned
            .get(&id)
            .copied()
            .ok_or(StructureError::NotOwner(id))
    }

    /// Owned structures and their kinds.
    pub const fn owned(&self) -> &BTreeMap<StructureId, StructureKind> {
        &self.owned
    }

    fn require(&self, id: StructureId, expected: StructureKind) -> Result<(), StructureError> {
        let actual = self.kind_of(id)?;
        if actual == expected {
            Ok(())
        } else {
            Err(StructureError::WrongKind {
                structure: id,
                expected,
                actual,
            })
        }
    }

    // =========================================================================
    // Incubators
    // =========================================================================

    /// The state of an occupied incubator.
    pub fn incubator(&self, id: StructureId) -> Option<&IncubatorState> {
        self.incubators.get(&id)
    }

    /// Place an egg from inventory into an empty incubator.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Occupied`, or
    /// `Inventory(EggNotFound)`. Nothing changes on error.
    pub fn place_egg(
        &mut self,
        id: StructureId,
        egg_id: EggId,
        ledger: &mut InventoryLedger,
        catalog: &Catalog,
        now: i64,
    ) -> Result<&IncubatorState, StructureError> {
        self.require(id, StructureKind::Incubator)?;
        if self.incubators.contains_key(&id) {
            return Err(StructureError::Occupied(id));
        }

        // The slot is known to be free, so taking the egg is the last
        // step that can fail.
        let egg = ledger.take_egg(egg_id)?;
        let duration = catalog.hatch_duration(egg.rarity);
        tracing::debug!(structure_id = %id, egg_id = %egg_id, duration, "Egg placed");
        Ok(self
            .incubators
            .entry(id)
            .or_insert(incubator::start(id, egg, duration, now)))
    }

    /// Seconds until the incubator's egg is ready.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, or `Empty`.
    pub fn time_remaining(&self, id: StructureId, now: i64) -> Result<u64, StructureError> {
        Ok(incubator::time_remaining(self.occupied_incubator(id)?, now))
    }

    /// Force the incubator's egg to be ready now.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, or `Empty`.
    pub fn speed_up(&mut self, id: StructureId, now: i64) -> Result<(), StructureError> {
        self.occupied_incubator(id)?;
        let state = self
            .incubators
            .get_mut(&id)
            .ok_or(StructureError::Empty(id))?;
        incubator::speed_up(state, now)
    }

    /// Abort incubation and hand the original egg back to inventory.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, or an inventory error
    /// if the egg cannot be re-added. Nothing changes on error.
    pub fn cancel(
        &mut self,
        id: StructureId,
        ledger: &mut InventoryLedger,
    ) -> Result<EggDescriptor, StructureError> {
        let egg = self.occupied_incubator(id)?.egg.clone();
        ledger.add_egg(egg.clone())?;
        self.incubators.remove(&id);
        tracing::debug!(structure_id = %id, egg_id = %egg.id, "Incubation cancelled");
        Ok(egg)
    }

    /// Hatch a ready egg into a new unit in inventory.
    ///
    /// The species is rolled uniformly among the catalog species sharing the
    /// egg's rarity. If the unit inventory is full the incubator stays ready
    /// and the hatch can be retried.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, `NotReady`, or
    /// `Inventory(UnitCapacityFull)`. Nothing changes on error.
    pub fn hatch<R: Rng + ?Sized>(
        &mut self,
        id: StructureId,
        ledger: &mut InventoryLedger,
        catalog: &Catalog,
        rng: &mut R,
        now: i64,
    ) -> Result<UnitDescriptor, StructureError> {
        let state = self.occupied_incubator(id)?;
        let remaining = incubator::time_remaining(state, now);
        if remaining > 0 {
            return Err(StructureError::NotReady {
                structure: id,
                remaining_seconds: remaining,
            });
        }
        ledger.ensure_unit_room()?;

        let species = catalog.roll_species(state.egg.rarity, rng);
        let unit = incubator::hatch_unit(&state.egg, species, now);
        ledger.add_unit(unit.clone())?;
        self.incubators.remove(&id);

        tracing::debug!(
            structure_id = %id,
            unit_id = %unit.id,
            species = unit.species_id.as_str(),
            "Egg hatched"
        );
        Ok(unit)
    }

    fn occupied_incubator(&self, id: StructureId) -> Result<&IncubatorState, StructureError> {
        self.require(id, StructureKind::Incubator)?;
        self.incubators.get(&id).ok_or(StructureError::Empty(id))
    }

    // =========================================================================
    // Pens
    // =========================================================================

    /// The state of an occupied pen.
    pub fn pen(&self, id: StructureId) -> Option<&PenState> {
        self.pens.get(&id)
    }

    /// Place a unit from inventory into an empty pen.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Occupied`, or
    /// `Inventory(UnitNotFound)`. Nothing changes on error.
    pub fn place_unit(
        &mut self,
        id: StructureId,
        unit_id: UnitId,
        ledger: &mut InventoryLedger,
        now: i64,
    ) -> Result<&PenState, StructureError> {
        self.require(id, StructureKind::Pen)?;
        if self.pens.contains_key(&id) {
            return Err(StructureError::Occupied(id));
        }

        let unit = ledger.take_unit(unit_id)?;
        tracing::debug!(structure_id = %id, unit_id = %unit_id, "Unit placed");
        Ok(self.pens.entry(id).or_insert(pen::place(id, unit, now)))
    }

    /// Income per second of an occupied pen.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, or on overflow.
    pub fn income_per_second(
        &self,
        id: StructureId,
        catalog: &Catalog,
    ) -> Result<Decimal, StructureError> {
        pen::income_per_second(self.occupied_pen(id)?, catalog)
    }

    /// Currency an occupied pen would pay out at `now`.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, or on overflow.
    pub fn pending_income(
        &self,
        id: StructureId,
        catalog: &Catalog,
        now: i64,
    ) -> Result<u64, StructureError> {
        pen::accrued(self.occupied_pen(id)?, catalog, now)
    }

    /// Pay a pen's accrued income into currency and restart accrual at `now`.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, `NothingToCollect`, or
    /// an inventory overflow. Nothing changes on error.
    pub fn collect(
        &mut self,
        id: StructureId,
        ledger: &mut InventoryLedger,
        catalog: &Catalog,
        now: i64,
    ) -> Result<u64, StructureError> {
        let amount = pen::accrued(self.occupied_pen(id)?, catalog, now)?;
        if amount == 0 {
            return Err(StructureError::NothingToCollect(id));
        }

        ledger.add_currency(amount)?;
        if let Some(state) = self.pens.get_mut(&id) {
            state.last_collect_time = now;
        }
        tracing::debug!(structure_id = %id, amount, "Pen collected");
        Ok(amount)
    }

    /// Collect, then return the pen's unit to inventory.
    ///
    /// If the inventory cannot take the unit, it stays in the pen and the
    /// call declines, but the income collected first is kept.
    ///
    /// # Errors
    ///
    /// Declines with `NotOwner`, `WrongKind`, `Empty`, or `RemoveBlocked`.
    pub fn remove_unit(
        &mut self,
        id: StructureId,
        ledger: &mut InventoryLedger,
        catalog: &Catalog,
        now: i64,
    ) -> Result<RemovedUnit, StructureError> {
        self.occupied_pen(id)?;
        let collected = match self.collect(id, ledger, catalog, now) {
            Ok(amount) => amount,
            Err(StructureError::NothingToCollect(_)) => 0,
            Err(e) => return Err(e),
        };

        let unit = self.occupied_pen(id)?.unit.clone();
        if let Err(source) = ledger.add_unit(unit.clone()) {
            tracing::debug!(structure_id = %id, collected, error = %source, "Unit kept in pen");
            return Err(StructureError::RemoveBlocked {
                structure: id,
                collected,
                source,
            });
        }
        self.pens.remove(&id);

        tracing::debug!(structure_id = %id, unit_id = %unit.id, collected, "Unit removed");
        Ok(RemovedUnit { unit, collected })
    }

    fn occupied_pen(&self, id: StructureId) -> Result<&PenState, StructureError> {
        self.require(id, StructureKind::Pen)?;
        self.pens.get(&id).ok_or(StructureError::Empty(id))
    }
}

//! Backpack capacity by equipped level.
//!
//! The table is indexed from level 1. Levels past the end of the table use
//! the last entry and level 0 is treated as level 1, so capacity is defined
//! for every `u32` and never decreases as the level rises.

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Default capacities for backpack levels 1 through 7.
pub const DEFAULT_BACKPACK_CAPACITIES: [u32; 7] = [50, 100, 200, 400, 800, 1600, 3200];

/// Default maximum number of units a player may hold.
pub const DEFAULT_UNIT_CAPACITY: u32 = 30;

/// Non-decreasing backpack capacity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct CapacityTable {
    capacities: Vec<u32>,
}

impl CapacityTable {
    /// Build a table from per-level capacities starting at level 1.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidCapacityTable`] if the table is
    /// empty or any entry is smaller than the one before it.
    pub fn new(capacities: Vec<u32>) -> Result<Self, InventoryError> {
        if capacities.is_empty() {
            return Err(InventoryError::InvalidCapacityTable {
                reason: String::from("at least one level must be configured"),
            });
        }
        if capacities.windows(2).any(|w| matches!(w, [a, b] if b < a)) {
            return Err(InventoryError::InvalidCapacityTable {
                reason: String::from("capacities must be non-decreasing in level"),
            });
        }
        Ok(Self { capacities })
    }

    /// Backpack capacity at `level`.
    pub fn capacity(&self, level: u32) -> u32 {
        let index = usize::try_from(level.saturating_sub(1)).unwrap_or(usize::MAX);
        self.capacities
            .get(index)
            .or_else(|| self.capacities.last())
            .copied()
            .unwrap_or(0)
    }

    /// Highest level with its own table entry.
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.capacities.len()).unwrap_or(u32::MAX)
    }
}

impl Default for CapacityTable {
    fn default() -> Self {
        Self {
            capacities: DEFAULT_BACKPACK_CAPACITIES.to_vec(),
        }
    }
}

impl TryFrom<Vec<u32>> for CapacityTable {
    type Error = InventoryError;

    fn try_from(capacities: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(capacities)
    }
}

impl From<CapacityTable> for Vec<u32> {
    fn from(table: CapacityTable) -> Self {
        table.capacities
    }
}

/// Static limits applied to every player's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLimits {
    /// Backpack capacity per equipped level.
    pub backpack: CapacityTable,
    /// Maximum units held at once.
    pub unit_capacity: u32,
}

impl Default for InventoryLimits {
    fn default() -> Self {
        Self {
            backpack: CapacityTable::default(),
            unit_capacity: DEFAULT_UNIT_CAPACITY,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn level_one_is_first_entry() {
        let table = CapacityTable::default();
        assert_eq!(table.capacity(1), 50);
        assert_eq!(table.capacity(2), 100);
    }

    #[test]
    fn level_zero_treated_as_one() {
        let table = CapacityTable::default();
        assert_eq!(table.capacity(0), 50);
    }

    #[test]
    fn levels_past_table_use_last_entry() {
        let table = CapacityTable::new(vec![10, 20]).unwrap();
        assert_eq!(table.capacity(3), 20);
        assert_eq!(table.capacity(u32::MAX), 20);
        assert_eq!(table.max_level(), 2);
    }

    #[test]
    fn capacity_is_non_decreasing() {
        let table = CapacityTable::default();
        let mut previous = 0;
        for level in 0..20 {
            let cap = table.capacity(level);
            assert!(cap >= previous);
            previous = cap;
        }
    }

    #[test]
    fn rejects_empty_table() {
        assert!(CapacityTable::new(Vec::new()).is_err());
    }

    #[test]
    fn rejects_decreasing_table() {
        assert!(CapacityTable::new(vec![50, 40]).is_err());
    }

    #[test]
    fn deserializes_from_plain_list() {
        let table: CapacityTable = serde_json::from_str("[5, 5, 9]").unwrap();
        assert_eq!(table.capacity(3), 9);
        assert!(serde_json::from_str::<CapacityTable>("[9, 5]").is_err());
    }
}

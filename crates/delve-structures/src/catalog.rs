//! Species, hatch durations, and income tables.
//!
//! The catalog is static game data: which species each rarity can hatch
//! into, how long each rarity incubates, each species' base income, and
//! the income multiplier of each variant. It is loaded once from
//! configuration and shared read-only by every player's engine.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use delve_types::{Rarity, UnitDescriptor, Variant};

/// Species hatched when no species is configured for an egg's rarity.
pub const DEFAULT_FALLBACK_SPECIES: &str = "mole";

/// Hatch duration used for a rarity missing from the table.
pub const DEFAULT_HATCH_SECONDS: u64 = 30;

/// One hatchable species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesDef {
    /// Stable species identifier stored on units.
    pub id: String,
    /// Rarity pool this species belongs to.
    pub rarity: Rarity,
    /// Currency per second at level 1 with the normal variant.
    pub base_income: Decimal,
}

impl SpeciesDef {
    fn new(id: &str, rarity: Rarity, base_income: Decimal) -> Self {
        Self {
            id: id.to_owned(),
            rarity,
            base_income,
        }
    }
}

/// Static species and timing data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Every hatchable species.
    pub species: Vec<SpeciesDef>,
    /// Incubation seconds per rarity.
    pub hatch_seconds: BTreeMap<Rarity, u64>,
    /// Income multiplier per variant.
    pub variant_multipliers: BTreeMap<Variant, Decimal>,
    /// Species hatched when a rarity has no configured species.
    pub fallback_species: String,
    /// Base income for species missing from the catalog.
    pub fallback_base_income: Decimal,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            species: vec![
                SpeciesDef::new("mole", Rarity::Common, Decimal::ONE),
                SpeciesDef::new("beetle", Rarity::Common, Decimal::new(15, 1)),
                SpeciesDef::new("ferret", Rarity::Uncommon, Decimal::from(3)),
                SpeciesDef::new("cave_bat", Rarity::Uncommon, Decimal::new(35, 1)),
                SpeciesDef::new("badger", Rarity::Rare, Decimal::from(8)),
                SpeciesDef::new("crystal_golem", Rarity::Epic, Decimal::from(20)),
                SpeciesDef::new("magma_drake", Rarity::Legendary, Decimal::from(50)),
                SpeciesDef::new("void_wyrm", Rarity::Mythic, Decimal::from(150)),
            ],
            hatch_seconds: BTreeMap::from([
                (Rarity::Common, 30),
                (Rarity::Uncommon, 60),
                (Rarity::Rare, 180),
                (Rarity::Epic, 600),
                (Rarity::Legendary, 1800),
                (Rarity::Mythic, 3600),
            ]),
            variant_multipliers: BTreeMap::from([
                (Variant::Normal, Decimal::ONE),
                (Variant::Golden, Decimal::from(2)),
                (Variant::Rainbow, Decimal::from(5)),
            ]),
            fallback_species: String::from(DEFAULT_FALLBACK_SPECIES),
            fallback_base_income: Decimal::ONE,
        }
    }
}

impl Catalog {
    /// Incubation seconds for `rarity`.
    pub fn hatch_duration(&self, rarity: Rarity) -> u64 {
        self.hatch_seconds
            .get(&rarity)
            .copied()
            .unwrap_or(DEFAULT_HATCH_SECONDS)
    }

    /// Species in the pool for `rarity`.
    pub fn species_for(&self, rarity: Rarity) -> Vec<&SpeciesDef> {
        self.species.iter().filter(|s| s.rarity == rarity).collect()
    }

    /// Roll a species uniformly among those sharing `rarity`, falling back
    /// to [`Catalog::fallback_species`] when the pool is empty.
    pub fn roll_species<R: Rng + ?Sized>(&self, rarity: Rarity, rng: &mut R) -> String {
        self.species_for(rarity)
            .choose(rng)
            .map_or_else(|| self.fallback_species.clone(), |s| s.id.clone())
    }

    /// Base income for `species`.
    pub fn base_income(&self, species: &str) -> Decimal {
        self.species
            .iter()
            .find(|s| s.id == species)
            .map_or(self.fallback_base_income, |s| s.base_income)
    }

    /// Income multiplier for `variant` (1 when unconfigured).
    pub fn variant_multiplier(&self, variant: Variant) -> Decimal {
        self.variant_multipliers
            .get(&variant)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// `BaseIncome(species) x VariantMultiplier(variant) x Level`.
    ///
    /// Returns `None` on decimal overflow.
    pub fn income_per_second(&self, unit: &UnitDescriptor) -> Option<Decimal> {
        self.base_income(&unit.species_id)
            .checked_mul(self.variant_multiplier(unit.variant))?
            .checked_mul(Decimal::from(unit.level))
    }

    /// Check that every rarity has a hatch duration and no income figure
    /// is negative.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(missing) = Rarity::ALL
            .iter()
            .find(|r| !self.hatch_seconds.contains_key(r))
        {
            return Err(format!("no hatch duration configured for {missing:?}"));
        }
        if let Some(species) = self.species.iter().find(|s| s.base_income.is_sign_negative()) {
            return Err(format!("species {} has negative base income", species.id));
        }
        if self.variant_multipliers.values().any(Decimal::is_sign_negative) {
            return Err(String::from("variant multipliers must not be negative"));
        }
        if self.fallback_base_income.is_sign_negative() {
            return Err(String::from("fallback base income must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use delve_types::UnitId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    use super::*;

    fn unit(species: &str, variant: Variant, level: u32) -> UnitDescriptor {
        UnitDescriptor {
            id: UnitId::new(),
            species_id: species.to_owned(),
            rarity: Rarity::Common,
            variant,
            level,
            hatched_at: 0,
        }
    }

    #[test]
    fn default_catalog_is_valid() {
        assert!(Catalog::default().validate().is_ok());
    }

    #[test]
    fn common_hatches_in_thirty_seconds() {
        assert_eq!(Catalog::default().hatch_duration(Rarity::Common), 30);
    }

    #[test]
    fn roll_stays_within_rarity_pool() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            seen.insert(catalog.roll_species(Rarity::Common, &mut rng));
        }
        let expected: BTreeSet<String> = ["mole", "beetle"].iter().map(|s| (*s).to_owned()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn roll_falls_back_when_pool_empty() {
        let catalog = Catalog {
            species: Vec::new(),
            ..Catalog::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(catalog.roll_species(Rarity::Mythic, &mut rng), "mole");
    }

    #[test]
    fn income_scales_with_variant_and_level() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.income_per_second(&unit("beetle", Variant::Normal, 1)),
            Some(dec!(1.5))
        );
        assert_eq!(
            catalog.income_per_second(&unit("beetle", Variant::Golden, 3)),
            Some(dec!(9.0))
        );
        assert_eq!(
            catalog.income_per_second(&unit("unknown", Variant::Rainbow, 1)),
            Some(dec!(5))
        );
    }

    #[test]
    fn validate_rejects_missing_rarity() {
        let mut catalog = Catalog::default();
        catalog.hatch_seconds.remove(&Rarity::Epic);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn deserializes_partial_yaml_shape() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"fallback_species": "beetle", "hatch_seconds": {"Common": 5}}"#,
        )
        .unwrap();
        assert_eq!(catalog.fallback_species, "beetle");
        assert_eq!(catalog.hatch_duration(Rarity::Common), 5);
        assert_eq!(catalog.hatch_duration(Rarity::Rare), DEFAULT_HATCH_SECONDS);
        assert!(!catalog.species.is_empty());
    }
}

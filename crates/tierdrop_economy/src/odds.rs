//! # Odds Table Resolver
//!
//! **Weighted Discrete Sampling with Injectable Randomness**
//!
//! Every probabilistic outcome in the arcade - game tiers, pack card pools -
//! resolves through a named odds table: an ordered list of
//! `(outcome_tag, weight)` pairs. Resolution draws a uniform value in
//! `[0, total_weight)` and walks the list accumulating weights; the first
//! entry whose cumulative weight exceeds the draw wins.
//!
//! ## Rules
//!
//! - Weights are arbitrary integer units; the draw range normalizes them,
//!   so tables need not sum to any particular mass. Fractional per-mille
//!   configs scale up (1.5 permille becomes weight 15).
//! - Resolution is stateless: no pity timers, no outcome history. Each call
//!   is independent.
//! - Empty or all-zero tables are operator misconfiguration and fail with
//!   [`EconomyError::MisconfiguredOdds`]. The resolver never guesses a tag.
//! - The random source is injected so tests and audits can reproduce any
//!   resolution exactly.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EconomyError, EconomyResult};

/// A single `(outcome_tag, weight)` pair in an odds table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsEntry {
    /// The outcome tag: a tier tag (`"D"`..`"SSS"`) for game tables, or a
    /// card tag for pack pools.
    pub tag: String,
    /// Relative weight. Zero-weight entries are legal and never selected.
    pub weight: u64,
}

/// A named, ordered outcome space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OddsTable {
    /// Table name, referenced by game and pack configuration.
    pub name: String,
    /// Ordered entries. Order is part of the contract: a draw of zero
    /// always selects the first positive-weight entry.
    pub entries: Vec<OddsEntry>,
    /// Total weight of all entries (pre-calculated on registration).
    #[serde(skip)]
    pub total_weight: u64,
}

impl OddsTable {
    /// Builds a table from `(tag, weight)` pairs.
    #[must_use]
    pub fn from_pairs(name: &str, pairs: &[(&str, u64)]) -> Self {
        let mut table = Self {
            name: name.to_owned(),
            entries: pairs
                .iter()
                .map(|(tag, weight)| OddsEntry {
                    tag: (*tag).to_owned(),
                    weight: *weight,
                })
                .collect(),
            total_weight: 0,
        };
        table.calculate_total_weight();
        table
    }

    /// Recomputes the cached total weight.
    pub fn calculate_total_weight(&mut self) {
        self.total_weight = self.entries.iter().map(|e| e.weight).sum();
    }

    /// Resolves the outcome for a specific raw draw in `[0, total_weight)`.
    ///
    /// This is the auditable core of resolution: given the same draw, the
    /// same table always yields the same tag.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::MisconfiguredOdds`] when the table is empty
    /// or has no positive weight.
    pub fn resolve_at(&self, roll: u64) -> EconomyResult<&str> {
        if self.entries.is_empty() || self.total_weight == 0 {
            return Err(EconomyError::MisconfiguredOdds {
                table: self.name.clone(),
                reason: "table is empty or has no positive weight".to_owned(),
            });
        }

        let roll = roll % self.total_weight;
        let mut cumulative = 0u64;

        for entry in &self.entries {
            cumulative += entry.weight;
            if roll < cumulative {
                return Ok(&entry.tag);
            }
        }

        // Unreachable: roll < total_weight and weights sum to total_weight.
        Err(EconomyError::MisconfiguredOdds {
            table: self.name.clone(),
            reason: "cumulative walk exhausted the table".to_owned(),
        })
    }
}

/// Registry of odds tables, resolved by name.
///
/// Read-only during resolution; tables are registered once at startup from
/// configuration.
#[derive(Default)]
pub struct OddsResolver {
    /// Tables indexed by name.
    tables: HashMap<String, OddsTable>,
}

impl OddsResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, recomputing its total weight.
    pub fn register_table(&mut self, mut table: OddsTable) {
        table.calculate_total_weight();
        self.tables.insert(table.name.clone(), table);
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&OddsTable> {
        self.tables.get(name)
    }

    /// Resolves one outcome from the named table using the supplied
    /// random source.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::MisconfiguredOdds`] when the table is
    /// missing, empty, or carries no positive weight.
    pub fn resolve_with(&self, name: &str, rng: &mut dyn RngCore) -> EconomyResult<&str> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| EconomyError::MisconfiguredOdds {
                table: name.to_owned(),
                reason: "no such table".to_owned(),
            })?;

        if table.total_weight == 0 {
            return Err(EconomyError::MisconfiguredOdds {
                table: name.to_owned(),
                reason: "table is empty or has no positive weight".to_owned(),
            });
        }

        let roll = rng.gen_range(0..table.total_weight);
        table.resolve_at(roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn tier_table() -> OddsTable {
        // Per-mille units scaled by 10 so 1.5 permille is representable.
        OddsTable::from_pairs(
            "plinko",
            &[
                ("D", 7500),
                ("C", 1500),
                ("B", 700),
                ("A", 200),
                ("S", 80),
                ("SS", 15),
                ("SSS", 5),
            ],
        )
    }

    #[test]
    fn test_roll_zero_selects_first_entry() {
        let table = tier_table();
        assert_eq!(table.resolve_at(0).unwrap(), "D");
    }

    #[test]
    fn test_cumulative_boundaries() {
        let table = tier_table();
        assert_eq!(table.resolve_at(7499).unwrap(), "D");
        assert_eq!(table.resolve_at(7500).unwrap(), "C");
        assert_eq!(table.resolve_at(8999).unwrap(), "C");
        assert_eq!(table.resolve_at(9000).unwrap(), "B");
        assert_eq!(table.resolve_at(9999).unwrap(), "SSS");
    }

    #[test]
    fn test_zero_weight_entry_never_selected() {
        let table = OddsTable::from_pairs("odd", &[("never", 0), ("always", 1)]);
        assert_eq!(table.resolve_at(0).unwrap(), "always");
    }

    #[test]
    fn test_empty_table_is_misconfigured() {
        let table = OddsTable::from_pairs("empty", &[]);
        assert!(matches!(
            table.resolve_at(0),
            Err(EconomyError::MisconfiguredOdds { .. })
        ));
    }

    #[test]
    fn test_all_zero_table_is_misconfigured() {
        let mut resolver = OddsResolver::new();
        resolver.register_table(OddsTable::from_pairs("dead", &[("a", 0), ("b", 0)]));

        let mut rng = StepRng::new(0, 1);
        assert!(matches!(
            resolver.resolve_with("dead", &mut rng),
            Err(EconomyError::MisconfiguredOdds { .. })
        ));
    }

    #[test]
    fn test_missing_table_is_misconfigured() {
        let resolver = OddsResolver::new();
        let mut rng = StepRng::new(0, 1);
        assert!(matches!(
            resolver.resolve_with("nope", &mut rng),
            Err(EconomyError::MisconfiguredOdds { .. })
        ));
    }

    #[test]
    fn test_seeded_frequencies_converge() {
        // [(A,70),(B,20),(C,10)] over 100,000 seeded draws should converge
        // to 70%/20%/10% within sampling error.
        let mut resolver = OddsResolver::new();
        resolver.register_table(OddsTable::from_pairs(
            "abc",
            &[("A", 70), ("B", 20), ("C", 10)],
        ));

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts: HashMap<String, u32> = HashMap::new();
        let draws = 100_000u32;

        for _ in 0..draws {
            let tag = resolver.resolve_with("abc", &mut rng).unwrap();
            *counts.entry(tag.to_owned()).or_insert(0) += 1;
        }

        let a = counts["A"];
        let b = counts["B"];
        let c = counts["C"];
        assert_eq!(a + b + c, draws);

        // 2% absolute tolerance is dozens of standard deviations at n=100k.
        assert!((68_000..=72_000).contains(&a), "A count {a} out of range");
        assert!((19_000..=21_000).contains(&b), "B count {b} out of range");
        assert!((9_000..=11_000).contains(&c), "C count {c} out of range");
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let mut resolver = OddsResolver::new();
        resolver.register_table(tier_table());

        let draw = |seed: u64| -> Vec<String> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..100)
                .map(|_| resolver.resolve_with("plinko", &mut rng).unwrap().to_owned())
                .collect()
        };

        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }
}

//! # Pack Opening
//!
//! Resolves a pack into its card draws. A pack is `slots - 1` bulk draws
//! from the common pool plus exactly one hit draw from the full tier
//! distribution. Bulk cards valued below the pack's refund threshold are
//! liquidated for a fixed per-card refund instead of cluttering the
//! inventory.
//!
//! Resolution here is pure: every slot is drawn and priced before any
//! store is touched, so a failure mid-resolution leaves nothing to undo
//! beyond the original debit.

use rand::RngCore;

use crate::config::{CardDefinition, EconomyConfig, PackDefinition};
use crate::credits::Credits;
use crate::error::{EconomyError, EconomyResult};
use crate::odds::OddsResolver;

/// One resolved bulk slot.
#[derive(Clone, Debug)]
pub struct SlotDraw {
    /// The card drawn.
    pub card: CardDefinition,
    /// Whether the draw was liquidated for a refund instead of kept.
    pub liquidated: bool,
}

/// A fully resolved pack: all draws priced, nothing persisted yet.
#[derive(Clone, Debug)]
pub struct PackOpening {
    /// Bulk draws (`slots - 1` of them).
    pub bulk: Vec<SlotDraw>,
    /// The hit slot, drawn from the full distribution. Never liquidated.
    pub hit: CardDefinition,
    /// Sum of per-card refunds for the liquidated bulk draws.
    pub refund_total: Credits,
}

impl PackOpening {
    /// The cards that go into the inventory: kept bulk draws plus the hit.
    pub fn kept_cards(&self) -> impl Iterator<Item = &CardDefinition> {
        self.bulk
            .iter()
            .filter(|d| !d.liquidated)
            .map(|d| &d.card)
            .chain(std::iter::once(&self.hit))
    }
}

/// Stateless resolver turning pack definitions into [`PackOpening`]s.
#[derive(Default)]
pub struct PackOpener;

impl PackOpener {
    /// Creates a pack opener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Draws every slot of `pack` and prices the result.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::MisconfiguredOdds`] if a pool resolves to a
    /// tag with no card definition (config validation makes this a startup
    /// failure, not a player-facing one) and propagates odds-table errors.
    pub fn resolve(
        &self,
        config: &EconomyConfig,
        odds: &OddsResolver,
        pack: &PackDefinition,
        rng: &mut dyn RngCore,
    ) -> EconomyResult<PackOpening> {
        let card_for = |table: &str, tag: &str| -> EconomyResult<CardDefinition> {
            config.card_by_tag(tag).cloned().ok_or_else(|| {
                EconomyError::MisconfiguredOdds {
                    table: table.to_string(),
                    reason: format!("tag '{tag}' has no card definition"),
                }
            })
        };

        let bulk_count = pack.slots.saturating_sub(1) as usize;
        let mut bulk = Vec::with_capacity(bulk_count);
        let mut refund_total = Credits::ZERO;

        for _ in 0..bulk_count {
            let tag = odds.resolve_with(&pack.bulk_table, rng)?.to_string();
            let card = card_for(&pack.bulk_table, &tag)?;
            let liquidated = card.value < pack.bulk_refund_threshold;
            if liquidated {
                refund_total = refund_total.safe_add(pack.bulk_refund_per_card)?;
            }
            bulk.push(SlotDraw { card, liquidated });
        }

        let hit_tag = odds.resolve_with(&pack.full_table, rng)?.to_string();
        let hit = card_for(&pack.full_table, &hit_tag)?;

        Ok(PackOpening {
            bulk,
            hit,
            refund_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::OddsTable;
    use rand::rngs::mock::StepRng;
    use tierdrop_core::Tier;

    fn card(id: u32, tag: &str, tier: Tier, value: Credits) -> CardDefinition {
        CardDefinition {
            id,
            tag: tag.to_string(),
            name: tag.to_string(),
            tier,
            value,
        }
    }

    fn fixture() -> (EconomyConfig, OddsResolver, PackDefinition) {
        let pack = PackDefinition {
            id: 10,
            name: "Standard Pack".to_string(),
            tier: Tier::D,
            price: Credits::from_whole(8),
            slots: 8,
            bulk_table: "bulk".to_string(),
            full_table: "full".to_string(),
            bulk_refund_threshold: Credits::from_parts(0, 5),
            bulk_refund_per_card: Credits::from_parts(0, 1),
        };
        let config = EconomyConfig {
            publish_threshold: Tier::A,
            session_timeout_secs: 300,
            games: vec![],
            tables: vec![],
            cards: vec![
                card(1, "dust_mote", Tier::D, Credits::from_parts(0, 1)),
                card(2, "ember_fox", Tier::A, Credits::from_whole(4)),
            ],
            packs: vec![pack.clone()],
        };
        let mut odds = OddsResolver::new();
        odds.register_table(OddsTable::from_pairs("bulk", &[("dust_mote", 100)]));
        odds.register_table(OddsTable::from_pairs(
            "full",
            &[("dust_mote", 90), ("ember_fox", 10)],
        ));
        (config, odds, pack)
    }

    #[test]
    fn test_bulk_liquidation_adds_up() {
        let (config, odds, pack) = fixture();
        // StepRng yields 0 forever: every bulk draw is dust_mote (below the
        // 0.05 threshold), the hit lands on the first full-table entry.
        let mut rng = StepRng::new(0, 0);
        let opening = PackOpener::new()
            .resolve(&config, &odds, &pack, &mut rng)
            .unwrap();

        assert_eq!(opening.bulk.len(), 7);
        assert!(opening.bulk.iter().all(|d| d.liquidated));
        assert_eq!(opening.refund_total, Credits::from_parts(0, 7));
        assert_eq!(opening.hit.tag, "dust_mote");
        // Hit slot counts even when bulk is fully liquidated
        assert_eq!(opening.kept_cards().count(), 1);
    }

    #[test]
    fn test_valuable_bulk_is_kept() {
        let (mut config, mut odds, pack) = fixture();
        config.cards[0].value = Credits::from_parts(0, 5); // at threshold, kept
        odds.register_table(OddsTable::from_pairs("bulk", &[("dust_mote", 100)]));
        let mut rng = StepRng::new(0, 0);
        let opening = PackOpener::new()
            .resolve(&config, &odds, &pack, &mut rng)
            .unwrap();

        assert!(opening.bulk.iter().all(|d| !d.liquidated));
        assert_eq!(opening.refund_total, Credits::ZERO);
        assert_eq!(opening.kept_cards().count(), 8);
    }

    #[test]
    fn test_unmapped_tag_is_misconfiguration() {
        let (mut config, odds, pack) = fixture();
        config.cards.clear();
        let mut rng = StepRng::new(0, 0);
        let err = PackOpener::new()
            .resolve(&config, &odds, &pack, &mut rng)
            .unwrap_err();
        assert!(matches!(err, EconomyError::MisconfiguredOdds { .. }));
    }
}

//! # Economy Configuration
//!
//! All balance data - play costs, odds tables, card values, pack shapes -
//! lives in external TOML files loaded once at startup and validated before
//! the engine serves a single request. Nothing in here is mutated at
//! runtime; administrative edits mean a config reload, not in-place pokes.
//!
//! ## Example
//!
//! ```toml
//! publish_threshold = "A"
//! session_timeout_secs = 300
//!
//! [[games]]
//! kind = "plinko"
//! cost = "20.00"
//! table = "arcade_tiers"
//!
//! [[tables]]
//! name = "arcade_tiers"
//! entries = [
//!     { tag = "D", weight = 7500 },
//!     { tag = "A", weight = 200 },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use tierdrop_core::{CardId, GameKind, PackId, Tier};

use crate::credits::Credits;
use crate::error::{EconomyError, EconomyResult};
use crate::odds::OddsTable;

/// A playable card definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Card id.
    pub id: CardId,
    /// The tag pack pools resolve to.
    pub tag: String,
    /// Display name (used in feed entries).
    pub name: String,
    /// Rarity tier.
    pub tier: Tier,
    /// Economic value; bulk draws below a pack's refund threshold are
    /// liquidated instead of inventoried.
    pub value: Credits,
}

/// A pack definition: price, slot shape, and the tables it draws from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackDefinition {
    /// Pack id.
    pub id: PackId,
    /// Display name.
    pub name: String,
    /// Rarity tier of the pack itself (game grants map tier -> pack).
    pub tier: Tier,
    /// Purchase price.
    pub price: Credits,
    /// Total slot count; `slots - 1` bulk draws plus exactly one hit draw.
    pub slots: u32,
    /// Table the bulk slots draw from (the common-tier pool).
    pub bulk_table: String,
    /// Table the hit slot draws from (the full tier distribution).
    pub full_table: String,
    /// Bulk cards valued strictly below this are liquidated.
    pub bulk_refund_threshold: Credits,
    /// Fixed refund per liquidated bulk card.
    pub bulk_refund_per_card: Credits,
}

/// A playable game surface: its cost and the odds table it resolves on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// The game kind.
    pub kind: GameKind,
    /// Cost per play.
    pub cost: Credits,
    /// The odds table game outcomes resolve on.
    pub table: String,
}

/// The full balance configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Minimum tier an outcome needs to reach the public feed.
    pub publish_threshold: Tier,
    /// Age after which an `in_progress` session is sweepable.
    pub session_timeout_secs: u64,
    /// Game surfaces.
    pub games: Vec<GameConfig>,
    /// Odds tables.
    pub tables: Vec<OddsTable>,
    /// Card definitions.
    pub cards: Vec<CardDefinition>,
    /// Pack definitions.
    pub packs: Vec<PackDefinition>,
}

impl EconomyConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on parse or validation
    /// failure.
    pub fn from_toml_str(raw: &str) -> EconomyResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| EconomyError::InvalidConfig(format!("TOML parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] if the file cannot be
    /// read and [`EconomyError::InvalidConfig`] on parse/validation failure.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EconomyError::StorageUnavailable(format!("config read failed: {e}")))?;
        Self::from_toml_str(&raw)
    }

    /// Cross-checks references between games, tables, cards, and packs.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] describing the first broken
    /// reference found.
    pub fn validate(&self) -> EconomyResult<()> {
        let table = |name: &str| self.tables.iter().find(|t| t.name == name);

        for game in &self.games {
            let bound = table(&game.table).ok_or_else(|| {
                EconomyError::InvalidConfig(format!(
                    "game '{}' references missing table '{}'",
                    game.kind, game.table
                ))
            })?;
            // Game tables must resolve to tier tags, and every reachable
            // tier needs a pack to grant.
            for entry in &bound.entries {
                let tier = Tier::from_tag(&entry.tag).ok_or_else(|| {
                    EconomyError::InvalidConfig(format!(
                        "table '{}' entry '{}' is not a tier tag",
                        bound.name, entry.tag
                    ))
                })?;
                if entry.weight > 0 && self.pack_for_tier(tier).is_none() {
                    return Err(EconomyError::InvalidConfig(format!(
                        "no pack definition for reachable tier '{tier}'"
                    )));
                }
            }
        }

        for pack in &self.packs {
            if pack.slots < 2 {
                return Err(EconomyError::InvalidConfig(format!(
                    "pack '{}' needs at least 2 slots (bulk + hit)",
                    pack.name
                )));
            }
            for name in [&pack.bulk_table, &pack.full_table] {
                let bound = table(name).ok_or_else(|| {
                    EconomyError::InvalidConfig(format!(
                        "pack '{}' references missing table '{name}'",
                        pack.name
                    ))
                })?;
                // Pack pools must resolve to card tags.
                for entry in &bound.entries {
                    if self.card_by_tag(&entry.tag).is_none() {
                        return Err(EconomyError::InvalidConfig(format!(
                            "table '{}' entry '{}' is not a configured card",
                            bound.name, entry.tag
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Looks up a game surface.
    #[must_use]
    pub fn game(&self, kind: GameKind) -> Option<&GameConfig> {
        self.games.iter().find(|g| g.kind == kind)
    }

    /// Looks up a pack definition by id.
    #[must_use]
    pub fn pack(&self, id: PackId) -> Option<&PackDefinition> {
        self.packs.iter().find(|p| p.id == id)
    }

    /// Looks up the pack granted for a resolved tier.
    #[must_use]
    pub fn pack_for_tier(&self, tier: Tier) -> Option<&PackDefinition> {
        self.packs.iter().find(|p| p.tier == tier)
    }

    /// Looks up a card by the tag pack pools resolve to.
    #[must_use]
    pub fn card_by_tag(&self, tag: &str) -> Option<&CardDefinition> {
        self.cards.iter().find(|c| c.tag == tag)
    }

    /// Looks up a card by id.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&CardDefinition> {
        self.cards.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
publish_threshold = "A"
session_timeout_secs = 300

[[games]]
kind = "plinko"
cost = "20.00"
table = "arcade_tiers"

[[tables]]
name = "arcade_tiers"
entries = [
    { tag = "D", weight = 7500 },
    { tag = "A", weight = 200 },
]

[[tables]]
name = "standard_bulk"
entries = [{ tag = "dust_mote", weight = 100 }]

[[tables]]
name = "standard_full"
entries = [
    { tag = "dust_mote", weight = 90 },
    { tag = "ember_fox", weight = 10 },
]

[[cards]]
id = 1
tag = "dust_mote"
name = "Dust Mote"
tier = "D"
value = "0.01"

[[cards]]
id = 2
tag = "ember_fox"
name = "Ember Fox"
tier = "A"
value = "4.00"

[[packs]]
id = 10
name = "Standard Pack"
tier = "D"
price = "8.00"
slots = 8
bulk_table = "standard_bulk"
full_table = "standard_full"
bulk_refund_threshold = "0.05"
bulk_refund_per_card = "0.01"

[[packs]]
id = 11
name = "Ace Pack"
tier = "A"
price = "24.00"
slots = 8
bulk_table = "standard_bulk"
full_table = "standard_full"
bulk_refund_threshold = "0.05"
bulk_refund_per_card = "0.01"
"#;

    #[test]
    fn test_sample_parses_and_validates() {
        let config = EconomyConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.publish_threshold, Tier::A);
        assert_eq!(config.games.len(), 1);
        assert_eq!(
            config.game(GameKind::Plinko).unwrap().cost,
            Credits::from_whole(20)
        );
        assert_eq!(config.pack(10).unwrap().slots, 8);
        assert_eq!(config.pack_for_tier(Tier::A).unwrap().id, 11);
        assert_eq!(config.card_by_tag("ember_fox").unwrap().id, 2);
    }

    #[test]
    fn test_missing_table_rejected() {
        let broken = SAMPLE.replace("table = \"arcade_tiers\"", "table = \"no_such\"");
        assert!(matches!(
            EconomyConfig::from_toml_str(&broken),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_tier_tag_in_game_table_rejected() {
        let broken = SAMPLE.replace("{ tag = \"D\", weight = 7500 }", "{ tag = \"dust_mote\", weight = 7500 }");
        assert!(matches!(
            EconomyConfig::from_toml_str(&broken),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_reachable_tier_without_pack_rejected() {
        // Make S reachable; no S pack exists.
        let broken = SAMPLE.replace(
            "{ tag = \"A\", weight = 200 },",
            "{ tag = \"A\", weight = 200 },\n    { tag = \"S\", weight = 80 },",
        );
        assert!(matches!(
            EconomyConfig::from_toml_str(&broken),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tiny_pack_rejected() {
        let broken = SAMPLE.replace("slots = 8", "slots = 1");
        assert!(matches!(
            EconomyConfig::from_toml_str(&broken),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_card_tag_in_pool_rejected() {
        let broken = SAMPLE.replace(
            "{ tag = \"dust_mote\", weight = 100 }",
            "{ tag = \"missing_card\", weight = 100 }",
        );
        assert!(matches!(
            EconomyConfig::from_toml_str(&broken),
            Err(EconomyError::InvalidConfig(_))
        ));
    }
}

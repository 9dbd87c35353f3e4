//! # Rarity Tiers
//!
//! The discrete rarity ladder used for reward-odds configuration.
//! Ordering matters: feed publishing is a `tier >= threshold` comparison.

use serde::{Deserialize, Serialize};

/// Rarity tier for packs and cards.
///
/// Declared in ascending order so `Ord` matches rarity value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    /// D tier - the common floor, ~75% of game outcomes
    D = 0,
    /// C tier - low uncommon
    C = 1,
    /// B tier - uncommon
    B = 2,
    /// A tier - rare; default feed publish threshold
    A = 3,
    /// S tier - very rare
    S = 4,
    /// SS tier - chase rarity
    SS = 5,
    /// SSS tier - top of the ladder
    SSS = 6,
}

impl Tier {
    /// All tiers, ascending.
    pub const ALL: [Self; 7] = [
        Self::D,
        Self::C,
        Self::B,
        Self::A,
        Self::S,
        Self::SS,
        Self::SSS,
    ];

    /// The canonical outcome tag for this tier (the string odds tables use).
    #[inline]
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }

    /// Parses an outcome tag back into a tier.
    ///
    /// Returns `None` for tags that are not tiers (pack pools resolve to
    /// card tags, not tier tags).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "D" => Some(Self::D),
            "C" => Some(Self::C),
            "B" => Some(Self::B),
            "A" => Some(Self::A),
            "S" => Some(Self::S),
            "SS" => Some(Self::SS),
            "SSS" => Some(Self::SSS),
            _ => None,
        }
    }

    /// Converts from u8, saturating at the top of the ladder.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::D,
            1 => Self::C,
            2 => Self::B,
            3 => Self::A,
            4 => Self::S,
            5 => Self::SS,
            _ => Self::SSS,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

//! # Game Kinds
//!
//! Every play surface the arcade exposes. A pack purchase is modelled as a
//! game kind too: it runs the same debit/session/grant pipeline.

use serde::{Deserialize, Serialize};

/// The kind of play a session represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Plinko board - physics resolved client-side.
    Plinko,
    /// Prize wheel - physics resolved client-side.
    Wheel,
    /// Minesweeper grid - resolved server-side.
    Minesweeper,
    /// Virtual pack opening.
    Pack,
}

impl GameKind {
    /// Stable name used in transaction descriptions and feed entries.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plinko => "plinko",
            Self::Wheel => "wheel",
            Self::Minesweeper => "minesweeper",
            Self::Pack => "pack",
        }
    }

    /// Whether this game's outcome is reported by the client.
    ///
    /// Plinko and the wheel run their physics simulation in the browser and
    /// report the sector/bucket they landed in; the server maps that tag to
    /// a tier without re-resolving. Everything else resolves server-side.
    #[inline]
    #[must_use]
    pub const fn client_resolved(self) -> bool {
        matches!(self, Self::Plinko | Self::Wheel)
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_resolved_split() {
        assert!(GameKind::Plinko.client_resolved());
        assert!(GameKind::Wheel.client_resolved());
        assert!(!GameKind::Minesweeper.client_resolved());
        assert!(!GameKind::Pack.client_resolved());
    }

    #[test]
    fn test_names_are_snake_case() {
        for kind in [
            GameKind::Plinko,
            GameKind::Wheel,
            GameKind::Minesweeper,
            GameKind::Pack,
        ] {
            assert_eq!(kind.name(), kind.name().to_lowercase());
        }
    }
}

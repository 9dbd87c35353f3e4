//! # TIERDROP Core Types
//!
//! Shared domain vocabulary for the TIERDROP arcade engine:
//!
//! - Id aliases for users, sessions, cards and packs
//! - The [`Tier`] rarity ladder (D up to SSS)
//! - The [`GameKind`] enum for every play surface
//! - Wall-clock helpers for audit timestamps
//!
//! ## Architecture Rules
//!
//! 1. **No heavy dependencies** - every crate in the workspace links this
//! 2. **Ids are plain integers** - persistence assigns them, code never
//!    invents meaning for their bit patterns
//! 3. **Tiers are ordered** - `Tier::A < Tier::S` must hold so publish
//!    thresholds are a single comparison

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod game;
pub mod ids;
pub mod tier;
pub mod time;

pub use game::GameKind;
pub use ids::{CardId, OwnedPackId, PackId, SessionId, UserId};
pub use tier::Tier;
pub use time::unix_now;

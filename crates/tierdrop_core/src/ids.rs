//! # Identifier Aliases
//!
//! Plain integer aliases for the entities the engine persists.
//! The stores assign them; nothing else may mint one.

/// Unique identifier for a user account.
pub type UserId = u64;

/// Unique identifier for a single play attempt.
///
/// Session ids are monotonic within one process lifetime and are the
/// idempotency key for reward grants.
pub type SessionId = u64;

/// Unique identifier for a card definition.
pub type CardId = u32;

/// Unique identifier for a pack definition.
pub type PackId = u32;

/// Unique identifier for a pack instance sitting in a user's inventory.
pub type OwnedPackId = u64;

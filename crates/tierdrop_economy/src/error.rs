//! # Economy Error Types
//!
//! The full failure taxonomy of the engine. The split that matters:
//!
//! - [`EconomyError::InsufficientCredits`] is recoverable and user-facing;
//!   it leaves no state change behind.
//! - Everything else that fires *after* a successful debit must be preceded
//!   by a compensating credit before it is surfaced (the service enforces
//!   this; see `service.rs`).

use thiserror::Error;
use tierdrop_core::{OwnedPackId, PackId, SessionId};

use crate::credits::Credits;

/// Errors that can occur in the economy engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Balance does not cover the requested debit. No mutation occurred.
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// The amount the operation needed.
        required: Credits,
        /// The balance at the time of the check.
        available: Credits,
    },

    /// An odds table is missing, empty, or carries no positive weight.
    ///
    /// This is operator misconfiguration and is fatal for the request;
    /// the resolver never substitutes a default outcome.
    #[error("misconfigured odds table '{table}': {reason}")]
    MisconfiguredOdds {
        /// The table that failed to resolve.
        table: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A resolved outcome tag does not map to any configured tier or pack.
    #[error("unknown tier tag '{tag}'")]
    UnknownTier {
        /// The tag that failed to map.
        tag: String,
    },

    /// No pack definition exists for this id.
    #[error("unknown pack definition {pack}")]
    UnknownPack {
        /// The pack definition id.
        pack: PackId,
    },

    /// An owned pack instance is missing or already opened.
    #[error("owned pack {owned_pack} is not available to open")]
    PackUnavailable {
        /// The pack instance id.
        owned_pack: OwnedPackId,
    },

    /// Illegal session transition - the session is missing or already
    /// terminal. Retried grants hit this and resolve via the idempotent
    /// grant lookup instead of erroring the caller.
    #[error("session {session} conflict: already resolved or unknown")]
    SessionConflict {
        /// The session in question.
        session: SessionId,
    },

    /// The backing store (WAL file) failed. Fatal for the request; the
    /// caller retries with backoff.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Arithmetic overflow in a fixed-point credit calculation.
    #[error("arithmetic overflow in credit calculation")]
    ArithmeticOverflow,

    /// Invalid configuration file or parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;

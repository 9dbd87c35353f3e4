//! # Wall-Clock Helpers
//!
//! Audit records carry unix timestamps. A clock going backwards must never
//! panic the engine, so the helper saturates at the epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as whole seconds since the unix epoch.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

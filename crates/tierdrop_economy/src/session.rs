//! # Session Tracker
//!
//! One record per play attempt, independent of the transaction log, so the
//! engine can answer "what happened to the credits I just spent?" after a
//! crash or a retried request.
//!
//! ## State Machine
//!
//! ```text
//! in_progress ──> completed   (happy path)
//! in_progress ──> failed      (resolution/persistence error after debit)
//! ```
//!
//! No other transition is legal; a terminal session never regresses.
//! Sessions record the debited cost so sweeps and compensation can refund
//! exactly what was taken.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tierdrop_core::{unix_now, GameKind, SessionId, UserId};

use crate::credits::Credits;
use crate::error::{EconomyError, EconomyResult};

/// Lifecycle status of a play attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Debit succeeded, outcome not yet resolved and persisted.
    InProgress,
    /// Outcome resolved and granted.
    Completed,
    /// Resolution or persistence failed after the debit; compensation is
    /// the caller's responsibility, not this tracker's.
    Failed,
}

impl SessionStatus {
    /// Returns true if this status is terminal.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One play attempt.
#[derive(Clone, Debug)]
pub struct GameSession {
    /// Session id - the idempotency key for grants.
    pub id: SessionId,
    /// The user playing.
    pub user: UserId,
    /// Which surface was played.
    pub kind: GameKind,
    /// The amount debited when the session began (zero for free opens).
    pub cost: Credits,
    /// Opaque game payload; resolution results are merged in for audit.
    pub payload: String,
    /// Current status.
    pub status: SessionStatus,
    /// Creation timestamp (unix seconds).
    pub created_at: u64,
    /// Last transition timestamp (unix seconds).
    pub updated_at: u64,
}

/// In-memory tracker of play sessions.
#[derive(Default)]
pub struct SessionTracker {
    /// Sessions by id.
    sessions: Mutex<HashMap<SessionId, GameSession>>,
    /// Next session id (monotonic within the process).
    next_id: AtomicU64,
}

impl SessionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Begins a new `in_progress` session.
    ///
    /// Called only after the debit has succeeded; if this fails the caller
    /// must treat the debited credits as refundable and compensate.
    ///
    /// # Errors
    ///
    /// Infallible for the in-memory tracker; the `Result` is the contract
    /// for a tracker backed by fallible persistence.
    pub fn begin(
        &self,
        user: UserId,
        kind: GameKind,
        cost: Credits,
        payload: &str,
    ) -> EconomyResult<SessionId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = unix_now();
        let session = GameSession {
            id,
            user,
            kind,
            cost,
            payload: payload.to_owned(),
            status: SessionStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        self.sessions.lock().insert(id, session);
        Ok(id)
    }

    /// Transitions `in_progress -> completed`, merging the resolved outcome
    /// into the stored payload.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SessionConflict`] for unknown or terminal
    /// sessions.
    pub fn complete(&self, id: SessionId, resolved_payload: &str) -> EconomyResult<()> {
        self.transition(id, SessionStatus::Completed, resolved_payload)
    }

    /// Transitions `in_progress -> failed`.
    ///
    /// Does not compensate credits; that is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SessionConflict`] for unknown or terminal
    /// sessions.
    pub fn fail(&self, id: SessionId, reason: &str) -> EconomyResult<()> {
        self.transition(id, SessionStatus::Failed, reason)
    }

    /// Fetches a session snapshot.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<GameSession> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Snapshots every `in_progress` session created at or before `cutoff`.
    ///
    /// The sweep path uses this to force-fail and refund abandoned plays.
    #[must_use]
    pub fn in_progress_older_than(&self, cutoff: u64) -> Vec<GameSession> {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.status == SessionStatus::InProgress && s.created_at <= cutoff)
            .cloned()
            .collect()
    }

    /// Advances the id counter past `id` during journal replay, so new
    /// sessions never reuse an id a recovered grant is keyed on.
    pub(crate) fn reserve_through(&self, id: SessionId) {
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    fn transition(&self, id: SessionId, to: SessionStatus, merged: &str) -> EconomyResult<()> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&id)
            .ok_or(EconomyError::SessionConflict { session: id })?;

        if session.status.is_terminal() {
            return Err(EconomyError::SessionConflict { session: id });
        }

        session.status = to;
        session.updated_at = unix_now();
        if !merged.is_empty() {
            if !session.payload.is_empty() {
                session.payload.push_str(" | ");
            }
            session.payload.push_str(merged);
        }
        Ok(())
    }
}

//! # Ledger Store
//!
//! **The Only Shared Mutable Resource in the Engine**
//!
//! Per-user credit balances plus the append-only transaction log. The two
//! rules everything else leans on:
//!
//! 1. `debit` is a single conditional update: the balance check, the
//!    decrement, and the `deduction` entry all happen inside one lock hold.
//!    A read-then-write pattern is forbidden - it admits a race where two
//!    concurrent debits both pass a stale check.
//! 2. Transaction entries are immutable once appended. Nothing updates or
//!    deletes them.
//!
//! Balances are `u64` minor units, so a committed negative balance is
//! unrepresentable by construction; the conditional debit is what keeps the
//! arithmetic from ever needing to wrap.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tierdrop_core::{unix_now, UserId};

use crate::credits::Credits;
use crate::error::EconomyResult;

/// Category of a transaction entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnCategory {
    /// Zero-amount audit entry describing a reward grant.
    GamePlay,
    /// Negative entry: credits spent on a play or flat fee.
    Deduction,
    /// Positive entry: compensation or bulk-slot liquidation.
    Refund,
    /// Positive entry: credits bought or granted externally.
    Purchase,
}

impl TxnCategory {
    /// Stable name used in descriptions and journal records.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GamePlay => "game_play",
            Self::Deduction => "deduction",
            Self::Refund => "refund",
            Self::Purchase => "purchase",
        }
    }

    /// Converts from the journal's u8 encoding.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::GamePlay,
            1 => Self::Deduction,
            2 => Self::Refund,
            _ => Self::Purchase,
        }
    }
}

/// One immutable row of the append-only transaction log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEntry {
    /// Monotonic entry id.
    pub id: u64,
    /// The user whose balance moved.
    pub user: UserId,
    /// Signed amount in minor units: negative for spend, positive for
    /// credit/refund/purchase, zero for grant audit entries.
    pub amount_minor: i64,
    /// Entry category.
    pub category: TxnCategory,
    /// Human-readable description.
    pub description: String,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
}

/// Durable-facing store for balances and the transaction log.
///
/// In-process state is authoritative; the service journals every mutation
/// to the write-ahead log so a restart can rebuild this store exactly.
#[derive(Default)]
pub struct LedgerStore {
    /// Balances in minor units, keyed by user.
    accounts: Mutex<HashMap<UserId, u64>>,
    /// Append-only transaction log.
    log: Mutex<Vec<TransactionEntry>>,
    /// Next transaction entry id.
    next_entry_id: AtomicU64,
}

impl LedgerStore {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically debits `amount` if the balance covers it.
    ///
    /// Returns `Some(entry)` on success (the appended `deduction` entry),
    /// or `None` with no mutation and no entry when funds are insufficient.
    ///
    /// # Errors
    ///
    /// Infallible today; the `Result` is the contract for a store that may
    /// sit on fallible persistence.
    pub fn debit(
        &self,
        user: UserId,
        amount: Credits,
        description: &str,
    ) -> EconomyResult<Option<TransactionEntry>> {
        // Single conditional update: check and decrement under one lock.
        let mut accounts = self.accounts.lock();
        let balance = accounts.entry(user).or_insert(0);

        if *balance < amount.minor() {
            return Ok(None);
        }
        *balance -= amount.minor();

        // Entry append happens before the accounts lock is released, so the
        // decrement and its deduction entry form one atomic unit.
        let entry = self.append_entry(
            user,
            -(amount.minor() as i64),
            TxnCategory::Deduction,
            description,
            unix_now(),
        );
        drop(accounts);
        Ok(Some(entry))
    }

    /// Unconditionally credits `amount` and appends an entry.
    ///
    /// Used for refunds, liquidations, and purchases; `amount` must be
    /// positive - zero-amount audit entries go through [`Self::note`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EconomyError::InvalidConfig`] for a zero
    /// amount and [`crate::error::EconomyError::ArithmeticOverflow`] if the
    /// balance would overflow.
    pub fn credit(
        &self,
        user: UserId,
        amount: Credits,
        category: TxnCategory,
        description: &str,
    ) -> EconomyResult<TransactionEntry> {
        if amount.is_zero() {
            return Err(crate::error::EconomyError::InvalidConfig(
                "credit amount must be positive".to_owned(),
            ));
        }

        let mut accounts = self.accounts.lock();
        let balance = accounts.entry(user).or_insert(0);
        *balance = balance
            .checked_add(amount.minor())
            .ok_or(crate::error::EconomyError::ArithmeticOverflow)?;

        let entry = self.append_entry(
            user,
            amount.minor() as i64,
            category,
            description,
            unix_now(),
        );
        drop(accounts);
        Ok(entry)
    }

    /// Appends a zero-amount audit entry (reward grants: the credits moved
    /// at debit time, the grant itself still leaves a trace).
    pub fn note(&self, user: UserId, category: TxnCategory, description: &str) -> TransactionEntry {
        self.append_entry(user, 0, category, description, unix_now())
    }

    /// Current balance, zero for unknown users.
    #[must_use]
    pub fn balance_of(&self, user: UserId) -> Credits {
        Credits::from_minor(self.accounts.lock().get(&user).copied().unwrap_or(0))
    }

    /// All entries for a user, oldest first.
    #[must_use]
    pub fn entries_for(&self, user: UserId) -> Vec<TransactionEntry> {
        self.log
            .lock()
            .iter()
            .filter(|e| e.user == user)
            .cloned()
            .collect()
    }

    /// Total number of entries in the log.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Replays a journaled debit during recovery.
    ///
    /// Journal records only exist for debits that passed the conditional
    /// check, so replay subtracts saturating rather than re-checking.
    pub(crate) fn replay_debit(
        &self,
        user: UserId,
        amount_minor: u64,
        description: &str,
        timestamp: u64,
    ) {
        {
            let mut accounts = self.accounts.lock();
            let balance = accounts.entry(user).or_insert(0);
            *balance = balance.saturating_sub(amount_minor);
        }
        self.append_entry(
            user,
            -(amount_minor as i64),
            TxnCategory::Deduction,
            description,
            timestamp,
        );
    }

    /// Replays a journaled credit during recovery.
    pub(crate) fn replay_credit(
        &self,
        user: UserId,
        amount_minor: u64,
        category: TxnCategory,
        description: &str,
        timestamp: u64,
    ) {
        {
            let mut accounts = self.accounts.lock();
            let balance = accounts.entry(user).or_insert(0);
            *balance = balance.saturating_add(amount_minor);
        }
        self.append_entry(user, amount_minor as i64, category, description, timestamp);
    }

    /// Appends one immutable entry to the log.
    fn append_entry(
        &self,
        user: UserId,
        amount_minor: i64,
        category: TxnCategory,
        description: &str,
        timestamp: u64,
    ) -> TransactionEntry {
        let entry = TransactionEntry {
            id: self.next_entry_id.fetch_add(1, Ordering::SeqCst),
            user,
            amount_minor,
            category,
            description: description.to_owned(),
            timestamp,
        };
        self.log.lock().push(entry.clone());
        entry
    }
}

//! # Reward Granter
//!
//! The single write path for minting rewards out of a resolved game
//! session. Grants are idempotent on the session id: retries of a play
//! request (client resubmits, gateway replays) reach the same session and
//! get the already-minted pack back instead of a duplicate.

use parking_lot::Mutex;
use std::collections::HashMap;
use tierdrop_core::{GameKind, SessionId, UserId};

use crate::config::PackDefinition;
use crate::error::EconomyResult;
use crate::inventory::{InventoryStore, OwnedPack};
use crate::ledger::{LedgerStore, TxnCategory};

/// Mints packs for resolved sessions, once per session.
#[derive(Default)]
pub struct RewardGranter {
    /// Packs already minted, keyed by the session that earned them.
    granted: Mutex<HashMap<SessionId, OwnedPack>>,
}

impl RewardGranter {
    /// Creates an empty granter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `pack` for `user`, or returns the pack already minted for
    /// this session.
    ///
    /// Returns the owned pack and whether it was freshly minted. A fresh
    /// mint leaves a zero-amount audit entry in the ledger; a repeat call
    /// touches nothing.
    ///
    /// # Errors
    ///
    /// Infallible against the in-memory stores; the `Result` is the
    /// contract for fallible persistence behind them.
    pub fn grant_pack(
        &self,
        inventory: &InventoryStore,
        ledger: &LedgerStore,
        user: UserId,
        session: SessionId,
        pack: &PackDefinition,
        kind: GameKind,
        opened: bool,
    ) -> EconomyResult<(OwnedPack, bool)> {
        let mut granted = self.granted.lock();
        if let Some(existing) = granted.get(&session) {
            return Ok((existing.clone(), false));
        }

        let owned = inventory.add_pack(user, pack.id, pack.tier, kind.name(), session, opened);
        ledger.note(
            user,
            TxnCategory::GamePlay,
            &format!("granted {} ({}) via {kind}", pack.name, pack.tier),
        );
        granted.insert(session, owned.clone());
        drop(granted);

        tracing::debug!(user, session, pack = pack.id, "pack granted");
        Ok((owned, true))
    }

    /// Whether a session already produced a grant.
    #[must_use]
    pub fn has_granted(&self, session: SessionId) -> bool {
        self.granted.lock().contains_key(&session)
    }

    /// Primes the idempotency map from a journal replay.
    pub(crate) fn replay_grant(&self, session: SessionId, owned: OwnedPack) {
        self.granted.lock().insert(session, owned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::Credits;
    use tierdrop_core::Tier;

    fn pack_def() -> PackDefinition {
        PackDefinition {
            id: 11,
            name: "Ace Pack".to_string(),
            tier: Tier::A,
            price: Credits::from_whole(24),
            slots: 8,
            bulk_table: "bulk".to_string(),
            full_table: "full".to_string(),
            bulk_refund_threshold: Credits::from_parts(0, 5),
            bulk_refund_per_card: Credits::from_parts(0, 1),
        }
    }

    #[test]
    fn test_fresh_grant_mints_and_notes() {
        let granter = RewardGranter::new();
        let inventory = InventoryStore::new();
        let ledger = LedgerStore::new();

        let (owned, fresh) = granter
            .grant_pack(&inventory, &ledger, 7, 42, &pack_def(), GameKind::Plinko, false)
            .unwrap();
        assert!(fresh);
        assert_eq!(owned.user, 7);
        assert_eq!(owned.pack, 11);
        assert_eq!(inventory.packs_for(7).len(), 1);
        assert_eq!(ledger.entries_for(7).len(), 1);
        assert_eq!(ledger.entries_for(7)[0].amount_minor, 0);
    }

    #[test]
    fn test_repeat_session_is_idempotent() {
        let granter = RewardGranter::new();
        let inventory = InventoryStore::new();
        let ledger = LedgerStore::new();

        let (first, _) = granter
            .grant_pack(&inventory, &ledger, 7, 42, &pack_def(), GameKind::Plinko, false)
            .unwrap();
        let (second, fresh) = granter
            .grant_pack(&inventory, &ledger, 7, 42, &pack_def(), GameKind::Plinko, false)
            .unwrap();

        assert!(!fresh);
        assert_eq!(first.id, second.id);
        assert_eq!(inventory.packs_for(7).len(), 1);
        assert_eq!(ledger.entries_for(7).len(), 1);
    }

    #[test]
    fn test_distinct_sessions_each_grant() {
        let granter = RewardGranter::new();
        let inventory = InventoryStore::new();
        let ledger = LedgerStore::new();

        granter
            .grant_pack(&inventory, &ledger, 7, 1, &pack_def(), GameKind::Wheel, false)
            .unwrap();
        granter
            .grant_pack(&inventory, &ledger, 7, 2, &pack_def(), GameKind::Wheel, false)
            .unwrap();

        assert_eq!(inventory.packs_for(7).len(), 2);
        assert!(granter.has_granted(1));
        assert!(granter.has_granted(2));
        assert!(!granter.has_granted(3));
    }
}

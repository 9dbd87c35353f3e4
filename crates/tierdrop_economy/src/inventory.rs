//! # Inventory Store
//!
//! Owned packs and owned cards per user. Two rules:
//!
//! - Commons stack: adding a card a user already holds bumps its quantity
//!   rather than inserting a new row, keeping storage bounded under
//!   with-replacement pack draws.
//! - Nothing is silently deleted: an opened pack flips its `opened` flag
//!   and stays as provenance for the cards it produced.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tierdrop_core::{CardId, OwnedPackId, PackId, SessionId, Tier, UserId};

use crate::error::{EconomyError, EconomyResult};

/// A pack instance in a user's inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedPack {
    /// Instance id.
    pub id: OwnedPackId,
    /// Owning user.
    pub user: UserId,
    /// Pack definition this instance was minted from.
    pub pack: PackId,
    /// Rarity tier of the pack.
    pub tier: Tier,
    /// Where it came from: a game name or `"purchase"`.
    pub provenance: String,
    /// The session that granted it - the grant idempotency key.
    pub session: SessionId,
    /// Soft-consume flag; set when the pack's slots are drawn.
    pub opened: bool,
}

/// A card holding in a user's inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedCard {
    /// Owning user.
    pub user: UserId,
    /// Card definition id.
    pub card: CardId,
    /// Rarity tier of the card.
    pub tier: Tier,
    /// Stack count; duplicates from with-replacement draws land here.
    pub quantity: u32,
}

/// In-memory inventory, rebuilt from the journal on recovery.
#[derive(Default)]
pub struct InventoryStore {
    /// Owned packs per user.
    packs: Mutex<HashMap<UserId, Vec<OwnedPack>>>,
    /// Owned cards per user.
    cards: Mutex<HashMap<UserId, Vec<OwnedCard>>>,
    /// Next pack instance id.
    next_pack_id: AtomicU64,
}

impl InventoryStore {
    /// Creates an empty inventory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            packs: Mutex::new(HashMap::new()),
            cards: Mutex::new(HashMap::new()),
            next_pack_id: AtomicU64::new(1),
        }
    }

    /// Inserts a freshly granted pack instance.
    pub fn add_pack(
        &self,
        user: UserId,
        pack: PackId,
        tier: Tier,
        provenance: &str,
        session: SessionId,
        opened: bool,
    ) -> OwnedPack {
        let owned = OwnedPack {
            id: self.next_pack_id.fetch_add(1, Ordering::SeqCst),
            user,
            pack,
            tier,
            provenance: provenance.to_owned(),
            session,
            opened,
        };
        self.packs
            .lock()
            .entry(user)
            .or_default()
            .push(owned.clone());
        owned
    }

    /// Marks an owned pack opened.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::PackUnavailable`] if the instance is missing,
    /// belongs to someone else, or was already opened.
    pub fn mark_opened(&self, user: UserId, owned_pack: OwnedPackId) -> EconomyResult<OwnedPack> {
        let mut packs = self.packs.lock();
        let pack = packs
            .get_mut(&user)
            .and_then(|v| v.iter_mut().find(|p| p.id == owned_pack))
            .ok_or(EconomyError::PackUnavailable { owned_pack })?;

        if pack.opened {
            return Err(EconomyError::PackUnavailable { owned_pack });
        }
        pack.opened = true;
        Ok(pack.clone())
    }

    /// Adds cards to a user's holdings, stacking onto an existing row.
    pub fn add_card(&self, user: UserId, card: CardId, tier: Tier, quantity: u32) {
        let mut cards = self.cards.lock();
        let holdings = cards.entry(user).or_default();

        if let Some(row) = holdings.iter_mut().find(|c| c.card == card) {
            row.quantity = row.quantity.saturating_add(quantity);
        } else {
            holdings.push(OwnedCard {
                user,
                card,
                tier,
                quantity,
            });
        }
    }

    /// Total copies of one card a user holds.
    #[must_use]
    pub fn card_count(&self, user: UserId, card: CardId) -> u32 {
        self.cards
            .lock()
            .get(&user)
            .and_then(|v| v.iter().find(|c| c.card == card))
            .map_or(0, |c| c.quantity)
    }

    /// Snapshot of a user's owned packs.
    #[must_use]
    pub fn packs_for(&self, user: UserId) -> Vec<OwnedPack> {
        self.packs.lock().get(&user).cloned().unwrap_or_default()
    }

    /// Snapshot of a user's card holdings.
    #[must_use]
    pub fn cards_for(&self, user: UserId) -> Vec<OwnedCard> {
        self.cards.lock().get(&user).cloned().unwrap_or_default()
    }

    /// Restores a pack instance from the journal, keeping the id counter
    /// ahead of every replayed id.
    pub(crate) fn replay_pack(&self, owned: OwnedPack) {
        let next = owned.id + 1;
        self.next_pack_id.fetch_max(next, Ordering::SeqCst);
        self.packs
            .lock()
            .entry(owned.user)
            .or_default()
            .push(owned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_pack_assigns_ids() {
        let inv = InventoryStore::new();
        let a = inv.add_pack(1, 10, Tier::D, "plinko", 100, false);
        let b = inv.add_pack(1, 10, Tier::A, "wheel", 101, false);
        assert!(b.id > a.id);
        assert_eq!(inv.packs_for(1).len(), 2);
    }

    #[test]
    fn test_cards_stack() {
        let inv = InventoryStore::new();
        inv.add_card(1, 7, Tier::C, 2);
        inv.add_card(1, 7, Tier::C, 3);
        assert_eq!(inv.card_count(1, 7), 5);
        assert_eq!(inv.cards_for(1).len(), 1);
    }

    #[test]
    fn test_mark_opened_once() {
        let inv = InventoryStore::new();
        let pack = inv.add_pack(1, 10, Tier::D, "purchase", 100, false);

        let opened = inv.mark_opened(1, pack.id).unwrap();
        assert!(opened.opened);

        // Soft-consumed, not deleted.
        assert_eq!(inv.packs_for(1).len(), 1);
        assert!(matches!(
            inv.mark_opened(1, pack.id),
            Err(EconomyError::PackUnavailable { .. })
        ));
    }

    #[test]
    fn test_mark_opened_wrong_user() {
        let inv = InventoryStore::new();
        let pack = inv.add_pack(1, 10, Tier::D, "purchase", 100, false);
        assert!(matches!(
            inv.mark_opened(2, pack.id),
            Err(EconomyError::PackUnavailable { .. })
        ));
    }

    #[test]
    fn test_replay_keeps_id_counter_ahead() {
        let inv = InventoryStore::new();
        inv.replay_pack(OwnedPack {
            id: 41,
            user: 1,
            pack: 10,
            tier: Tier::S,
            provenance: "wheel".to_owned(),
            session: 9,
            opened: false,
        });

        let fresh = inv.add_pack(1, 10, Tier::D, "plinko", 10, false);
        assert!(fresh.id > 41);
    }
}

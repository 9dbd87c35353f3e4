//! # Arcade Service
//!
//! The facade that strings the stores together into the public
//! operations: play a game, buy and open packs, move credits, read the
//! feed. This is the only module that owns the journal and the random
//! source; everything below it is a passive store.
//!
//! ## Resolution pipeline
//!
//! Every paid operation follows the same shape:
//!
//! 1. Conditional debit (no read-then-write; insufficient funds leave
//!    no trace at all)
//! 2. Session begin
//! 3. Resolve the outcome (pure, nothing persisted)
//! 4. Apply grants, journal the whole operation as one transaction
//! 5. Session complete, feed publish (advisory)
//!
//! Any failure after the debit fails the session and issues a
//! compensating credit, so credits are never silently lost.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::Path;
use std::time::Duration;
use tierdrop_core::{unix_now, GameKind, OwnedPackId, PackId, SessionId, Tier, UserId};

use crate::cache::TtlCache;
use crate::config::EconomyConfig;
use crate::credits::Credits;
use crate::error::{EconomyError, EconomyResult};
use crate::feed::{FeedEntry, FeedPublisher};
use crate::grant::RewardGranter;
use crate::inventory::{InventoryStore, OwnedPack};
use crate::ledger::{LedgerStore, TransactionEntry, TxnCategory};
use crate::odds::OddsResolver;
use crate::packs::{PackOpener, PackOpening};
use crate::session::SessionTracker;
use crate::wal::{WalOperation, WriteAheadLog};

/// How long feed listings may be served stale.
const FEED_CACHE_TTL: Duration = Duration::from_secs(5);

/// The result of a completed play.
#[derive(Clone, Debug)]
pub struct PlayOutcome {
    /// The session that recorded the play.
    pub session: SessionId,
    /// Resolved rarity tier.
    pub tier: Tier,
    /// The pack minted for the win.
    pub pack: OwnedPack,
    /// `false` if the session had already been resolved and this is the
    /// original grant handed back.
    pub freshly_granted: bool,
}

/// The result of opening a pack.
#[derive(Clone, Debug)]
pub struct PackOpenOutcome {
    /// The purchase session, absent when opening an already-owned pack.
    pub session: Option<SessionId>,
    /// The pack definition opened.
    pub pack: PackId,
    /// Every resolved slot plus the liquidation refund.
    pub opening: PackOpening,
}

/// The reward-resolution and credit-ledger engine.
pub struct ArcadeService {
    config: EconomyConfig,
    odds: OddsResolver,
    ledger: LedgerStore,
    sessions: SessionTracker,
    inventory: InventoryStore,
    granter: RewardGranter,
    opener: PackOpener,
    feed: FeedPublisher,
    feed_cache: TtlCache<(usize, u8), Vec<FeedEntry>>,
    wal: WriteAheadLog,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ArcadeService {
    /// Opens the service with an OS-seeded random source.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] for a broken configuration
    /// and [`EconomyError::StorageUnavailable`] if the journal cannot be
    /// opened.
    pub fn open(config: EconomyConfig, wal_path: impl AsRef<Path>) -> EconomyResult<Self> {
        Self::open_with_rng(config, wal_path, Box::new(StdRng::from_entropy()))
    }

    /// Opens the service with an injected random source.
    ///
    /// Committed journal operations are replayed into the stores before
    /// the service accepts requests.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] for a broken configuration
    /// and [`EconomyError::StorageUnavailable`] if the journal cannot be
    /// opened.
    pub fn open_with_rng(
        config: EconomyConfig,
        wal_path: impl AsRef<Path>,
        rng: Box<dyn RngCore + Send>,
    ) -> EconomyResult<Self> {
        config.validate()?;

        let mut odds = OddsResolver::new();
        for table in &config.tables {
            odds.register_table(table.clone());
        }

        let (wal, committed) = WriteAheadLog::open(wal_path)?;

        let service = Self {
            feed: FeedPublisher::new(config.publish_threshold),
            config,
            odds,
            ledger: LedgerStore::new(),
            sessions: SessionTracker::new(),
            inventory: InventoryStore::new(),
            granter: RewardGranter::new(),
            opener: PackOpener::new(),
            feed_cache: TtlCache::new(),
            wal,
            rng: Mutex::new(rng),
        };

        let replayed = committed.len();
        for op in committed {
            service.replay(op);
        }
        if replayed > 0 {
            tracing::info!(operations = replayed, "journal replay complete");
        }

        Ok(service)
    }

    /// Applies one recovered journal operation to the stores.
    fn replay(&self, op: WalOperation) {
        match op {
            WalOperation::Debit { user, amount_minor, category: _, description, timestamp } => {
                self.ledger.replay_debit(user, amount_minor, &description, timestamp);
            }
            WalOperation::Credit { user, amount_minor, category, description, timestamp } => {
                self.ledger.replay_credit(
                    user,
                    amount_minor,
                    TxnCategory::from_u8(category),
                    &description,
                    timestamp,
                );
            }
            WalOperation::GrantPack { owned_pack, user, pack, tier, session, provenance, opened } => {
                let owned = OwnedPack {
                    id: owned_pack,
                    user,
                    pack,
                    tier: Tier::from_u8(tier),
                    provenance,
                    session,
                    opened,
                };
                self.inventory.replay_pack(owned.clone());
                self.granter.replay_grant(session, owned);
                self.sessions.reserve_through(session);
            }
            WalOperation::GrantCard { user, card, tier, quantity } => {
                self.inventory.add_card(user, card, Tier::from_u8(tier), quantity);
            }
            WalOperation::PackOpened { user, owned_pack } => {
                if let Err(e) = self.inventory.mark_opened(user, owned_pack) {
                    tracing::warn!(user, owned_pack, error = %e, "replay of pack opening skipped");
                }
            }
        }
    }

    /// Plays one game round end to end: debit, session, resolve, grant.
    ///
    /// Client-resolved games (plinko, the wheel) pass the outcome tag they
    /// landed on; server-resolved games draw from the configured table.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::InvalidConfig`] if the game is not configured or a
    ///   client-resolved game omits its outcome
    /// - [`EconomyError::InsufficientCredits`] if the balance does not
    ///   cover the cost (nothing is recorded)
    /// - [`EconomyError::UnknownTier`] if the outcome tag maps to no tier
    ///   or no pack; the debit is compensated and the session failed
    pub fn play_game(
        &self,
        user: UserId,
        display_name: &str,
        kind: GameKind,
        client_outcome: Option<&str>,
    ) -> EconomyResult<PlayOutcome> {
        let game = self
            .config
            .game(kind)
            .ok_or_else(|| EconomyError::InvalidConfig(format!("game '{kind}' not configured")))?
            .clone();

        let debit_entry = self
            .ledger
            .debit(user, game.cost, &format!("{kind} play"))?
            .ok_or_else(|| EconomyError::InsufficientCredits {
                required: game.cost,
                available: self.ledger.balance_of(user),
            })?;

        let session = match self.sessions.begin(user, kind, game.cost, &format!("game={kind}")) {
            Ok(id) => id,
            Err(e) => {
                self.compensate(user, game.cost, &debit_entry, "session begin failed");
                return Err(e);
            }
        };

        let tag = if kind.client_resolved() {
            match client_outcome {
                Some(tag) => tag.to_string(),
                None => {
                    let err = EconomyError::InvalidConfig(format!(
                        "game '{kind}' resolves client-side and needs an outcome tag"
                    ));
                    self.abort_session(session, user, game.cost, &debit_entry, "missing outcome");
                    return Err(err);
                }
            }
        } else {
            let mut rng = self.rng.lock();
            match self.odds.resolve_with(&game.table, rng.as_mut()) {
                Ok(tag) => tag.to_string(),
                Err(e) => {
                    drop(rng);
                    self.abort_session(session, user, game.cost, &debit_entry, "odds failure");
                    return Err(e);
                }
            }
        };

        // Unknown tags fail the play loudly instead of quietly downgrading
        // the win to the floor tier.
        let Some(tier) = Tier::from_tag(&tag) else {
            self.abort_session(session, user, game.cost, &debit_entry, "unknown tier");
            return Err(EconomyError::UnknownTier { tag });
        };
        let Some(pack_def) = self.config.pack_for_tier(tier).cloned() else {
            self.abort_session(session, user, game.cost, &debit_entry, "no pack for tier");
            return Err(EconomyError::UnknownTier { tag });
        };

        let (owned, freshly_granted) = match self.granter.grant_pack(
            &self.inventory,
            &self.ledger,
            user,
            session,
            &pack_def,
            kind,
            false,
        ) {
            Ok(granted) => granted,
            Err(e) => {
                self.abort_session(session, user, game.cost, &debit_entry, "grant failed");
                return Err(e);
            }
        };

        if freshly_granted {
            self.journal(vec![
                Self::debit_op(&debit_entry),
                WalOperation::GrantPack {
                    owned_pack: owned.id,
                    user,
                    pack: owned.pack,
                    tier: tier as u8,
                    session,
                    provenance: kind.name().to_string(),
                    opened: false,
                },
            ]);
        }

        if let Err(e) = self.sessions.complete(session, &format!("tier={tier}")) {
            tracing::warn!(session, error = %e, "session completion conflict");
        }

        self.announce(user, display_name, tier, &pack_def.name, kind);

        Ok(PlayOutcome {
            session,
            tier,
            pack: owned,
            freshly_granted,
        })
    }

    /// Buys a pack, opens all its slots, and settles the liquidation
    /// refund in one operation.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::UnknownPack`] for an unconfigured pack id
    /// - [`EconomyError::InsufficientCredits`] if the price is not covered
    /// - [`EconomyError::MisconfiguredOdds`] if a pool is broken; the
    ///   debit is compensated and the session failed
    pub fn open_pack(
        &self,
        user: UserId,
        display_name: &str,
        pack_id: PackId,
    ) -> EconomyResult<PackOpenOutcome> {
        let pack_def = self
            .config
            .pack(pack_id)
            .ok_or(EconomyError::UnknownPack { pack: pack_id })?
            .clone();

        let debit_entry = self
            .ledger
            .debit(user, pack_def.price, &format!("pack purchase: {}", pack_def.name))?
            .ok_or_else(|| EconomyError::InsufficientCredits {
                required: pack_def.price,
                available: self.ledger.balance_of(user),
            })?;

        let session = match self
            .sessions
            .begin(user, GameKind::Pack, pack_def.price, &format!("pack={pack_id}"))
        {
            Ok(id) => id,
            Err(e) => {
                self.compensate(user, pack_def.price, &debit_entry, "session begin failed");
                return Err(e);
            }
        };

        let opening = {
            let mut rng = self.rng.lock();
            match self.opener.resolve(&self.config, &self.odds, &pack_def, rng.as_mut()) {
                Ok(opening) => opening,
                Err(e) => {
                    drop(rng);
                    self.abort_session(session, user, pack_def.price, &debit_entry, "pool failure");
                    return Err(e);
                }
            }
        };

        let (owned, _) = match self.granter.grant_pack(
            &self.inventory,
            &self.ledger,
            user,
            session,
            &pack_def,
            GameKind::Pack,
            true,
        ) {
            Ok(granted) => granted,
            Err(e) => {
                self.abort_session(session, user, pack_def.price, &debit_entry, "grant failed");
                return Err(e);
            }
        };

        let mut ops = vec![
            Self::debit_op(&debit_entry),
            WalOperation::GrantPack {
                owned_pack: owned.id,
                user,
                pack: owned.pack,
                tier: pack_def.tier as u8,
                session,
                provenance: GameKind::Pack.name().to_string(),
                opened: true,
            },
        ];
        if let Err(e) = self.settle_opening(user, &opening, &mut ops) {
            self.abort_settled(session, user, pack_def.price, &mut ops, "refund settlement failed");
            self.journal(ops);
            return Err(e);
        }
        self.journal(ops);

        if let Err(e) = self
            .sessions
            .complete(session, &format!("hit={}", opening.hit.tag))
        {
            tracing::warn!(session, error = %e, "session completion conflict");
        }

        self.announce(user, display_name, opening.hit.tier, &opening.hit.name, GameKind::Pack);

        Ok(PackOpenOutcome {
            session: Some(session),
            pack: pack_id,
            opening,
        })
    }

    /// Opens a pack the user already owns (granted by an earlier win).
    ///
    /// The pack is soft-consumed: its instance stays in the inventory
    /// flagged as opened, and a second open is rejected.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::PackUnavailable`] for a missing or already-opened
    ///   instance
    /// - [`EconomyError::UnknownPack`] if its definition has since been
    ///   removed from configuration
    pub fn open_owned_pack(
        &self,
        user: UserId,
        display_name: &str,
        owned_pack: OwnedPackId,
    ) -> EconomyResult<PackOpenOutcome> {
        let instance = self
            .inventory
            .packs_for(user)
            .into_iter()
            .find(|p| p.id == owned_pack && !p.opened)
            .ok_or(EconomyError::PackUnavailable { owned_pack })?;
        let pack_def = self
            .config
            .pack(instance.pack)
            .ok_or(EconomyError::UnknownPack { pack: instance.pack })?
            .clone();

        // Resolve before consuming: a misconfigured pool must not burn the
        // pack instance.
        let opening = {
            let mut rng = self.rng.lock();
            self.opener
                .resolve(&self.config, &self.odds, &pack_def, rng.as_mut())?
        };

        self.inventory.mark_opened(user, owned_pack)?;

        let mut ops = vec![WalOperation::PackOpened { user, owned_pack }];
        let settled = self.settle_opening(user, &opening, &mut ops);
        // Journal whatever was applied even when the refund credit failed,
        // so the consumed pack and its card grants survive a restart.
        self.journal(ops);
        settled?;

        self.announce(user, display_name, opening.hit.tier, &opening.hit.name, GameKind::Pack);

        Ok(PackOpenOutcome {
            session: None,
            pack: instance.pack,
            opening,
        })
    }

    /// Removes credits for a flat fee (continues, retries, cosmetics).
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InsufficientCredits`] when the balance does
    /// not cover `amount`; nothing is recorded in that case.
    pub fn deduct_credits(
        &self,
        user: UserId,
        amount: Credits,
        description: &str,
    ) -> EconomyResult<TransactionEntry> {
        let entry = self.ledger.debit(user, amount, description)?.ok_or_else(|| {
            EconomyError::InsufficientCredits {
                required: amount,
                available: self.ledger.balance_of(user),
            }
        })?;
        self.journal(vec![Self::debit_op(&entry)]);
        Ok(entry)
    }

    /// Adds purchased or externally granted credits.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] for a zero amount and
    /// [`EconomyError::ArithmeticOverflow`] if the balance would overflow.
    pub fn grant_credits(
        &self,
        user: UserId,
        amount: Credits,
        description: &str,
    ) -> EconomyResult<TransactionEntry> {
        let entry = self
            .ledger
            .credit(user, amount, TxnCategory::Purchase, description)?;
        self.journal(vec![Self::credit_op(&entry)]);
        Ok(entry)
    }

    /// Current balance, zero for unknown users.
    #[must_use]
    pub fn balance_of(&self, user: UserId) -> Credits {
        self.ledger.balance_of(user)
    }

    /// Lists recent notable wins, served through a short-TTL cache.
    #[must_use]
    pub fn list_feed(&self, limit: usize, min_tier: Tier) -> Vec<FeedEntry> {
        self.feed_cache
            .get_or_load((limit, min_tier as u8), FEED_CACHE_TTL, || {
                self.feed.recent(limit, min_tier)
            })
    }

    /// Fails and refunds every `in_progress` session older than the
    /// configured timeout. Returns the number of sessions swept.
    pub fn sweep_stale_sessions(&self) -> usize {
        let cutoff = unix_now().saturating_sub(self.config.session_timeout_secs);
        let stale = self.sessions.in_progress_older_than(cutoff);
        let mut swept = 0;

        for session in stale {
            if let Err(e) = self.sessions.fail(session.id, "timed out") {
                tracing::warn!(session = session.id, error = %e, "stale sweep conflict");
                continue;
            }
            if !session.cost.is_zero() {
                match self.ledger.credit(
                    session.user,
                    session.cost,
                    TxnCategory::Refund,
                    &format!("timeout refund for session {}", session.id),
                ) {
                    Ok(entry) => self.journal(vec![Self::credit_op(&entry)]),
                    Err(e) => {
                        tracing::error!(session = session.id, error = %e, "timeout refund failed");
                    }
                }
            }
            swept += 1;
        }

        if swept > 0 {
            tracing::info!(swept, "stale sessions swept");
        }
        swept
    }

    /// Truncates the journal.
    ///
    /// Only call after the stores have been snapshotted to durable storage
    /// elsewhere; the journal is the sole recovery source until then.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] on io failure.
    pub fn checkpoint(&self) -> EconomyResult<()> {
        self.wal.checkpoint()
    }

    /// The transaction ledger.
    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// The pack and card inventory.
    #[must_use]
    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    /// The session tracker.
    #[must_use]
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Applies an opening's card grants and liquidation refund, pushing
    /// the matching journal operations onto `ops`.
    fn settle_opening(
        &self,
        user: UserId,
        opening: &PackOpening,
        ops: &mut Vec<WalOperation>,
    ) -> EconomyResult<()> {
        for card in opening.kept_cards() {
            self.inventory.add_card(user, card.id, card.tier, 1);
            ops.push(WalOperation::GrantCard {
                user,
                card: card.id,
                tier: card.tier as u8,
                quantity: 1,
            });
        }
        if !opening.refund_total.is_zero() {
            let entry = self.ledger.credit(
                user,
                opening.refund_total,
                TxnCategory::Refund,
                "bulk liquidation",
            )?;
            ops.push(Self::credit_op(&entry));
        }
        Ok(())
    }

    /// Fails the session and compensates the debit after a post-debit
    /// failure.
    fn abort_session(
        &self,
        session: SessionId,
        user: UserId,
        amount: Credits,
        debit: &TransactionEntry,
        reason: &str,
    ) {
        if let Err(e) = self.sessions.fail(session, reason) {
            tracing::warn!(session, error = %e, "session failure conflict");
        }
        self.compensate(user, amount, debit, reason);
    }

    /// Fails the session and refunds the debit when settlement breaks
    /// after part of the operation has already been applied.
    ///
    /// Unlike [`Self::abort_session`], the debit is already queued in
    /// `ops`, so only the compensating credit is appended; the caller
    /// journals the whole group as one transaction.
    fn abort_settled(
        &self,
        session: SessionId,
        user: UserId,
        amount: Credits,
        ops: &mut Vec<WalOperation>,
        reason: &str,
    ) {
        if let Err(e) = self.sessions.fail(session, reason) {
            tracing::warn!(session, error = %e, "session failure conflict");
        }
        match self
            .ledger
            .credit(user, amount, TxnCategory::Refund, &format!("compensation: {reason}"))
        {
            Ok(refund) => {
                ops.push(Self::credit_op(&refund));
                tracing::warn!(user, amount = %amount, reason, "debit compensated");
            }
            Err(e) => {
                tracing::error!(user, amount = %amount, error = %e, "compensation failed");
            }
        }
    }

    /// Issues the compensating credit for a debit whose operation failed,
    /// journalling the pair so the trace survives a restart.
    fn compensate(&self, user: UserId, amount: Credits, debit: &TransactionEntry, reason: &str) {
        match self
            .ledger
            .credit(user, amount, TxnCategory::Refund, &format!("compensation: {reason}"))
        {
            Ok(refund) => {
                self.journal(vec![Self::debit_op(debit), Self::credit_op(&refund)]);
                tracing::warn!(user, amount = %amount, reason, "debit compensated");
            }
            Err(e) => {
                tracing::error!(user, amount = %amount, error = %e, "compensation failed");
            }
        }
    }

    /// Publishes a win to the feed. Advisory only: failures are logged
    /// and never affect the resolution that produced them.
    fn announce(&self, user: UserId, display_name: &str, tier: Tier, item_name: &str, kind: GameKind) {
        let entry = FeedEntry {
            user,
            display_name: display_name.to_string(),
            tier,
            item_name: item_name.to_string(),
            kind,
            timestamp: unix_now(),
        };
        match self.feed.publish(entry) {
            Ok(true) => self.feed_cache.clear(),
            Ok(false) => {}
            Err(e) => tracing::warn!(user, error = %e, "feed publish skipped"),
        }
    }

    /// Writes one operation group to the journal.
    ///
    /// Journal failures are logged, not surfaced: the in-memory stores
    /// have already moved and remain authoritative for this process.
    fn journal(&self, ops: Vec<WalOperation>) {
        let write = || -> EconomyResult<()> {
            let mut txn = self.wal.begin_transaction()?;
            for op in ops {
                txn.add_operation(op)?;
            }
            txn.commit()?;
            Ok(())
        };
        if let Err(e) = write() {
            tracing::error!(error = %e, "journal write failed; stores diverge from log");
        }
    }

    fn debit_op(entry: &TransactionEntry) -> WalOperation {
        WalOperation::Debit {
            user: entry.user,
            amount_minor: entry.amount_minor.unsigned_abs(),
            category: entry.category as u8,
            description: entry.description.clone(),
            timestamp: entry.timestamp,
        }
    }

    fn credit_op(entry: &TransactionEntry) -> WalOperation {
        WalOperation::Credit {
            user: entry.user,
            amount_minor: entry.amount_minor.unsigned_abs(),
            category: entry.category as u8,
            description: entry.description.clone(),
            timestamp: entry.timestamp,
        }
    }
}

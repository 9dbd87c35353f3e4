//! # TIERDROP Economy Engine
//!
//! Reward resolution and credit ledger for the TIERDROP arcade.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - All credit amounts use fixed-point (u64 with two implicit decimals)
//! 2. **Conditional debits** - Balance checks and decrements are one atomic unit, never read-then-write
//! 3. **Compensating credits** - Any failure after a debit refunds it; credits are never silently lost
//! 4. **External configuration** - All balance data (odds, prices, pools) in TOML files
//!
//! ## Thread Safety
//!
//! Every store is internally locked and shared by reference; the
//! [`ArcadeService`] facade can be called from any number of request
//! threads. Game odds are resolved server-side; the plinko board and the
//! prize wheel are the deliberate exception and report the sector their
//! client physics landed on.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tierdrop_economy::{ArcadeService, Credits, EconomyConfig};
//! use tierdrop_core::GameKind;
//!
//! let config = EconomyConfig::from_toml_file("data/economy.toml")?;
//! let arcade = ArcadeService::open(config, "data/arcade.wal")?;
//!
//! arcade.grant_credits(user_id, Credits::from_whole(100), "starter grant")?;
//! let outcome = arcade.play_game(user_id, "display_name", GameKind::Minesweeper, None)?;
//! println!("won a {} pack", outcome.tier);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod config;
pub mod credits;
pub mod error;
pub mod feed;
pub mod grant;
pub mod inventory;
pub mod ledger;
pub mod odds;
pub mod packs;
pub mod service;
pub mod session;
pub mod wal;

pub use cache::TtlCache;
pub use config::{CardDefinition, EconomyConfig, GameConfig, PackDefinition};
pub use credits::Credits;
pub use error::{EconomyError, EconomyResult};
pub use feed::{FeedEntry, FeedPublisher};
pub use grant::RewardGranter;
pub use inventory::{InventoryStore, OwnedCard, OwnedPack};
pub use ledger::{LedgerStore, TransactionEntry, TxnCategory};
pub use odds::{OddsEntry, OddsResolver, OddsTable};
pub use packs::{PackOpener, PackOpening, SlotDraw};
pub use service::{ArcadeService, PackOpenOutcome, PlayOutcome};
pub use session::{GameSession, SessionStatus, SessionTracker};
pub use wal::{WalOperation, WriteAheadLog};

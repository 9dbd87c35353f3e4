//! # Public Reward Feed
//!
//! A bounded, in-memory ticker of notable wins. Publication is strictly
//! fire-and-forget from the resolution pipeline's point of view: a full
//! or failed feed never blocks or rolls back a grant, and feed entries
//! are not journalled.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tierdrop_core::{GameKind, Tier, UserId};

use crate::error::{EconomyError, EconomyResult};

/// Maximum entries retained; older wins fall off the back.
const FEED_CAPACITY: usize = 512;

/// One published win.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    /// Winning account.
    pub user: UserId,
    /// Name shown in the ticker.
    pub display_name: String,
    /// Tier of the win.
    pub tier: Tier,
    /// What was won (pack or card display name).
    pub item_name: String,
    /// The game that produced it.
    pub kind: GameKind,
    /// Unix timestamp of publication.
    pub timestamp: u64,
}

/// Bounded publisher for the win ticker.
pub struct FeedPublisher {
    /// Minimum tier worth announcing.
    threshold: Tier,
    /// Newest entries at the front.
    entries: Mutex<VecDeque<FeedEntry>>,
}

impl FeedPublisher {
    /// Creates a publisher that announces wins at or above `threshold`.
    #[must_use]
    pub fn new(threshold: Tier) -> Self {
        Self {
            threshold,
            entries: Mutex::new(VecDeque::with_capacity(FEED_CAPACITY)),
        }
    }

    /// The configured publish threshold.
    #[must_use]
    pub fn threshold(&self) -> Tier {
        self.threshold
    }

    /// Publishes a win if it clears the threshold.
    ///
    /// Returns `true` if the entry was published. Callers treat failures
    /// here as advisory only.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] if the display name is
    /// empty, which would render a blank ticker row.
    pub fn publish(&self, entry: FeedEntry) -> EconomyResult<bool> {
        if entry.display_name.is_empty() {
            return Err(EconomyError::InvalidConfig(
                "feed entry needs a display name".to_string(),
            ));
        }
        if entry.tier < self.threshold {
            return Ok(false);
        }

        let mut entries = self.entries.lock();
        if entries.len() >= FEED_CAPACITY {
            entries.pop_back();
        }
        entries.push_front(entry);
        Ok(true)
    }

    /// Returns up to `limit` of the newest entries at or above `min_tier`.
    #[must_use]
    pub fn recent(&self, limit: usize, min_tier: Tier) -> Vec<FeedEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.tier >= min_tier)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the feed has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tier: Tier, item: &str, ts: u64) -> FeedEntry {
        FeedEntry {
            user: 1,
            display_name: "player_one".to_string(),
            tier,
            item_name: item.to_string(),
            kind: GameKind::Plinko,
            timestamp: ts,
        }
    }

    #[test]
    fn test_below_threshold_skipped() {
        let feed = FeedPublisher::new(Tier::A);
        assert!(!feed.publish(entry(Tier::D, "Dull Pack", 1)).unwrap());
        assert!(feed.is_empty());
    }

    #[test]
    fn test_at_threshold_published_newest_first() {
        let feed = FeedPublisher::new(Tier::A);
        assert!(feed.publish(entry(Tier::A, "Ace Pack", 1)).unwrap());
        assert!(feed.publish(entry(Tier::SSS, "Crown Pack", 2)).unwrap());
        let recent = feed.recent(10, Tier::D);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].item_name, "Crown Pack");
    }

    #[test]
    fn test_min_tier_filter_and_limit() {
        let feed = FeedPublisher::new(Tier::D);
        feed.publish(entry(Tier::C, "c", 1)).unwrap();
        feed.publish(entry(Tier::S, "s", 2)).unwrap();
        feed.publish(entry(Tier::SS, "ss", 3)).unwrap();
        assert_eq!(feed.recent(10, Tier::S).len(), 2);
        assert_eq!(feed.recent(1, Tier::D).len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let feed = FeedPublisher::new(Tier::D);
        for ts in 0..(FEED_CAPACITY as u64 + 8) {
            feed.publish(entry(Tier::A, "x", ts)).unwrap();
        }
        assert_eq!(feed.len(), FEED_CAPACITY);
        // Oldest timestamps are gone
        let oldest = feed
            .recent(FEED_CAPACITY, Tier::D)
            .last()
            .unwrap()
            .timestamp;
        assert_eq!(oldest, 8);
    }

    #[test]
    fn test_blank_name_rejected() {
        let feed = FeedPublisher::new(Tier::D);
        let mut e = entry(Tier::A, "x", 1);
        e.display_name.clear();
        assert!(feed.publish(e).is_err());
    }
}

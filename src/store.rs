//! Per-auction bid state: ordered bid lists, the cached winning bid, and
//! the optimistic placement protocol.
//!
//! The store is a pure, synchronous state machine; async orchestration
//! (HTTP calls, event pumps) lives in [`crate::session`]. All mutation
//! happens through `&mut self`, matching the single-event-loop model of
//! the protocol: no internal locking, per-auction entries are fully
//! independent.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;

use crate::{
    cache::{CachedAuction, StoreCache},
    errors::Error,
    prelude::*,
    types::{AuctionId, AuctionSnapshot, AuctionUpdate, Bid, BidKey, BidStatus, Outbid, StoredBid},
    ws::message_types::LiveEvent,
};

/// Bookkeeping for the single in-flight placement of an auction.
/// `prev_winning` is kept so a rejection can restore the exact pre-call
/// winning bid.
#[derive(Debug, Clone)]
struct PendingSlot {
    local_id: u64,
    prev_winning: Option<StoredBid>,
}

#[derive(Debug, Default)]
struct AuctionEntry {
    bids: Vec<StoredBid>,
    winning: Option<StoredBid>,
    snapshot: Option<AuctionSnapshot>,
    pending: Option<PendingSlot>,
    /// Set when the entry was hydrated from a persisted cache and has not
    /// been revalidated against the server yet.
    stale: bool,
}

impl AuctionEntry {
    fn winning_amount(&self) -> Option<f64> {
        self.winning.as_ref().map(|w| w.amount)
    }

    /// Promote `candidate` to winning only when it strictly exceeds the
    /// current winning amount. An optimistic bid therefore never
    /// displaces a confirmed winning bid of equal or greater amount.
    fn challenge_winning(&mut self, candidate: &StoredBid) {
        let beaten = match self.winning_amount() {
            Some(current) => candidate.amount > current,
            None => true,
        };
        if beaten {
            self.winning = Some(candidate.clone());
        }
    }

    fn recompute_winning(&mut self) {
        self.winning = self
            .bids
            .iter()
            .max_by(|a, b| {
                a.amount
                    .partial_cmp(&b.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();
    }

    fn contains_confirmed(&self, id: &str) -> bool {
        self.bids.iter().any(|b| b.key.confirmed_id() == Some(id))
    }

    fn remove_pending(&mut self, local_id: u64) {
        self.bids.retain(|b| b.key != BidKey::Pending(local_id));
    }

    /// Settle the in-flight placement `local_id`: the provisional record
    /// is removed and, when it held the winning slot, the winner is
    /// recomputed over the remaining confirmed bids. Confirmed bids that
    /// arrived while the placement was in flight keep the slot; the
    /// pre-call winning bid (which may not be in the list) can still
    /// reclaim it.
    fn settle_pending(&mut self, local_id: u64) {
        self.remove_pending(local_id);
        let Some(slot) = self.pending.take_if(|s| s.local_id == local_id) else {
            return;
        };
        if self.winning.as_ref().map(|w| w.key == BidKey::Pending(local_id)) == Some(true) {
            self.recompute_winning();
            if let Some(prev) = slot.prev_winning {
                self.challenge_winning(&prev);
            }
        }
    }

    /// Bid-driven price increase on the cached snapshot.
    fn bump_price(&mut self, auction_id: &str, amount: f64) {
        let snapshot = self.snapshot.get_or_insert_with(|| AuctionSnapshot {
            auction_id: auction_id.to_owned(),
            ..Default::default()
        });
        if snapshot.current_price.map(|p| amount > p).unwrap_or(true) {
            snapshot.current_price = Some(amount);
        }
    }
}

/// The single source of truth for live auction bid state on the client.
///
/// Entries exist only between [`subscribe`](Self::subscribe) and
/// [`unsubscribe`](Self::unsubscribe); events and fetch results for
/// auctions without an entry are discarded, never cached.
#[derive(Debug, Default)]
pub struct BidStore {
    auctions: HashMap<AuctionId, AuctionEntry>,
    bid_error: Option<String>,
    next_local_id: u64,
}

impl BidStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Subscription lifecycle
    // -------------------------------------------------------------------

    /// Create the per-auction entry. Idempotent: an existing entry (and
    /// its data) is left untouched.
    pub fn subscribe(&mut self, auction_id: &str) {
        self.auctions.entry(auction_id.to_owned()).or_default();
    }

    /// Tear down the per-auction entry, freeing its bid list and caches.
    /// Returns whether an entry existed. Any in-flight placement result
    /// arriving afterwards is discarded by the session.
    pub fn unsubscribe(&mut self, auction_id: &str) -> bool {
        self.auctions.remove(auction_id).is_some()
    }

    pub fn is_subscribed(&self, auction_id: &str) -> bool {
        self.auctions.contains_key(auction_id)
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Bid list in arrival order.
    pub fn bids(&self, auction_id: &str) -> Option<&[StoredBid]> {
        self.auctions.get(auction_id).map(|e| e.bids.as_slice())
    }

    /// Bid list ordered by amount descending, for display.
    pub fn bids_by_amount(&self, auction_id: &str) -> Vec<&StoredBid> {
        let mut bids: Vec<&StoredBid> = self
            .auctions
            .get(auction_id)
            .map(|e| e.bids.iter().collect())
            .unwrap_or_default();
        bids.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        bids
    }

    pub fn winning_bid(&self, auction_id: &str) -> Option<&StoredBid> {
        self.auctions.get(auction_id)?.winning.as_ref()
    }

    pub fn snapshot(&self, auction_id: &str) -> Option<&AuctionSnapshot> {
        self.auctions.get(auction_id)?.snapshot.as_ref()
    }

    /// Whether a placement is in flight for this auction.
    pub fn is_placing(&self, auction_id: &str) -> bool {
        self.auctions
            .get(auction_id)
            .map(|e| e.pending.is_some())
            .unwrap_or(false)
    }

    /// Whether the entry came from a persisted cache and still awaits
    /// revalidation.
    pub fn is_stale(&self, auction_id: &str) -> bool {
        self.auctions
            .get(auction_id)
            .map(|e| e.stale)
            .unwrap_or(false)
    }

    /// Last placement failure, human readable. Cleared explicitly or by a
    /// later failure overwriting it.
    pub fn bid_error(&self) -> Option<&str> {
        self.bid_error.as_deref()
    }

    pub fn clear_bid_error(&mut self) {
        self.bid_error = None;
    }

    // -------------------------------------------------------------------
    // Hard refresh from the request/response channel
    // -------------------------------------------------------------------

    /// Replace the cached bid list entirely (not merged) and recompute
    /// the winning bid from it. Clears the stale flag.
    pub fn replace_bids(&mut self, auction_id: &str, bids: Vec<Bid>) -> bool {
        let Some(entry) = self.auctions.get_mut(auction_id) else {
            debug!("Discarding bid list for unsubscribed auction {auction_id}");
            return false;
        };
        entry.bids = bids.into_iter().map(StoredBid::from).collect();
        entry.recompute_winning();
        entry.stale = false;
        true
    }

    /// Replace the cached winning bid with the authoritative one.
    pub fn replace_winning_bid(&mut self, auction_id: &str, bid: Option<Bid>) -> bool {
        let Some(entry) = self.auctions.get_mut(auction_id) else {
            debug!("Discarding winning bid for unsubscribed auction {auction_id}");
            return false;
        };
        entry.winning = bid.map(StoredBid::from);
        entry.stale = false;
        true
    }

    // -------------------------------------------------------------------
    // Optimistic placement protocol
    // -------------------------------------------------------------------

    /// Start an optimistic placement: validate the amount, insert a
    /// `Pending` record, and provisionally promote it to winning when it
    /// beats the current winning amount.
    ///
    /// Rejects before any record is created when the amount is not a
    /// positive finite number, when the auction is not subscribed, or
    /// when another placement is already in flight for it (one pending
    /// bid per auction at a time).
    pub fn begin_place(&mut self, auction_id: &str, amount: f64) -> Result<u64> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidBidAmount(amount));
        }
        let Some(entry) = self.auctions.get_mut(auction_id) else {
            return Err(Error::NotSubscribed(auction_id.to_owned()));
        };
        if entry.pending.is_some() {
            return Err(Error::BidInFlight(auction_id.to_owned()));
        }

        let local_id = self.next_local_id;
        self.next_local_id += 1;

        let optimistic = StoredBid {
            key: BidKey::Pending(local_id),
            auction_id: auction_id.to_owned(),
            amount,
            status: BidStatus::Placed,
            bidder: None,
            created_at: None,
        };

        let prev_winning = entry.winning.clone();
        entry.challenge_winning(&optimistic);
        entry.bids.push(optimistic);
        entry.pending = Some(PendingSlot {
            local_id,
            prev_winning,
        });

        Ok(local_id)
    }

    /// Promote the optimistic record: the `Pending` row is removed, the
    /// server bid inserted (idempotent by id, in case the `newBid` event
    /// arrived first), and the winning bid recomputed as the max over
    /// confirmed amounts.
    pub fn complete_place(&mut self, auction_id: &str, local_id: u64, bid: Bid) -> bool {
        let Some(entry) = self.auctions.get_mut(auction_id) else {
            debug!("Discarding placement result for unsubscribed auction {auction_id}");
            return false;
        };

        entry.settle_pending(local_id);

        let confirmed: StoredBid = bid.into();
        entry.bump_price(auction_id, confirmed.amount);
        if let Some(id) = confirmed.key.confirmed_id() {
            if entry.contains_confirmed(id) {
                entry.challenge_winning(&confirmed);
                return true;
            }
        }
        entry.challenge_winning(&confirmed);
        entry.bids.push(confirmed);
        true
    }

    /// Roll back a failed placement: the `Pending` record is removed, the
    /// winning bid recomputed over the confirmed bids (which may include
    /// bids that arrived while the request was in flight), and the
    /// failure recorded as the store's single human-readable `bid_error`.
    /// There is no automatic retry.
    pub fn fail_place(&mut self, auction_id: &str, local_id: u64, message: String) -> bool {
        let Some(entry) = self.auctions.get_mut(auction_id) else {
            debug!("Discarding placement failure for unsubscribed auction {auction_id}");
            return false;
        };

        entry.settle_pending(local_id);
        self.bid_error = Some(message);
        true
    }

    // -------------------------------------------------------------------
    // Reconciliation of inbound events
    // -------------------------------------------------------------------

    /// Merge one inbound event. Returns an outbid notice for the UI when
    /// the event was informational; data-carrying events mutate the store
    /// and return `None`.
    pub fn apply_event(&mut self, event: &LiveEvent) -> Option<Outbid> {
        match event {
            LiveEvent::NewBid(bid) => {
                self.apply_new_bid(bid.clone());
                None
            }
            LiveEvent::AuctionUpdate(update) => {
                self.apply_auction_update(update);
                None
            }
            LiveEvent::Outbid(outbid) => {
                if self.is_subscribed(&outbid.auction_id) {
                    Some(outbid.clone())
                } else {
                    None
                }
            }
        }
    }

    /// Idempotent-by-id insert of a confirmed bid. Inserting a bid whose
    /// id already exists is a no-op; the event stream may redeliver the
    /// same logical bid that the placement response already reconciled.
    /// Returns whether the bid was inserted.
    pub fn apply_new_bid(&mut self, bid: Bid) -> bool {
        let auction_id = bid.auction_id.clone();
        let Some(entry) = self.auctions.get_mut(&auction_id) else {
            debug!("Discarding bid event for unsubscribed auction {auction_id}");
            return false;
        };
        if entry.contains_confirmed(&bid.id) {
            return false;
        }

        let stored: StoredBid = bid.into();
        entry.bump_price(&auction_id, stored.amount);
        entry.challenge_winning(&stored);
        entry.bids.push(stored);
        true
    }

    /// Field-wise last-write-wins merge of a partial auction update into
    /// the cached snapshot. No ordering or version check is performed; a
    /// stale update can overwrite a fresher one.
    pub fn apply_auction_update(&mut self, update: &AuctionUpdate) -> bool {
        let Some(entry) = self.auctions.get_mut(&update.auction_id) else {
            debug!(
                "Discarding auction update for unsubscribed auction {}",
                update.auction_id
            );
            return false;
        };

        let snapshot = entry.snapshot.get_or_insert_with(|| AuctionSnapshot {
            auction_id: update.auction_id.clone(),
            ..Default::default()
        });
        if let Some(price) = update.current_price {
            snapshot.current_price = Some(price);
        }
        if let Some(end_time) = &update.end_time {
            snapshot.end_time = Some(end_time.clone());
        }
        if let Some(status) = &update.status {
            snapshot.status = Some(status.clone());
        }
        if let Some(time_remaining) = update.time_remaining {
            snapshot.time_remaining = Some(time_remaining);
        }
        snapshot.updated_at = Some(update.timestamp);
        true
    }

    // -------------------------------------------------------------------
    // Persisted cache
    // -------------------------------------------------------------------

    /// Snapshot confirmed data for persistence. Pending placements and
    /// the transient error are never exported.
    pub fn export(&self) -> StoreCache {
        let auctions = self
            .auctions
            .iter()
            .map(|(auction_id, entry)| {
                (
                    auction_id.clone(),
                    CachedAuction {
                        bids: entry
                            .bids
                            .iter()
                            .filter(|b| !b.is_pending())
                            .cloned()
                            .collect(),
                        winning: entry.winning.clone().filter(|w| !w.is_pending()),
                        snapshot: entry.snapshot.clone(),
                    },
                )
            })
            .collect();
        StoreCache {
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            auctions,
        }
    }

    /// Load a persisted snapshot. Expired caches are dropped wholesale;
    /// hydrated entries are subscribed and marked stale so they are not
    /// trusted as authoritative until refetched. Returns the number of
    /// auctions hydrated.
    pub fn hydrate(&mut self, cache: StoreCache, ttl: Duration) -> usize {
        if cache.is_expired(ttl) {
            debug!("Persisted store cache expired; ignoring");
            return 0;
        }
        let mut hydrated = 0;
        for (auction_id, cached) in cache.auctions {
            let entry = self.auctions.entry(auction_id).or_default();
            entry.bids = cached.bids;
            entry.winning = cached.winning;
            entry.snapshot = cached.snapshot;
            entry.stale = true;
            hydrated += 1;
        }
        hydrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bidder;

    fn bid(id: &str, auction_id: &str, amount: f64) -> Bid {
        Bid {
            id: id.to_owned(),
            auction_id: auction_id.to_owned(),
            bidder_id: "u1".to_owned(),
            bidder: Bidder {
                id: "u1".to_owned(),
                name: "Ana".to_owned(),
                email: "ana@example.com".to_owned(),
            },
            amount,
            status: BidStatus::Placed,
            created_at: "2024-05-01T10:00:00Z".to_owned(),
            bid_history: None,
        }
    }

    fn store_with(auction_id: &str, bids: Vec<Bid>) -> BidStore {
        let mut store = BidStore::new();
        store.subscribe(auction_id);
        store.replace_bids(auction_id, bids);
        store
    }

    // =========================================================================
    // Placement validation
    // =========================================================================

    #[test]
    fn test_rejects_nonpositive_amount() {
        let mut store = store_with("a1", vec![]);
        assert!(matches!(
            store.begin_place("a1", 0.0),
            Err(Error::InvalidBidAmount(_))
        ));
        assert!(matches!(
            store.begin_place("a1", -5.0),
            Err(Error::InvalidBidAmount(_))
        ));
        assert!(matches!(
            store.begin_place("a1", f64::NAN),
            Err(Error::InvalidBidAmount(_))
        ));
        assert!(store.bids("a1").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unsubscribed_auction() {
        let mut store = BidStore::new();
        assert!(matches!(
            store.begin_place("a1", 10.0),
            Err(Error::NotSubscribed(_))
        ));
    }

    #[test]
    fn test_one_pending_placement_per_auction() {
        let mut store = store_with("a1", vec![]);
        store.begin_place("a1", 10.0).unwrap();
        assert!(store.is_placing("a1"));
        assert!(matches!(
            store.begin_place("a1", 20.0),
            Err(Error::BidInFlight(_))
        ));
        // Other auctions are unaffected.
        store.subscribe("a2");
        store.begin_place("a2", 20.0).unwrap();
    }

    // =========================================================================
    // Optimistic promotion and rollback
    // =========================================================================

    #[test]
    fn test_optimistic_promotion_scenario() {
        // Confirmed bids [50, 80], winning 80. Place 90, server confirms b3.
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0), bid("b2", "a1", 80.0)]);
        assert_eq!(store.winning_bid("a1").unwrap().amount, 80.0);

        let local_id = store.begin_place("a1", 90.0).unwrap();
        let winning = store.winning_bid("a1").unwrap();
        assert!(winning.is_pending());
        assert_eq!(winning.amount, 90.0);

        assert!(store.complete_place("a1", local_id, bid("b3", "a1", 90.0)));

        let bids = store.bids("a1").unwrap();
        assert_eq!(bids.len(), 3);
        assert!(bids.iter().all(|b| !b.is_pending()));
        assert_eq!(
            bids.iter()
                .filter(|b| b.key.confirmed_id() == Some("b3"))
                .count(),
            1
        );
        let winning = store.winning_bid("a1").unwrap();
        assert_eq!(winning.key.confirmed_id(), Some("b3"));
        assert_eq!(winning.amount, 90.0);
        assert!(!store.is_placing("a1"));
    }

    #[test]
    fn test_rollback_restores_exact_pre_call_state() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0), bid("b2", "a1", 80.0)]);

        let local_id = store.begin_place("a1", 100.0).unwrap();
        assert!(store.fail_place("a1", local_id, "auction closed".to_owned()));

        let bids = store.bids("a1").unwrap();
        assert_eq!(bids.len(), 2);
        assert!(bids.iter().all(|b| !b.is_pending()));
        let winning = store.winning_bid("a1").unwrap();
        assert_eq!(winning.key.confirmed_id(), Some("b2"));
        assert_eq!(winning.amount, 80.0);
        assert_eq!(store.bid_error(), Some("auction closed"));
        assert!(!store.is_placing("a1"));
    }

    #[test]
    fn test_rollback_after_below_increment_rejection() {
        // Positive amounts pass client validation and can still be
        // rejected server-side; rollback must be full either way.
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0)]);
        let local_id = store.begin_place("a1", 5.0).unwrap();
        store.fail_place("a1", local_id, "bid below minimum increment".to_owned());

        assert_eq!(store.bids("a1").unwrap().len(), 1);
        assert_eq!(store.winning_bid("a1").unwrap().amount, 50.0);
        assert!(store.bid_error().is_some());
    }

    #[test]
    fn test_rollback_keeps_confirmed_bid_arrived_in_flight() {
        // A rival's confirmed bid lands while our placement is in flight
        // and then the server rejects us. The rollback must settle on the
        // rival bid, not on the pre-call winner it already beat.
        let mut store = store_with("a1", vec![bid("b1", "a1", 80.0)]);
        let local_id = store.begin_place("a1", 90.0).unwrap();
        store.apply_new_bid(bid("b2", "a1", 85.0));

        assert!(store.fail_place("a1", local_id, "auction closed".to_owned()));

        let winning = store.winning_bid("a1").unwrap();
        assert_eq!(winning.key.confirmed_id(), Some("b2"));
        assert_eq!(winning.amount, 85.0);
        assert!(store.bids("a1").unwrap().iter().all(|b| !b.is_pending()));
    }

    #[test]
    fn test_promotion_settles_over_bid_arrived_in_flight() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 80.0)]);
        let local_id = store.begin_place("a1", 90.0).unwrap();
        store.apply_new_bid(bid("b2", "a1", 85.0));

        assert!(store.complete_place("a1", local_id, bid("b3", "a1", 90.0)));

        let winning = store.winning_bid("a1").unwrap();
        assert_eq!(winning.key.confirmed_id(), Some("b3"));
        assert_eq!(winning.amount, 90.0);
        assert_eq!(store.bids("a1").unwrap().len(), 3);
    }

    #[test]
    fn test_optimistic_never_displaces_equal_confirmed_winning() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 100.0)]);
        store.begin_place("a1", 100.0).unwrap();
        let winning = store.winning_bid("a1").unwrap();
        assert_eq!(winning.key.confirmed_id(), Some("b1"));
    }

    #[test]
    fn test_promotion_when_event_arrived_first() {
        // The newBid socket event for our own bid can beat the HTTP
        // response; the later promotion must not duplicate it.
        let mut store = store_with("a1", vec![]);
        let local_id = store.begin_place("a1", 90.0).unwrap();

        assert!(store.apply_new_bid(bid("b3", "a1", 90.0)));
        store.complete_place("a1", local_id, bid("b3", "a1", 90.0));

        let bids = store.bids("a1").unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].key.confirmed_id(), Some("b3"));
        assert!(!store.is_placing("a1"));
    }

    #[test]
    fn test_clear_bid_error() {
        let mut store = store_with("a1", vec![]);
        let local_id = store.begin_place("a1", 10.0).unwrap();
        store.fail_place("a1", local_id, "rejected".to_owned());
        assert!(store.bid_error().is_some());
        store.clear_bid_error();
        assert!(store.bid_error().is_none());
    }

    // =========================================================================
    // Event reconciliation
    // =========================================================================

    #[test]
    fn test_winning_bid_monotonic_over_event_sequence() {
        let mut store = store_with("a1", vec![]);
        let amounts = [50.0, 80.0, 60.0, 80.0, 100.0];
        let mut max_seen: f64 = 0.0;
        for (i, amount) in amounts.iter().enumerate() {
            store.apply_new_bid(bid(&format!("b{i}"), "a1", *amount));
            max_seen = max_seen.max(*amount);
            assert_eq!(store.winning_bid("a1").unwrap().amount, max_seen);
        }
    }

    #[test]
    fn test_duplicate_new_bid_event_is_noop() {
        let mut store = store_with("a1", vec![]);
        assert!(store.apply_new_bid(bid("b1", "a1", 50.0)));
        assert!(!store.apply_new_bid(bid("b1", "a1", 50.0)));
        assert_eq!(store.bids("a1").unwrap().len(), 1);
    }

    #[test]
    fn test_event_for_unsubscribed_auction_discarded() {
        let mut store = BidStore::new();
        assert!(!store.apply_new_bid(bid("b1", "a1", 50.0)));
        assert!(store.bids("a1").is_none());
    }

    #[test]
    fn test_unsubscribe_tears_down_entry() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0)]);
        assert!(store.unsubscribe("a1"));
        assert!(store.bids("a1").is_none());
        assert!(store.winning_bid("a1").is_none());
        // Later events for the torn-down auction no longer mutate state.
        assert!(!store.apply_new_bid(bid("b2", "a1", 80.0)));
    }

    #[test]
    fn test_auction_update_lww_field_merge() {
        let mut store = store_with("a1", vec![]);
        store.apply_auction_update(&AuctionUpdate {
            auction_id: "a1".to_owned(),
            current_price: Some(120.0),
            end_time: None,
            status: None,
            time_remaining: None,
            timestamp: 100,
        });
        store.apply_auction_update(&AuctionUpdate {
            auction_id: "a1".to_owned(),
            current_price: None,
            end_time: None,
            status: Some("ENDED".to_owned()),
            time_remaining: None,
            timestamp: 200,
        });

        let snapshot = store.snapshot("a1").unwrap();
        assert_eq!(snapshot.current_price, Some(120.0));
        assert_eq!(snapshot.status.as_deref(), Some("ENDED"));
        assert_eq!(snapshot.updated_at, Some(200));
    }

    #[test]
    fn test_outbid_event_is_informational() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0)]);
        let event = LiveEvent::Outbid(Outbid {
            auction_id: "a1".to_owned(),
            new_bid_amount: 80.0,
            message: "You have been outbid".to_owned(),
            timestamp: 100,
        });
        let notice = store.apply_event(&event).unwrap();
        assert_eq!(notice.new_bid_amount, 80.0);
        // No data change: the accompanying newBid carries that.
        assert_eq!(store.bids("a1").unwrap().len(), 1);
        assert_eq!(store.winning_bid("a1").unwrap().amount, 50.0);
    }

    #[test]
    fn test_new_bid_bumps_snapshot_price() {
        let mut store = store_with("a1", vec![]);
        store.apply_new_bid(bid("b1", "a1", 75.0));
        assert_eq!(store.snapshot("a1").unwrap().current_price, Some(75.0));
        // A lower bid never lowers the price.
        store.apply_new_bid(bid("b2", "a1", 60.0));
        assert_eq!(store.snapshot("a1").unwrap().current_price, Some(75.0));
    }

    // =========================================================================
    // Hard refresh
    // =========================================================================

    #[test]
    fn test_replace_bids_is_not_a_merge() {
        let mut store = store_with("a1", vec![bid("b1", "a1", 50.0)]);
        store.begin_place("a1", 90.0).unwrap();

        store.replace_bids("a1", vec![bid("b7", "a1", 70.0), bid("b8", "a1", 85.0)]);

        let bids = store.bids("a1").unwrap();
        assert_eq!(bids.len(), 2);
        assert!(bids.iter().all(|b| !b.is_pending()));
        assert_eq!(store.winning_bid("a1").unwrap().amount, 85.0);
    }

    #[test]
    fn test_replace_winning_bid() {
        let mut store = store_with("a1", vec![]);
        store.replace_winning_bid("a1", Some(bid("b9", "a1", 200.0)));
        assert_eq!(
            store.winning_bid("a1").unwrap().key.confirmed_id(),
            Some("b9")
        );
        store.replace_winning_bid("a1", None);
        assert!(store.winning_bid("a1").is_none());
    }

    #[test]
    fn test_bids_by_amount_is_descending() {
        let store = store_with(
            "a1",
            vec![
                bid("b1", "a1", 50.0),
                bid("b2", "a1", 90.0),
                bid("b3", "a1", 70.0),
            ],
        );
        let amounts: Vec<f64> = store
            .bids_by_amount("a1")
            .iter()
            .map(|b| b.amount)
            .collect();
        assert_eq!(amounts, vec![90.0, 70.0, 50.0]);
    }
}

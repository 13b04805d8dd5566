//! Data model for the live auction channel: wire types shared with the
//! server and the store-side bid records.

use serde::{Deserialize, Serialize};

pub type AuctionId = String;

/// Server-assigned bid lifecycle status.
///
/// Transitions (`PLACED -> {WINNING | OUTBID} -> {WON | LOST}`) are driven
/// exclusively by the server; the client never reassigns a status locally.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Placed,
    Outbid,
    Winning,
    Won,
    Lost,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bidder {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BidHistoryEntry {
    pub bid_time: String,
    pub previous_price: f64,
}

/// A server-confirmed bid as it appears on the wire.
///
/// Immutable once confirmed: `status` may be reassigned by later events,
/// `id`, `amount`, `auction_id` and `bidder_id` never change.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub auction_id: AuctionId,
    pub bidder_id: String,
    pub bidder: Bidder,
    pub amount: f64,
    pub status: BidStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_history: Option<Vec<BidHistoryEntry>>,
}

/// Identity of a bid in the store.
///
/// An optimistic placement starts life as `Pending` with a locally
/// allocated id and is either promoted to `Confirmed` (server id) or
/// removed entirely. Promotion is a type-level transition, not a magic
/// sentinel string in the id field.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum BidKey {
    Pending(u64),
    Confirmed(String),
}

impl BidKey {
    pub fn is_pending(&self) -> bool {
        matches!(self, BidKey::Pending(_))
    }

    pub fn confirmed_id(&self) -> Option<&str> {
        match self {
            BidKey::Confirmed(id) => Some(id),
            BidKey::Pending(_) => None,
        }
    }
}

/// A bid as held by the store. Pending records carry no bidder or
/// timestamp; those fields arrive with server confirmation.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StoredBid {
    pub key: BidKey,
    pub auction_id: AuctionId,
    pub amount: f64,
    pub status: BidStatus,
    pub bidder: Option<Bidder>,
    pub created_at: Option<String>,
}

impl StoredBid {
    pub fn is_pending(&self) -> bool {
        self.key.is_pending()
    }
}

impl From<Bid> for StoredBid {
    fn from(bid: Bid) -> Self {
        StoredBid {
            key: BidKey::Confirmed(bid.id),
            auction_id: bid.auction_id,
            amount: bid.amount,
            status: bid.status,
            bidder: Some(bid.bidder),
            created_at: Some(bid.created_at),
        }
    }
}

/// Client-observed auction state, mutated only by `auctionUpdate` events
/// or by bid-driven price increases.
///
/// `status` is carried verbatim; the server does not publish a closed set
/// of values.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    pub auction_id: AuctionId,
    pub current_price: Option<f64>,
    pub end_time: Option<String>,
    pub status: Option<String>,
    pub time_remaining: Option<u64>,
    /// Timestamp of the last applied `auctionUpdate`. Informational only:
    /// merges are last-write-wins with no ordering check.
    pub updated_at: Option<u64>,
}

/// Partial auction state pushed by the server. Absent fields leave the
/// cached snapshot untouched.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuctionUpdate {
    pub auction_id: AuctionId,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time_remaining: Option<u64>,
    pub timestamp: u64,
}

/// Notification that the user has been outbid. Informational: the data
/// change travels in the accompanying `newBid`/`auctionUpdate` events.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Outbid {
    pub auction_id: AuctionId,
    pub new_bid_amount: f64,
    pub message: String,
    pub timestamp: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Response of `GET /auctions/:id/bids`.
#[derive(Deserialize, Clone, Debug)]
pub struct BidPage {
    pub bids: Vec<Bid>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&BidStatus::Outbid).unwrap(),
            "\"OUTBID\""
        );
        let status: BidStatus = serde_json::from_str("\"WINNING\"").unwrap();
        assert_eq!(status, BidStatus::Winning);
    }

    #[test]
    fn test_bid_deserializes_without_history() {
        let raw = r#"{
            "id": "b1",
            "auctionId": "a1",
            "bidderId": "u1",
            "bidder": {"id": "u1", "name": "Ana", "email": "ana@example.com"},
            "amount": 50.0,
            "status": "PLACED",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let bid: Bid = serde_json::from_str(raw).unwrap();
        assert_eq!(bid.id, "b1");
        assert!(bid.bid_history.is_none());
    }

    #[test]
    fn test_stored_bid_promotion_is_confirmed() {
        let raw = r#"{
            "id": "b2",
            "auctionId": "a1",
            "bidderId": "u1",
            "bidder": {"id": "u1", "name": "Ana", "email": "ana@example.com"},
            "amount": 75.5,
            "status": "WINNING",
            "createdAt": "2024-05-01T10:05:00Z"
        }"#;
        let bid: Bid = serde_json::from_str(raw).unwrap();
        let stored: StoredBid = bid.into();
        assert!(!stored.is_pending());
        assert_eq!(stored.key.confirmed_id(), Some("b2"));
    }

    #[test]
    fn test_auction_update_partial_fields() {
        let raw = r#"{"auctionId": "a1", "currentPrice": 120.0, "timestamp": 1714557900}"#;
        let update: AuctionUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.current_price, Some(120.0));
        assert!(update.end_time.is_none());
        assert!(update.status.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::types::{AuctionUpdate, Bid, Outbid};

/// An inbound event on the live channel. Every payload embeds the
/// auction it belongs to; routing happens on that key before delivery.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum LiveEvent {
    NewBid(Bid),
    AuctionUpdate(AuctionUpdate),
    Outbid(Outbid),
}

impl LiveEvent {
    /// The auction this event belongs to.
    pub fn auction_id(&self) -> &str {
        match self {
            LiveEvent::NewBid(bid) => &bid.auction_id,
            LiveEvent::AuctionUpdate(update) => &update.auction_id,
            LiveEvent::Outbid(outbid) => &outbid.auction_id,
        }
    }
}

/// What a room subscriber receives. Connection-level signals are
/// broadcast to every subscriber; events are routed per room.
#[derive(Clone, Debug)]
pub enum RoomMessage {
    Event(LiveEvent),
    /// The connection dropped; reconnection (if any) is in progress.
    Disconnected,
    /// The reader failed to decode an inbound frame.
    ChannelError(String),
}

/// Outbound frame sent to the auction server.
#[derive(Serialize, Debug)]
#[serde(tag = "action", rename_all = "camelCase")]
pub(crate) enum ClientFrame<'a> {
    #[serde(rename_all = "camelCase")]
    JoinAuction { auction_id: &'a str },
    #[serde(rename_all = "camelCase")]
    LeaveAuction { auction_id: &'a str },
    /// Client-originated bid broadcast, used by flows that fan a freshly
    /// confirmed bid back out on the channel.
    NewBid { bid: &'a Bid },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bid_json() -> &'static str {
        r#"{
            "event": "newBid",
            "data": {
                "id": "b7",
                "auctionId": "a3",
                "bidderId": "u2",
                "bidder": {"id": "u2", "name": "Ben", "email": "ben@example.com"},
                "amount": 42.5,
                "status": "PLACED",
                "createdAt": "2024-05-01T11:00:00Z"
            }
        }"#
    }

    #[test]
    fn test_new_bid_envelope_decodes() {
        let event: LiveEvent = serde_json::from_str(sample_bid_json()).unwrap();
        assert_eq!(event.auction_id(), "a3");
        match event {
            LiveEvent::NewBid(bid) => assert_eq!(bid.amount, 42.5),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_auction_update_envelope_decodes() {
        let raw = r#"{
            "event": "auctionUpdate",
            "data": {"auctionId": "a3", "currentPrice": 99.0, "timestamp": 1714557000}
        }"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.auction_id(), "a3");
    }

    #[test]
    fn test_outbid_envelope_decodes() {
        let raw = r#"{
            "event": "outbid",
            "data": {
                "auctionId": "a9",
                "newBidAmount": 150.0,
                "message": "You have been outbid",
                "timestamp": 1714557600
            }
        }"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        match event {
            LiveEvent::Outbid(outbid) => assert_eq!(outbid.new_bid_amount, 150.0),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_join_frame_wire_form() {
        let frame = ClientFrame::JoinAuction { auction_id: "a3" };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"action":"joinAuction","auctionId":"a3"}"#
        );
    }
}

//! Ties the [`AuctionClient`] to the [`BidStore`]: the async placement
//! flow, fetch-and-replace operations, and the discard rule for results
//! that land after their auction was unsubscribed.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    client::AuctionClient,
    prelude::*,
    store::BidStore,
    types::{Bid, Outbid},
    ws::message_types::{LiveEvent, RoomMessage},
};

/// Result of a placement attempt that got past local validation.
#[derive(Debug, Clone)]
pub enum PlaceBidOutcome {
    /// The server confirmed the bid; the optimistic record was promoted.
    Confirmed(Bid),
    /// The server rejected the bid; the optimistic record was rolled back
    /// and the message recorded as the store's `bid_error`.
    Rejected { message: String },
    /// The auction was unsubscribed while the request was in flight; the
    /// result was discarded without touching the store.
    Discarded,
}

/// One client process's view of the live auctions it watches.
///
/// The store is the single source of truth; HTTP fetch results feed it
/// via hard replace, socket events via [`apply_message`](Self::apply_message).
pub struct LiveAuctionSession {
    client: AuctionClient,
    store: BidStore,
}

impl LiveAuctionSession {
    pub fn new(client: AuctionClient) -> Self {
        Self {
            client,
            store: BidStore::new(),
        }
    }

    pub fn store(&self) -> &BidStore {
        &self.store
    }

    pub fn client(&self) -> &AuctionClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut AuctionClient {
        &mut self.client
    }

    /// Establish the live channel (idempotent, see
    /// [`AuctionClient::connect`]).
    pub async fn connect(&mut self) -> Result<()> {
        self.client.connect().await
    }

    pub async fn disconnect(&mut self) {
        self.client.disconnect().await;
    }

    /// Create the store entry for an auction and join its room. The store
    /// entry exists even when the join was dropped for lack of a
    /// connection, so HTTP fetches still work; `Ok(None)` signals that no
    /// events will flow until a reconnect-and-rejoin.
    pub async fn subscribe_auction(
        &mut self,
        auction_id: &str,
        sender: UnboundedSender<Arc<RoomMessage>>,
    ) -> Result<Option<u32>> {
        self.store.subscribe(auction_id);
        self.client.join_auction_room(auction_id, sender).await
    }

    /// Tear down the auction: leave the room and free the cached state.
    /// Stops event-driven mutation for the auction synchronously; any
    /// in-flight placement or fetch result is discarded on arrival.
    pub async fn unsubscribe_auction(&mut self, auction_id: &str) -> Result<()> {
        self.store.unsubscribe(auction_id);
        self.client.leave_auction_room(auction_id).await
    }

    /// Hard refresh of the bid list over HTTP.
    pub async fn fetch_auction_bids(&mut self, auction_id: &str) -> Result<()> {
        let page = self.client.auction_bids(auction_id).await?;
        if !self.store.replace_bids(auction_id, page.bids) {
            debug!("Bid list for {auction_id} arrived after unsubscribe; discarded");
        }
        Ok(())
    }

    /// Refresh the authoritative winning bid over HTTP.
    pub async fn fetch_winning_bid(&mut self, auction_id: &str) -> Result<()> {
        let bid = self.client.winning_bid(auction_id).await?;
        if !self.store.replace_winning_bid(auction_id, bid) {
            debug!("Winning bid for {auction_id} arrived after unsubscribe; discarded");
        }
        Ok(())
    }

    /// Optimistic bid placement.
    ///
    /// Local validation failures (non-positive amount, no subscription, a
    /// placement already in flight) return `Err` before any network call.
    /// Server-side rejection is not an `Err`: it rolls the optimistic
    /// record back and surfaces once, as state, in the store's
    /// `bid_error`. The HTTP call carries the client-level request
    /// timeout, so a hang rolls back the same way as a rejection.
    pub async fn place_bid(&mut self, auction_id: &str, amount: f64) -> Result<PlaceBidOutcome> {
        let local_id = self.store.begin_place(auction_id, amount)?;

        match self.client.place_bid(auction_id, amount).await {
            Ok(bid) => {
                if !self.store.complete_place(auction_id, local_id, bid.clone()) {
                    return Ok(PlaceBidOutcome::Discarded);
                }
                Ok(PlaceBidOutcome::Confirmed(bid))
            }
            Err(err) => {
                let message = err.to_string();
                if !self.store.fail_place(auction_id, local_id, message.clone()) {
                    return Ok(PlaceBidOutcome::Discarded);
                }
                Ok(PlaceBidOutcome::Rejected { message })
            }
        }
    }

    /// Feed one message from a room subscription into the store.
    /// Returns an outbid notice when the event was informational.
    pub fn apply_message(&mut self, message: &RoomMessage) -> Option<Outbid> {
        match message {
            RoomMessage::Event(event) => self.store.apply_event(event),
            RoomMessage::Disconnected | RoomMessage::ChannelError(_) => None,
        }
    }

    /// Feed one decoded event into the store.
    pub fn apply_event(&mut self, event: &LiveEvent) -> Option<Outbid> {
        self.store.apply_event(event)
    }

    pub fn clear_bid_error(&mut self) {
        self.store.clear_bid_error();
    }
}

//! Follow one auction's live bid stream from the terminal.
//!
//! Usage: `auction_watch <auction-id>`, with `AUCTION_ENV` set to
//! `production`, `staging`, or `local` (default: local).

use std::env;
use std::sync::Arc;

use tokio::sync::mpsc;

use auction_live::{
    AuctionClient, BaseUrl, LiveAuctionSession, LiveEvent, PlaceBidOutcome, RoomMessage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let auction_id = env::args()
        .nth(1)
        .expect("usage: auction_watch <auction-id>");
    let base_url = match env::var("AUCTION_ENV").as_deref() {
        Ok("production") => BaseUrl::Production,
        Ok("staging") => BaseUrl::Staging,
        _ => BaseUrl::Local,
    };

    log::info!("Watching auction {auction_id} on {base_url:?}");

    let client = AuctionClient::new(None, Some(base_url))?;
    let mut session = LiveAuctionSession::new(client);
    session.connect().await?;

    let (sender, mut receiver) = mpsc::unbounded_channel::<Arc<RoomMessage>>();
    if session.subscribe_auction(&auction_id, sender).await?.is_none() {
        log::warn!("Room join was dropped; events will not flow until reconnect");
    }

    // Seed the store before following the stream.
    session.fetch_auction_bids(&auction_id).await?;
    session.fetch_winning_bid(&auction_id).await?;
    if let Some(winning) = session.store().winning_bid(&auction_id) {
        log::info!("Current winning bid: {:.2}", winning.amount);
    }

    // Optionally place one bid up front: AUCTION_BID_AMOUNT=120.5
    if let Ok(raw) = env::var("AUCTION_BID_AMOUNT") {
        let amount: f64 = raw.parse()?;
        match session.place_bid(&auction_id, amount).await? {
            PlaceBidOutcome::Confirmed(bid) => {
                log::info!("Bid confirmed: {} at {:.2}", bid.id, bid.amount)
            }
            PlaceBidOutcome::Rejected { message } => log::warn!("Bid rejected: {message}"),
            PlaceBidOutcome::Discarded => log::warn!("Bid result discarded"),
        }
    }

    while let Some(message) = receiver.recv().await {
        if let RoomMessage::Event(LiveEvent::NewBid(bid)) = &*message {
            log::info!("New bid {} at {:.2} by {}", bid.id, bid.amount, bid.bidder.name);
        }
        let previous = session.store().winning_bid(&auction_id).map(|w| w.amount);
        if let Some(notice) = session.apply_message(&message) {
            log::warn!("{} (new amount {:.2})", notice.message, notice.new_bid_amount);
        }
        let current = session.store().winning_bid(&auction_id).map(|w| w.amount);
        if current != previous {
            if let Some(amount) = current {
                log::info!("Winning bid is now {amount:.2}");
            }
        }
        if let RoomMessage::Disconnected = &*message {
            log::warn!(
                "Channel dropped (connected={})",
                session.client().is_socket_connected()
            );
        }
    }

    session.unsubscribe_auction(&auction_id).await?;
    session.disconnect().await;
    Ok(())
}

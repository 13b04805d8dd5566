//! Facade over the auction HTTP API and the live event channel.

use std::sync::Arc;

use log::warn;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    consts::HTTP_REQUEST_TIMEOUT,
    errors::Error,
    helpers::BaseUrl,
    prelude::*,
    req::HttpClient,
    types::{Bid, BidPage},
    ws::{message_types::RoomMessage, ReconnectConfig, WsManager},
};

#[derive(Serialize, Debug)]
struct PlaceBidBody {
    amount: f64,
}

/// Client for one auction backend: request/response calls over HTTP plus
/// the single persistent live channel shared by all auction rooms.
///
/// The HTTP side is always available; the live channel exists only
/// between [`connect`](Self::connect) and [`disconnect`](Self::disconnect).
#[derive(Debug)]
pub struct AuctionClient {
    pub http_client: HttpClient,
    ws_manager: Option<WsManager>,
    ws_url: String,
    reconnect: ReconnectConfig,
}

impl AuctionClient {
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> Result<AuctionClient> {
        Self::with_reconnect_config(client, base_url, ReconnectConfig::default())
    }

    pub fn with_reconnect_config(
        client: Option<Client>,
        base_url: Option<BaseUrl>,
        reconnect: ReconnectConfig,
    ) -> Result<AuctionClient> {
        let client = match client {
            Some(client) => client,
            // Credentials ride on a cookie jar; every request carries them.
            None => Client::builder()
                .cookie_store(true)
                .timeout(HTTP_REQUEST_TIMEOUT)
                .build()
                .map_err(|e| Error::GenericRequest(e.to_string()))?,
        };
        let base_url = base_url.unwrap_or(BaseUrl::Production);

        Ok(AuctionClient {
            http_client: HttpClient {
                client,
                base_url: base_url.get_url(),
            },
            ws_manager: None,
            ws_url: base_url.get_ws_url(),
            reconnect,
        })
    }

    /// Establish the live channel. Idempotent: when a live connection
    /// already exists this logs a warning and leaves it untouched; a
    /// second connection is never opened. A dead channel (reconnection
    /// attempts exhausted) is torn down and replaced.
    pub async fn connect(&mut self) -> Result<()> {
        if let Some(ws_manager) = &self.ws_manager {
            if ws_manager.is_connected() {
                warn!("Live channel already connected; ignoring connect()");
                return Ok(());
            }
            if let Some(dead) = self.ws_manager.take() {
                dead.shutdown().await;
            }
        }
        let ws_manager = WsManager::new(self.ws_url.clone(), self.reconnect.clone()).await?;
        self.ws_manager = Some(ws_manager);
        Ok(())
    }

    /// Tear down the live channel. Idempotent: no-op when disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(ws_manager) = self.ws_manager.take() {
            ws_manager.shutdown().await;
        }
    }

    /// Whether the live channel is currently up. This flag is the only
    /// synchronous way to observe connection health; transport problems
    /// are otherwise recovered internally and logged.
    pub fn is_socket_connected(&self) -> bool {
        self.ws_manager
            .as_ref()
            .map(WsManager::is_connected)
            .unwrap_or(false)
    }

    /// Join the room for `auction_id` and register `sender` for its
    /// events. When the channel is down this logs a warning and returns
    /// `Ok(None)` without queueing the join.
    pub async fn join_auction_room(
        &mut self,
        auction_id: &str,
        sender: UnboundedSender<Arc<RoomMessage>>,
    ) -> Result<Option<u32>> {
        let Some(ws_manager) = self.ws_manager.as_mut() else {
            warn!("Not connected; join for auction {auction_id} dropped");
            return Ok(None);
        };
        match ws_manager.join_room(auction_id, sender).await {
            Ok(subscription_id) => Ok(Some(subscription_id)),
            Err(Error::NotConnected) => {
                warn!("Not connected; join for auction {auction_id} dropped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Leave the room for `auction_id`, dropping all of its subscribers.
    /// The subscribers are detached even while the channel is down; only
    /// the leave frame is skipped (with a warning) then.
    pub async fn leave_auction_room(&mut self, auction_id: &str) -> Result<()> {
        let Some(ws_manager) = self.ws_manager.as_mut() else {
            warn!("Not connected; leave for auction {auction_id} dropped");
            return Ok(());
        };
        ws_manager.leave_room(auction_id).await
    }

    /// Remove a single subscriber without affecting others on the same
    /// room.
    pub async fn unsubscribe(&mut self, subscription_id: u32) -> Result<()> {
        self.ws_manager
            .as_mut()
            .ok_or(Error::NotConnected)?
            .remove_subscription(subscription_id)
            .await
    }

    /// Detach every subscriber from every room.
    pub async fn remove_all_subscriptions(&mut self) {
        if let Some(ws_manager) = self.ws_manager.as_mut() {
            ws_manager.remove_all_subscriptions().await;
        }
    }

    /// Broadcast a confirmed bid on the live channel. Warn-no-op when
    /// disconnected.
    pub async fn emit_bid(&self, bid: &Bid) -> Result<()> {
        match &self.ws_manager {
            Some(ws_manager) => ws_manager.emit_bid(bid).await,
            None => {
                warn!(
                    "Not connected; bid broadcast for auction {} dropped",
                    bid.auction_id
                );
                Ok(())
            }
        }
    }

    /// `GET /auctions/:id/bids` — the full current bid list.
    pub async fn auction_bids(&self, auction_id: &str) -> Result<BidPage> {
        let text = self
            .http_client
            .get(&format!("/auctions/{auction_id}/bids"))
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))
    }

    /// `GET /auctions/:id/winning-bid` — the authoritative highest
    /// confirmed bid, if any.
    pub async fn winning_bid(&self, auction_id: &str) -> Result<Option<Bid>> {
        let text = self
            .http_client
            .get(&format!("/auctions/{auction_id}/winning-bid"))
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))
    }

    /// `POST /auctions/:id/bids` — authoritative bid placement.
    ///
    /// The amount must be a positive finite number; anything else is
    /// rejected here, before any network call. Amounts that pass this
    /// check can still be rejected server-side (below minimum increment,
    /// auction closed, outbid race).
    pub async fn place_bid(&self, auction_id: &str, amount: f64) -> Result<Bid> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidBidAmount(amount));
        }
        let body = serde_json::to_string(&PlaceBidBody { amount })
            .map_err(|e| Error::JsonParse(e.to_string()))?;
        let text = self
            .http_client
            .post(&format!("/auctions/{auction_id}/bids"), body)
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))
    }
}

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::{
    net::TcpStream,
    spawn,
    sync::{mpsc::UnboundedSender, Mutex},
    time,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol},
    MaybeTlsStream, WebSocketStream,
};

use crate::{
    errors::Error,
    prelude::*,
    types::{AuctionId, Bid},
    ws::message_types::{ClientFrame, LiveEvent, RoomMessage},
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, protocol::Message>;

#[derive(Debug)]
struct RoomSubscriber {
    sending_channel: UnboundedSender<Arc<RoomMessage>>,
    subscription_id: u32,
}

type RoomMap = HashMap<AuctionId, Vec<RoomSubscriber>>;

/// Reconnection policy for the live channel.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt (default: 1s)
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts (default: 5s)
    pub max_delay: Duration,
    /// Backoff multiplier for exponential delay (default: 2.0)
    pub backoff_multiplier: f64,
    /// Randomization factor applied to each delay (default: 0.5)
    pub randomization_factor: f64,
    /// Attempts per disconnect episode before giving up (default: 5)
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            randomization_factor: 0.5,
            max_attempts: 5,
        }
    }
}

/// Owns the single persistent connection to the auction server and the
/// per-auction room subscriptions multiplexed over it.
///
/// Inbound events are demultiplexed by the auction id embedded in every
/// payload; a subscriber only ever sees events for the room it joined.
/// Connection problems are recovered (bounded reconnect) and logged, never
/// surfaced to subscribers as failures.
#[derive(Debug)]
pub(crate) struct WsManager {
    stop_flag: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    writer: Arc<Mutex<WsSink>>,
    rooms: Arc<Mutex<RoomMap>>,
    subscription_id: u32,
    subscription_rooms: HashMap<u32, AuctionId>,
}

impl WsManager {
    pub(crate) async fn new(url: String, config: ReconnectConfig) -> Result<WsManager> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(true));

        let (writer, mut reader) = Self::connect(&url).await?.split();
        let writer = Arc::new(Mutex::new(writer));

        let rooms: Arc<Mutex<RoomMap>> = Arc::new(Mutex::new(HashMap::new()));

        // Reader task: routes inbound frames and drives reconnection.
        {
            let writer = Arc::clone(&writer);
            let stop_flag = Arc::clone(&stop_flag);
            let connected = Arc::clone(&connected);
            let rooms = Arc::clone(&rooms);
            let config = config.clone();
            let reader_fut = async move {
                // Set when the server sends a Close frame; the next stream
                // end is then treated as a server-initiated disconnect and
                // reconnection starts without waiting out the first backoff.
                let mut server_closed = false;

                while !stop_flag.load(Ordering::Relaxed) {
                    match reader.next().await {
                        Some(Ok(frame)) => {
                            if matches!(frame, protocol::Message::Close(_)) {
                                warn!("Server closed the live auction session");
                                server_closed = true;
                                continue;
                            }
                            if let Err(err) = Self::route_frame(Ok(frame), &rooms).await {
                                error!("Error processing inbound live event: {err}");
                            }
                        }
                        Some(Err(err)) => {
                            if let Err(err) =
                                Self::route_frame(Err(err), &rooms).await
                            {
                                error!("Error reporting reader failure: {err}");
                            }
                        }
                        None => {
                            if stop_flag.load(Ordering::Relaxed) {
                                break;
                            }
                            connected.store(false, Ordering::Relaxed);
                            warn!(
                                "Live auction channel disconnected (server_initiated={server_closed})"
                            );
                            if let Err(err) =
                                Self::broadcast(&rooms, RoomMessage::Disconnected).await
                            {
                                warn!("Error sending disconnection notification err={err}");
                            }

                            let immediate_first = server_closed;
                            server_closed = false;
                            match Self::reconnect(
                                &url,
                                &writer,
                                &rooms,
                                &stop_flag,
                                &config,
                                immediate_first,
                            )
                            .await
                            {
                                Some(new_reader) => {
                                    reader = new_reader;
                                    connected.store(true, Ordering::Relaxed);
                                }
                                None => {
                                    error!(
                                        "Reconnection attempts exhausted; live channel stays down"
                                    );
                                    break;
                                }
                            }
                        }
                    }
                }
                debug!("live channel reader task stopped");
            };
            spawn(reader_fut);
        }

        Ok(WsManager {
            stop_flag,
            connected,
            writer,
            rooms,
            subscription_id: 0,
            subscription_rooms: HashMap::new(),
        })
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(url: &str) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        Ok(connect_async(url)
            .await
            .map_err(|e| Error::Websocket(e.to_string()))?
            .0)
    }

    /// Bounded reconnection: up to `max_attempts` tries with jittered
    /// exponential backoff. After a server-initiated close the first
    /// attempt runs immediately instead of waiting out the backoff.
    ///
    /// Returns the new reader half on success, `None` once attempts are
    /// exhausted or a stop was requested.
    async fn reconnect(
        url: &str,
        writer: &Arc<Mutex<WsSink>>,
        rooms: &Arc<Mutex<RoomMap>>,
        stop_flag: &Arc<AtomicBool>,
        config: &ReconnectConfig,
        immediate_first: bool,
    ) -> Option<futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>> {
        for attempt in 0..config.max_attempts {
            if stop_flag.load(Ordering::Relaxed) {
                return None;
            }

            if attempt > 0 || !immediate_first {
                let delay = Self::backoff_delay(attempt, config);
                info!(
                    "Reconnecting to live channel attempt={} delay_ms={}",
                    attempt + 1,
                    delay.as_millis()
                );
                time::sleep(delay).await;
            } else {
                info!("Server-initiated disconnect: reconnecting immediately");
            }

            match Self::connect(url).await {
                Ok(ws) => {
                    let (new_writer, new_reader) = ws.split();
                    let mut writer_guard = writer.lock().await;
                    *writer_guard = new_writer;

                    // Rejoin every room the client was in before the drop.
                    for auction_id in rooms.lock().await.keys() {
                        let frame = ClientFrame::JoinAuction {
                            auction_id: auction_id.as_str(),
                        };
                        if let Err(err) = Self::send_frame(&mut writer_guard, &frame).await {
                            error!("Could not rejoin auction room {auction_id}: {err}");
                        }
                    }

                    info!(
                        "Live channel reconnect finished successfully after {} attempt(s)",
                        attempt + 1
                    );
                    return Some(new_reader);
                }
                Err(err) => {
                    error!(
                        "Could not connect to live channel: {err} attempt={}",
                        attempt + 1
                    );
                }
            }
        }
        None
    }

    /// Exponential backoff with deterministic alternating jitter, clamped
    /// to `[initial_delay, max_delay]`.
    fn backoff_delay(attempt: u32, config: &ReconnectConfig) -> Duration {
        let base_secs =
            config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(attempt as i32);
        let capped_secs = base_secs.min(config.max_delay.as_secs_f64());

        let jitter_mult = if attempt % 2 == 0 {
            1.0 + config.randomization_factor * 0.5
        } else {
            1.0 - config.randomization_factor * 0.5
        };
        let jittered_secs = (capped_secs * jitter_mult).clamp(
            config.initial_delay.as_secs_f64(),
            config.max_delay.as_secs_f64(),
        );

        Duration::from_secs_f64(jittered_secs)
    }

    /// Decode an inbound frame and deliver it to the subscribers of the
    /// room named by the payload's embedded auction id. Events for rooms
    /// with no subscriber are dropped; reader failures are broadcast to
    /// every room.
    async fn route_frame(
        data: std::result::Result<protocol::Message, tungstenite::Error>,
        rooms: &Arc<Mutex<RoomMap>>,
    ) -> Result<()> {
        match data {
            Ok(frame) => match frame.into_text() {
                Ok(text) => {
                    if !text.starts_with('{') {
                        return Ok(());
                    }

                    let event = serde_json::from_str::<LiveEvent>(&text)
                        .map_err(|e| Error::JsonParse(e.to_string()))?;

                    let auction_id = event.auction_id().to_owned();
                    let message = Arc::new(RoomMessage::Event(event));

                    let mut rooms = rooms.lock().await;
                    let mut res = Ok(());
                    match rooms.get_mut(&auction_id) {
                        Some(subscribers) => {
                            for subscriber in subscribers {
                                if let Err(e) = subscriber
                                    .sending_channel
                                    .send(Arc::clone(&message))
                                    .map_err(|e| Error::WsSend(e.to_string()))
                                {
                                    res = Err(e);
                                }
                            }
                        }
                        None => {
                            debug!("Dropping event for unjoined auction {auction_id}");
                        }
                    }
                    res
                }
                Err(err) => {
                    let error = Error::ReaderTextConversion(err.to_string());
                    Self::broadcast(rooms, RoomMessage::ChannelError(error.to_string())).await
                }
            },
            Err(err) => {
                let error = Error::GenericReader(err.to_string());
                Self::broadcast(rooms, RoomMessage::ChannelError(error.to_string())).await
            }
        }
    }

    async fn broadcast(rooms: &Arc<Mutex<RoomMap>>, message: RoomMessage) -> Result<()> {
        let message = Arc::new(message);

        let mut rooms = rooms.lock().await;
        let mut res = Ok(());
        for subscribers in rooms.values_mut() {
            for subscriber in subscribers {
                if let Err(e) = subscriber
                    .sending_channel
                    .send(Arc::clone(&message))
                    .map_err(|e| Error::WsSend(e.to_string()))
                {
                    res = Err(e);
                }
            }
        }
        res
    }

    async fn send_frame(writer: &mut WsSink, frame: &ClientFrame<'_>) -> Result<()> {
        let payload = serde_json::to_string(frame).map_err(|e| Error::JsonParse(e.to_string()))?;
        writer
            .send(protocol::Message::Text(payload))
            .await
            .map_err(|e| Error::Websocket(e.to_string()))?;
        Ok(())
    }

    /// Join an auction room and register a subscriber for its events.
    ///
    /// A join frame is sent for every call, including repeat joins for a
    /// room that is already joined; the server treats duplicate joins as
    /// idempotent. Each registered subscriber receives one copy of each
    /// event, regardless of how many joins were issued.
    ///
    /// Fails with [`Error::NotConnected`] when the channel is down; joins
    /// are never queued for later delivery.
    pub(crate) async fn join_room(
        &mut self,
        auction_id: &str,
        sending_channel: UnboundedSender<Arc<RoomMessage>>,
    ) -> Result<u32> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let frame = ClientFrame::JoinAuction { auction_id };
        Self::send_frame(&mut *self.writer.lock().await, &frame).await?;

        let subscription_id = self.subscription_id;
        self.subscription_id += 1;
        self.subscription_rooms
            .insert(subscription_id, auction_id.to_owned());

        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(auction_id.to_owned())
            .or_default()
            .push(RoomSubscriber {
                sending_channel,
                subscription_id,
            });

        Ok(subscription_id)
    }

    /// Remove one subscriber. When it was the last subscriber of its room
    /// a leave frame is sent and the room is dropped.
    pub(crate) async fn remove_subscription(&mut self, subscription_id: u32) -> Result<()> {
        let auction_id = self
            .subscription_rooms
            .remove(&subscription_id)
            .ok_or(Error::SubscriptionNotFound)?;

        let mut rooms = self.rooms.lock().await;
        let subscribers = rooms
            .get_mut(&auction_id)
            .ok_or(Error::SubscriptionNotFound)?;
        let index = subscribers
            .iter()
            .position(|s| s.subscription_id == subscription_id)
            .ok_or(Error::SubscriptionNotFound)?;
        subscribers.remove(index);

        if subscribers.is_empty() {
            rooms.remove(&auction_id);
            drop(rooms);
            self.send_leave(&auction_id).await?;
        }
        Ok(())
    }

    /// Leave an auction room entirely: drops every subscriber of the room
    /// and sends a leave frame. Further events for the auction stop being
    /// delivered as soon as this returns.
    ///
    /// The local detach happens even while disconnected, so a later
    /// reconnect does not rejoin a room the caller already left; only the
    /// leave frame itself is a warn-no-op then.
    pub(crate) async fn leave_room(&mut self, auction_id: &str) -> Result<()> {
        Self::detach_room(&self.rooms, &mut self.subscription_rooms, auction_id).await;
        self.send_leave(auction_id).await
    }

    /// Remove a room and all of its subscribers from the local maps.
    async fn detach_room(
        rooms: &Arc<Mutex<RoomMap>>,
        subscription_rooms: &mut HashMap<u32, AuctionId>,
        auction_id: &str,
    ) {
        if let Some(subscribers) = rooms.lock().await.remove(auction_id) {
            for subscriber in subscribers {
                subscription_rooms.remove(&subscriber.subscription_id);
            }
        }
    }

    async fn send_leave(&self, auction_id: &str) -> Result<()> {
        if !self.is_connected() {
            warn!("Not connected; leave for auction {auction_id} not sent");
            return Ok(());
        }
        let frame = ClientFrame::LeaveAuction { auction_id };
        Self::send_frame(&mut *self.writer.lock().await, &frame).await
    }

    /// Full teardown of every room and subscriber.
    pub(crate) async fn remove_all_subscriptions(&mut self) {
        let drained: Vec<AuctionId> = self.rooms.lock().await.drain().map(|(id, _)| id).collect();
        self.subscription_rooms.clear();
        for auction_id in drained {
            if let Err(err) = self.send_leave(&auction_id).await {
                warn!("Error leaving auction room {auction_id}: {err}");
            }
        }
    }

    /// Broadcast a confirmed bid on the channel. No-op with a warning
    /// when disconnected.
    pub(crate) async fn emit_bid(&self, bid: &Bid) -> Result<()> {
        if !self.is_connected() {
            warn!(
                "Not connected; bid broadcast for auction {} dropped",
                bid.auction_id
            );
            return Ok(());
        }
        let frame = ClientFrame::NewBid { bid };
        Self::send_frame(&mut *self.writer.lock().await, &frame).await
    }

    /// Explicit local disconnect: stops the reader task and closes the
    /// connection. The reader never reconnects after this.
    pub(crate) async fn shutdown(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.send(protocol::Message::Close(None)).await {
            debug!("Error sending close frame during shutdown: {err}");
        }
    }
}

impl Drop for WsManager {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

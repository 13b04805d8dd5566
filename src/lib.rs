#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;
mod helpers;
mod prelude;
mod req;

// Shared data model
pub mod types;

// Feature modules
mod cache;
mod client;
mod session;
mod store;
pub mod ws;

// Re-exports
pub use cache::{CachedAuction, StoreCache};
pub use client::AuctionClient;
pub use consts::{DEFAULT_CACHE_TTL, LOCAL_API_URL, PRODUCTION_API_URL, STAGING_API_URL};
pub use errors::Error;
pub use helpers::BaseUrl;
pub use req::HttpClient;
pub use session::{LiveAuctionSession, PlaceBidOutcome};
pub use store::BidStore;
pub use types::*;
pub use ws::message_types::{LiveEvent, RoomMessage};
pub use ws::ReconnectConfig;

//! Persisted snapshot of the bid store for fast reload.
//!
//! Live auction data is volatile; a snapshot is only a starting point.
//! The `saved_at` stamp bounds how long a snapshot may be hydrated at
//! all, and hydrated entries are flagged stale by the store until they
//! are revalidated against the server.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, AuctionSnapshot, StoredBid};

/// Confirmed per-auction data, as persisted. Pending placements are
/// never written here.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CachedAuction {
    pub bids: Vec<StoredBid>,
    pub winning: Option<StoredBid>,
    pub snapshot: Option<AuctionSnapshot>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoreCache {
    /// Unix seconds at export time.
    pub saved_at: u64,
    pub auctions: HashMap<AuctionId, CachedAuction>,
}

impl StoreCache {
    pub fn age(&self) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Duration::from_secs(now.saturating_sub(self.saved_at))
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<StoreCache> {
        serde_json::from_str(raw)
    }
}

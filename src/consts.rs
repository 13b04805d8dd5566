use std::time::Duration;

pub const PRODUCTION_API_URL: &str = "https://api.auctionhub.example.com";
pub const STAGING_API_URL: &str = "https://staging-api.auctionhub.example.com";
pub const LOCAL_API_URL: &str = "http://localhost:4000";

/// Request timeout applied to every HTTP call, including bid placement.
/// A hung placement fails the future and takes the normal rollback path.
pub(crate) const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum age for hydrating a persisted store snapshot.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

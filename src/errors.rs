use thiserror::Error;

/// Main SDK error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Client HTTP error (4xx)
    #[error("Client error: status code: {status_code}, error message: {error_message}, error data: {error_data:?}")]
    ClientRequest {
        status_code: u16,
        error_message: String,
        error_data: Option<String>,
    },

    /// Server HTTP error (5xx)
    #[error("Server error: status code: {status_code}, error message: {error_message}")]
    ServerRequest {
        status_code: u16,
        error_message: String,
    },

    /// Generic request error
    #[error("Generic request error: {0}")]
    GenericRequest(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// WebSocket connection error
    #[error("Websocket error: {0}")]
    Websocket(String),

    /// WebSocket send error
    #[error("WS send error: {0}")]
    WsSend(String),

    /// Reader text conversion error
    #[error("Reader text conversion error: {0}")]
    ReaderTextConversion(String),

    /// Generic reader error
    #[error("Reader error: {0}")]
    GenericReader(String),

    /// Subscription not found
    #[error("Subscription not found")]
    SubscriptionNotFound,

    /// Socket connection not established
    #[error("Socket not connected")]
    NotConnected,

    /// Bid amount must be a positive number
    #[error("Invalid bid amount: {0}")]
    InvalidBidAmount(f64),

    /// A bid placement is already in flight for this auction
    #[error("A bid is already pending for auction {0}")]
    BidInFlight(String),

    /// The auction has no active subscription in the store
    #[error("Not subscribed to auction {0}")]
    NotSubscribed(String),
}

impl Error {
    /// Create an HTTP client error
    pub fn client_error(
        status_code: u16,
        error_message: String,
        error_data: Option<String>,
    ) -> Self {
        Error::ClientRequest {
            status_code,
            error_message,
            error_data,
        }
    }

    /// Create an HTTP server error
    pub fn server_error(status_code: u16, error_message: String) -> Self {
        Error::ServerRequest {
            status_code,
            error_message,
        }
    }
}

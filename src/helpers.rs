use crate::consts::{LOCAL_API_URL, PRODUCTION_API_URL, STAGING_API_URL};

/// Which auction backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrl {
    Production,
    Staging,
    Local,
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Production => PRODUCTION_API_URL.to_string(),
            BaseUrl::Staging => STAGING_API_URL.to_string(),
            BaseUrl::Local => LOCAL_API_URL.to_string(),
        }
    }

    /// Derive the WebSocket endpoint from the HTTP base URL.
    /// `https://...` becomes `wss://.../ws`, `http://...` becomes `ws://.../ws`.
    pub fn get_ws_url(&self) -> String {
        let url = self.get_url();
        format!("ws{}/ws", &url[4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_derivation() {
        assert_eq!(
            BaseUrl::Production.get_ws_url(),
            "wss://api.auctionhub.example.com/ws"
        );
        assert_eq!(BaseUrl::Local.get_ws_url(), "ws://localhost:4000/ws");
    }
}

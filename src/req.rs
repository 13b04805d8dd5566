use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::{errors::Error, prelude::*};

/// HTTP status codes that indicate transient server errors (retryable)
const RETRYABLE_STATUS_CODES: &[u16] = &[502, 503, 504];

/// Maximum number of retry attempts for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds (doubles with each retry)
const INITIAL_BACKOFF_MS: u64 = 100;

/// Error body shape produced by the auction API.
#[derive(Deserialize, Debug)]
struct ErrorData {
    message: String,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
}

async fn parse_response(response: Response) -> Result<String> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| Error::GenericRequest(e.to_string()))?;

    if status_code < 400 {
        return Ok(text);
    }
    let error_data = serde_json::from_str::<ErrorData>(&text);
    if (400..500).contains(&status_code) {
        let client_error = match error_data {
            Ok(error_data) => Error::client_error(
                status_code,
                error_data.message,
                error_data.errors.map(|e| e.to_string()),
            ),
            Err(_) => Error::client_error(status_code, text, None),
        };
        return Err(client_error);
    }

    Err(Error::server_error(status_code, text))
}

impl HttpClient {
    /// Send a GET request with automatic retry for transient server errors.
    pub async fn get(&self, url_path: &str) -> Result<String> {
        self.send_with_retry(url_path, None).await
    }

    /// Send a POST request with automatic retry for transient server errors
    /// (502, 503, 504).
    ///
    /// Uses exponential backoff: 100ms, 200ms, 400ms between retries.
    /// This handles transient errors from load balancers and server restarts.
    pub async fn post(&self, url_path: &str, data: String) -> Result<String> {
        self.send_with_retry(url_path, Some(data)).await
    }

    async fn send_with_retry(&self, url_path: &str, body: Option<String>) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);

        for attempt in 0..=MAX_RETRIES {
            let request = match &body {
                Some(data) => self
                    .client
                    .post(&full_url)
                    .header("Content-Type", "application/json")
                    .body(data.clone()),
                None => self.client.get(&full_url),
            }
            .build()
            .map_err(|e| Error::GenericRequest(e.to_string()))?;

            let result = self
                .client
                .execute(request)
                .await
                .map_err(|e| Error::GenericRequest(e.to_string()))?;

            let status = result.status().as_u16();

            if RETRYABLE_STATUS_CODES.contains(&status) && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    status = status,
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES + 1,
                    backoff_ms = backoff.as_millis(),
                    url = %url_path,
                    "Retryable HTTP error, backing off"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            return parse_response(result).await;
        }

        Err(Error::GenericRequest(format!(
            "Max retries ({MAX_RETRIES}) exceeded for {url_path}"
        )))
    }
}

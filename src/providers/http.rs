//! Shared HTTP plumbing for the bundled sources.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{MimirError, Result};

/// Default request timeout for source clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client with the crate's user agent and the given timeout.
pub(crate) fn client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mimir/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build tuned HTTP client, using defaults");
            Client::new()
        })
}

/// Send a GET request and decode a JSON body, mapping HTTP failures onto
/// [`MimirError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T> {
    let response = http
        .get(url)
        .query(query)
        .header("Accept", "application/json, application/hal+json")
        .send()
        .await
        .map_err(|e| MimirError::Http(e.to_string()))?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(MimirError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MimirError::Api {
            status: status.as_u16(),
            message,
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| MimirError::Http(e.to_string()))?;
    if body.trim().is_empty() {
        return Err(MimirError::EmptyResponse);
    }
    Ok(serde_json::from_str(&body)?)
}

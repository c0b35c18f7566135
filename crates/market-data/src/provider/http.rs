//! Blocking HTTP plumbing shared by the REST tiers.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::errors::MarketDataError;

/// Default per-request timeout for REST providers.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client with the given request timeout.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// GET `url` with query `params` and return the body of a 2xx response.
///
/// 429 maps to `RateLimited`, any other non-success status to `HttpStatus`,
/// transport failures to `Timeout` / `Unreachable`. No retries.
pub(crate) fn get_text(
    client: &Client,
    provider: &'static str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String, MarketDataError> {
    let response = client.get(url).query(params).send().map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::Unreachable {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    debug!("{} responded {} for {}", provider, status, url);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited {
            provider: provider.to_string(),
        });
    }

    if !status.is_success() {
        return Err(MarketDataError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().map_err(|e| MarketDataError::MalformedResponse {
        provider: provider.to_string(),
        message: format!("Failed to read response: {}", e),
    })
}

/// Parse a JSON body, mapping failures to `MalformedResponse`.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| MarketDataError::MalformedResponse {
        provider: provider.to_string(),
        message: format!("Failed to parse response: {}", e),
    })
}

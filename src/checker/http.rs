//! Shared HTTP client construction and response status handling

use std::time::Duration;

use tracing::warn;

use crate::checker::error::FetchError;
use crate::config::{FETCH_TIMEOUT_SECS, USER_AGENT};

/// Build the HTTP client used by the built-in checkers
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}

/// Map non-success responses to [`FetchError`].
///
/// - 404 -> `NotFound`
/// - 429, or 403 with an exhausted `x-ratelimit-remaining` -> `RateLimited`
/// - any other non-success -> `Status`
pub fn check_response(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, FetchError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            url: url.to_string(),
        });
    }

    let exhausted = status == reqwest::StatusCode::FORBIDDEN
        && header_value(&response, "x-ratelimit-remaining").is_some_and(|v| v == "0");

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || exhausted {
        let retry_after = header_value(&response, "retry-after").and_then(|v| v.parse().ok());
        return Err(FetchError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    warn!("{} returned status {}", url, status);
    Err(FetchError::Status {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

/// Read a response header as a string
pub fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Content type of a response without parameters (e.g. `application/json`)
pub fn content_type(response: &reqwest::Response) -> Option<String> {
    header_value(response, "content-type").map(|v| {
        v.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    })
}

//! JSON-over-HTTP with retry and exponential backoff.
//!
//! Shared by the remote embedding providers and the chat-completion
//! generator.
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::debug;

/// Request parameters for [`post_json_with_retry`].
pub struct JsonRequest<'a> {
    /// Short service name used in error messages (e.g. `"OpenAI"`).
    pub service: &'a str,
    pub url: &'a str,
    pub bearer: Option<&'a str>,
    pub body: &'a serde_json::Value,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// POST `body` and return the parsed JSON response.
///
/// Makes up to `max_retries + 1` attempts.
pub async fn post_json_with_retry(request: JsonRequest<'_>) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(request.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=request.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            debug!(service = request.service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut builder = client
            .post(request.url)
            .header("Content-Type", "application/json")
            .json(request.body);
        if let Some(token) = request.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        request.service,
                        status,
                        body_text
                    ));
                    continue;
                }

                bail!("{} API error {}: {}", request.service, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "{} connection error ({}): {}",
                    request.service,
                    request.url,
                    e
                ));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        anyhow::anyhow!("{} request failed after retries", request.service)
    }))
}

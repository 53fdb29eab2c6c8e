//! Async result poller
//!
//! Polls a resource until a validator accepts the body or the wall-clock timeout
//! fires. One request is outstanding at a time. On timeout the in-flight request
//! future is dropped; the server may still complete it.

use std::time::Duration;

use async_trait::async_trait;
use scalar_core::{Error, Result, UpstreamError};
use serde::de::DeserializeOwned;

/// Source of pollable resource bodies
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Body of resource `id`, or `None` while it is not available yet
    async fn fetch(&self, id: &str) -> std::result::Result<Option<String>, UpstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(3),
        }
    }
}

/// Poll `id` until `validator` returns true for a non-empty body.
///
/// Upstream errors, non-OK responses and empty bodies are retried after `interval`.
/// Fails with [`Error::Timeout`] once `timeout` has elapsed since the call started.
pub async fn poll_until<F, V>(
    fetcher: &F,
    id: &str,
    validator: V,
    config: &PollConfig,
) -> Result<String>
where
    F: ResourceFetcher + ?Sized,
    V: Fn(&str) -> bool,
{
    let attempts = async {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match fetcher.fetch(id).await {
                Ok(Some(body)) if !body.trim().is_empty() => {
                    if validator(&body) {
                        return (attempt, body);
                    }
                    tracing::debug!(id, attempt, "Result not accepted yet");
                }
                Ok(_) => tracing::debug!(id, attempt, "Result not available yet"),
                Err(e) => tracing::debug!(id, attempt, error = %e, "Poll request failed"),
            }
            tokio::time::sleep(config.interval).await;
        }
    };

    match tokio::time::timeout(config.timeout, attempts).await {
        Ok((attempt, body)) => {
            tracing::info!(id, attempts = attempt, "Poll resolved");
            Ok(body)
        }
        Err(_) => {
            tracing::warn!(id, timeout_ms = config.timeout.as_millis() as u64, "Poll timed out");
            Err(Error::Timeout {
                operation: format!("Polling {}", id),
                after_ms: config.timeout.as_millis() as u64,
            })
        }
    }
}

/// Typed variant: bodies that fail to parse as `T` count as not ready
pub async fn poll_json<T, F, V>(
    fetcher: &F,
    id: &str,
    validator: V,
    config: &PollConfig,
) -> Result<T>
where
    T: DeserializeOwned,
    F: ResourceFetcher + ?Sized,
    V: Fn(&T) -> bool,
{
    let body = poll_until(
        fetcher,
        id,
        |body| {
            serde_json::from_str::<T>(body)
                .map(|value| validator(&value))
                .unwrap_or(false)
        },
        config,
    )
    .await?;

    serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()).into())
}

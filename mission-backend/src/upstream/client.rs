///! HTTP client for the upstream JSON APIs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::Upstream;
use crate::config::BackendConfig;
use crate::error::{MissionError, Result};

const USER_AGENT: &str = concat!("mission-backend/", env!("CARGO_PKG_VERSION"));

/// One failed attempt and whether another one could help.
struct AttemptError {
    error: MissionError,
    retryable: bool,
}

impl AttemptError {
    fn retry(error: MissionError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn fatal(error: MissionError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

/// reqwest-backed [`Upstream`] with bounded retries.
///
/// Transport errors, 429 and 5xx are retried with a linearly growing delay;
/// 404 and other client errors are returned straight away.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpUpstream {
    pub fn new(timeout: Duration, max_retries: u32, retry_delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            max_retries,
            retry_delay,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(
            config.request_timeout(),
            config.max_retries,
            config.retry_delay(),
        )
    }

    async fn fetch_attempt(&self, url: &str) -> std::result::Result<Value, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::retry(MissionError::from(e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AttemptError::fatal(MissionError::NotFound(redact_api_key(url))));
        }
        if !status.is_success() {
            let error = MissionError::UpstreamUnavailable(format!(
                "HTTP error {} for {}",
                status,
                redact_api_key(url)
            ));
            return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Err(AttemptError::retry(error))
            } else {
                Err(AttemptError::fatal(error))
            };
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::retry(MissionError::from(e)))?;

        serde_json::from_str(&body).map_err(|e| AttemptError::fatal(MissionError::from(e)))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let shown = redact_api_key(url);
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry_delay * (attempt - 1);
                tracing::debug!(
                    "Retrying {} after {:?} (attempt {}/{})",
                    shown,
                    delay,
                    attempt,
                    attempts
                );
                tokio::time::sleep(delay).await;
            }

            match self.fetch_attempt(url).await {
                Ok(data) => {
                    tracing::debug!("Fetched {}", shown);
                    return Ok(data);
                }
                Err(AttemptError { error, retryable }) => {
                    if !retryable || attempt == attempts {
                        tracing::error!(
                            "Failed to fetch {} after {} attempt(s): {}",
                            shown,
                            attempt,
                            error
                        );
                        return Err(error);
                    }
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        attempts,
                        shown,
                        error
                    );
                }
            }
        }

        Err(MissionError::UpstreamUnavailable(format!(
            "Failed to fetch {} after {} attempts",
            shown, attempts
        )))
    }
}

/// Hide the value of an `api_key` query parameter.
pub fn redact_api_key(url: &str) -> String {
    let Some(start) = url.find("api_key=") else {
        return url.to_string();
    };
    let value_start = start + "api_key=".len();
    let value_end = url[value_start..]
        .find('&')
        .map(|i| value_start + i)
        .unwrap_or(url.len());
    format!("{}***{}", &url[..value_start], &url[value_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_api_key() {
        assert_eq!(
            redact_api_key("https://api.nasa.gov/planetary/apod?api_key=SECRET"),
            "https://api.nasa.gov/planetary/apod?api_key=***"
        );
        assert_eq!(
            redact_api_key("https://x/y.png?api_key=SECRET&thumb=1"),
            "https://x/y.png?api_key=***&thumb=1"
        );
        assert_eq!(redact_api_key("https://x/launch/"), "https://x/launch/");
    }

    #[tokio::test]
    #[ignore] // Requires network connection
    async fn test_fetch_launch_library() {
        let upstream = HttpUpstream::new(Duration::from_secs(30), 0, Duration::ZERO).unwrap();
        let result = upstream
            .get_json("https://ll.thespacedevs.com/2.2.0/launch/upcoming/?limit=1")
            .await
            .unwrap();
        assert!(result["results"].is_array());
    }
}

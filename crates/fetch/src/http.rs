use crate::error::{ErrorKind, Result};
use crate::{FetchRequest, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use exn::ResultExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, redirect};
use std::ops::Deref;
use std::time::Duration;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);
const MAX_REDIRECTS: usize = 10;

/// [`Fetcher`] over `reqwest`, retrying transient failures with exponential
/// backoff (`backoff * 2^attempt`).
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client, backoff: DEFAULT_BACKOFF })
    }

    /// Base delay before the first retry; doubles for each one after.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, request: &FetchRequest) -> Result<Bytes> {
        let response = self
            .client
            .get(request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        if let Some(content_type) = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
            && is_textual(content_type)
        {
            exn::bail!(ErrorKind::NotBinary(content_type.to_string()));
        }
        let body = response.bytes().await.map_err(classify)?;
        if body.is_empty() {
            exn::bail!(ErrorKind::EmptyBody);
        }
        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Bytes> {
        let mut attempt = 0;
        loop {
            match self.attempt(request).await {
                Ok(body) => {
                    tracing::debug!(url = %request.url, bytes = body.len(), attempt, "Fetched");
                    return Ok(body);
                },
                Err(e) if e.deref().is_retryable() && attempt < request.retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::warn!(url = %request.url, attempt, error = %e.deref(), ?delay, "Transient fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify(err: reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() {
        ErrorKind::Connect(err.to_string())
    } else {
        ErrorKind::Request(err.to_string())
    }
}

/// Text and JSON bodies are error pages or API responses, never images.
fn is_textual(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.starts_with("text/") || essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text/html; charset=utf-8", true)]
    #[case("TEXT/PLAIN", true)]
    #[case("application/json", true)]
    #[case("application/problem+json", true)]
    #[case("image/png", false)]
    #[case("application/octet-stream", false)]
    #[case("image/svg+xml", false)]
    fn test_is_textual(#[case] content_type: &str, #[case] expected: bool) {
        assert_eq!(is_textual(content_type), expected);
    }
}

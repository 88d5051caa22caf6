// src/ct_log/client.rs
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use tracing::{debug, warn};

use super::types::{GetEntriesResponse, SignedTreeHead};
use crate::domain::CTLogEntry;

/// Per-request timeout for CT log calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response bodies are read through this cap to bound memory against a
/// compromised or misbehaving log server.
const MAX_RESPONSE_BODY: usize = 50 * 1024 * 1024;

/// How many times a rate-limited (429) request is retried.
const MAX_RETRIES: u32 = 3;

/// HTTP client for a single Certificate Transparency log, speaking the
/// RFC 6962 v1 API.
pub struct CtLogClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a client for the given CT log base URL. Redirects are
    /// disabled: CT log APIs never redirect, and following one would
    /// open an SSRF hole.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building CT log HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            http_client,
        })
    }

    /// Fetch the Signed Tree Head (current tree size and timestamp).
    /// Endpoint: GET {base_url}/ct/v1/get-sth
    pub async fn get_sth(&self) -> Result<SignedTreeHead> {
        let url = format!("{}/ct/v1/get-sth", self.base_url);
        let body = self.get_with_retry(&url).await?;

        let sth: SignedTreeHead = serde_json::from_slice(&body)
            .with_context(|| format!("decoding STH from {}", self.base_url))?;

        debug!(
            log = %self.base_url,
            tree_size = sth.tree_size,
            timestamp = sth.timestamp,
            "STH received"
        );

        Ok(sth)
    }

    /// Fetch the inclusive entry range [start, end]. Entries whose
    /// leaf_input or extra_data fail base64 decoding are skipped with a
    /// warning rather than failing the batch.
    /// Endpoint: GET {base_url}/ct/v1/get-entries?start={start}&end={end}
    pub async fn get_entries(&self, start: i64, end: i64) -> Result<Vec<CTLogEntry>> {
        let url = format!(
            "{}/ct/v1/get-entries?start={}&end={}",
            self.base_url, start, end
        );
        let body = self.get_with_retry(&url).await?;

        let resp: GetEntriesResponse = serde_json::from_slice(&body)
            .with_context(|| format!("decoding entries from {}", self.base_url))?;

        let b64 = base64::engine::general_purpose::STANDARD;
        let mut entries = Vec::with_capacity(resp.entries.len());
        for (i, raw) in resp.entries.iter().enumerate() {
            let index = start + i as i64;
            let leaf_input = match b64.decode(&raw.leaf_input) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(log = %self.base_url, index, error = %e, "skipping entry with invalid leaf_input");
                    continue;
                }
            };
            let extra_data = match b64.decode(&raw.extra_data) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(log = %self.base_url, index, error = %e, "skipping entry with invalid extra_data");
                    continue;
                }
            };

            entries.push(CTLogEntry {
                leaf_input,
                extra_data,
                index,
                log_url: self.base_url.clone(),
            });
        }

        debug!(
            log = %self.base_url,
            start,
            end,
            count = entries.len(),
            "entries received"
        );

        Ok(entries)
    }

    /// Execute a GET, retrying 429 responses with exponential backoff.
    /// Any other non-200 status surfaces immediately. The body is read
    /// through the size cap.
    async fn get_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut backoff = Duration::from_secs(1);

        for attempt in 0..=MAX_RETRIES {
            let response = self
                .http_client
                .get(url)
                .send()
                .await
                .with_context(|| format!("executing request to {url}"))?;

            let status = response.status();
            if status == reqwest::StatusCode::OK {
                return read_capped_body(response, url).await;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RETRIES {
                debug!(url, attempt = attempt + 1, backoff = ?backoff, "rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            anyhow::bail!("HTTP {} from {}", status.as_u16(), url);
        }

        anyhow::bail!("max retries exceeded for {url}")
    }
}

/// Accumulate the response body, failing if it exceeds the size cap.
async fn read_capped_body(mut response: reqwest::Response, url: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("reading response body from {url}"))?
    {
        if body.len() + chunk.len() > MAX_RESPONSE_BODY {
            anyhow::bail!("response body from {url} exceeds {MAX_RESPONSE_BODY} byte cap");
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_sth_parses_tree_size_and_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree_size": 12345678i64,
                "timestamp": 1700000000000i64,
                "sha256_root_hash": "ignored",
                "tree_head_signature": "ignored"
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(server.uri()).unwrap();
        let sth = client.get_sth().await.unwrap();
        assert_eq!(sth.tree_size, 12_345_678);
        assert_eq!(sth.timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_get_entries_decodes_base64() {
        let server = MockServer::start().await;
        let b64 = base64::engine::general_purpose::STANDARD;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-entries"))
            .and(query_param("start", "5"))
            .and(query_param("end", "6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": [
                    {"leaf_input": b64.encode(b"leaf-five"), "extra_data": b64.encode(b"extra-five")},
                    {"leaf_input": b64.encode(b"leaf-six"), "extra_data": ""}
                ]
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(server.uri()).unwrap();
        let entries = client.get_entries(5, 6).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].leaf_input, b"leaf-five");
        assert_eq!(entries[0].extra_data, b"extra-five");
        assert_eq!(entries[0].index, 5);
        assert_eq!(entries[1].index, 6);
        assert_eq!(entries[1].log_url, server.uri());
    }

    #[tokio::test]
    async fn test_get_entries_skips_invalid_base64() {
        let server = MockServer::start().await;
        let b64 = base64::engine::general_purpose::STANDARD;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": [
                    {"leaf_input": "!!!not-base64!!!", "extra_data": ""},
                    {"leaf_input": b64.encode(b"good"), "extra_data": ""}
                ]
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(server.uri()).unwrap();
        let entries = client.get_entries(0, 1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].leaf_input, b"good");
        // The skipped entry still consumed index 0.
        assert_eq!(entries[0].index, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_request_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree_size": 10i64,
                "timestamp": 1i64
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(server.uri()).unwrap();
        let sth = client.get_sth().await.unwrap();
        assert_eq!(sth.tree_size, 10);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = CtLogClient::new(server.uri()).unwrap();
        let err = client.get_sth().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }
}

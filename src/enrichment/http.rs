// src/enrichment/http.rs
//! HTTP liveness probing.

use std::time::Duration;

use anyhow::{Context, Result};

/// User-Agent sent with liveness probes, identifying the prober.
const USER_AGENT: &str = concat!("certsnare/", env!("CARGO_PKG_VERSION"), " (domain-liveness-check)");

/// Probe request timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum redirects followed by a probe.
const MAX_REDIRECTS: usize = 3;

/// Build the shared HTTP client used for liveness probes.
pub(crate) fn probe_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(USER_AGENT)
        .build()
        .context("building probe HTTP client")
}

/// Send an HTTP HEAD request to determine whether the domain has a live
/// web server: HTTPS first, plain HTTP as fallback. Returns the status
/// code on success. Any response -- including 4xx/5xx -- means a server
/// is listening; only transport failure on both schemes is an error.
pub(crate) async fn probe_liveness(client: &reqwest::Client, domain: &str) -> Result<i64> {
    if let Ok(status) = do_head(client, &format!("https://{domain}/")).await {
        return Ok(status);
    }

    do_head(client, &format!("http://{domain}/"))
        .await
        .with_context(|| format!("both HTTPS and HTTP probes failed for {domain}"))
}

/// One HEAD request; the body is never read.
async fn do_head(client: &reqwest::Client, url: &str) -> Result<i64> {
    let response = client
        .head(url)
        .send()
        .await
        .with_context(|| format!("HEAD {url}"))?;
    Ok(response.status().as_u16() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_do_head_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = probe_client().unwrap();
        let status = do_head(&client, &format!("{}/", server.uri())).await.unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_do_head_error_status_still_returns() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = probe_client().unwrap();
        let status = do_head(&client, &format!("{}/", server.uri())).await.unwrap();
        // A 5xx response is still a listening server.
        assert_eq!(status, 503);
    }

    #[tokio::test]
    async fn test_do_head_connection_refused_is_error() {
        let client = probe_client().unwrap();
        // Port 9 (discard) is almost certainly closed.
        let result = do_head(&client, "http://127.0.0.1:9/").await;
        assert!(result.is_err());
    }
}

// src/enrichment/mod.rs
//! Domain enrichment pipeline: a bounded, rate-limited worker pool that
//! probes hit domains for DNS records, hosting provider, and HTTP
//! liveness, writes results back to the store, and publishes them for
//! UI consumption.

mod dns;
mod http;
mod limiter;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};

use crate::domain::Store;

pub use dns::DnsProber;
pub use limiter::RateLimiter;

/// Number of concurrent enrichment workers.
const MAX_WORKERS: usize = 5;

/// Capacity of the pending-probe queue.
const QUEUE_CAPACITY: usize = 1000;

/// Aggregate outbound probe rate across all workers, per second.
const RATE_PER_SEC: u32 = 5;

/// Outcome of a single domain probe.
#[derive(Debug, Clone, Default)]
pub struct EnrichResult {
    pub domain: String,
    pub is_live: bool,
    pub resolved_ips: Vec<String>,
    pub hosting_provider: String,
    pub http_status: i64,
}

/// Rate-limited enrichment worker pool. `enqueue` never blocks: when the
/// queue is full the domain is dropped, so the enricher can never
/// throttle the pollers feeding it.
pub struct Enricher {
    store: Arc<dyn Store>,
    dns: Arc<DnsProber>,
    http_client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    result_tx: mpsc::Sender<EnrichResult>,
    queue_tx: mpsc::Sender<String>,
    queue_rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl Enricher {
    /// Build an enricher writing to `store` and publishing results on
    /// `result_tx`. Must be called within a tokio runtime (the rate
    /// limiter spawns its refill task immediately).
    pub fn new(store: Arc<dyn Store>, result_tx: mpsc::Sender<EnrichResult>) -> Result<Self> {
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        Ok(Enricher {
            store,
            dns: Arc::new(DnsProber::new()),
            http_client: http::probe_client()?,
            limiter: Arc::new(RateLimiter::new(RATE_PER_SEC, MAX_WORKERS as u32)),
            result_tx,
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
        })
    }

    /// Queue a domain for probing. Drops with a warning when the queue is
    /// full rather than blocking the caller.
    pub fn enqueue(&self, domain: &str) {
        if self.queue_tx.try_send(domain.to_string()).is_err() {
            warn!(domain, "enrichment queue full, dropping domain");
        }
    }

    /// Start the worker pool and block until shutdown fires and every
    /// worker has exited. In-flight probes finish their current network
    /// call before observing the flag.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::with_capacity(MAX_WORKERS);
        for _ in 0..MAX_WORKERS {
            let store = Arc::clone(&self.store);
            let dns = Arc::clone(&self.dns);
            let http_client = self.http_client.clone();
            let limiter = Arc::clone(&self.limiter);
            let result_tx = self.result_tx.clone();
            let queue = Arc::clone(&self.queue_rx);
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(worker(
                store, dns, http_client, limiter, result_tx, queue, shutdown,
            )));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// One enrichment worker: dequeue, wait for a rate-limit token, probe.
async fn worker(
    store: Arc<dyn Store>,
    dns: Arc<DnsProber>,
    http_client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    result_tx: mpsc::Sender<EnrichResult>,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let domain = {
            let mut rx = queue.lock().await;
            tokio::select! {
                _ = shutdown.changed() => return,
                msg = rx.recv() => match msg {
                    Some(domain) => domain,
                    None => return,
                },
            }
        };

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = limiter.acquire() => {}
        }

        probe(&store, &dns, &http_client, &result_tx, &domain).await;
    }
}

/// Run DNS resolution and the HTTP liveness check for one domain,
/// persist the enrichment columns, and publish the result. The result
/// send never blocks; a slow UI consumer just misses updates.
async fn probe(
    store: &Arc<dyn Store>,
    dns: &DnsProber,
    http_client: &reqwest::Client,
    result_tx: &mpsc::Sender<EnrichResult>,
    domain: &str,
) {
    let mut result = EnrichResult {
        domain: domain.to_string(),
        hosting_provider: "unknown".to_string(),
        ..Default::default()
    };

    match dns.resolve_domain(domain).await {
        Ok((ips, provider)) => {
            result.resolved_ips = ips;
            result.hosting_provider = provider;
        }
        Err(e) => {
            debug!(domain, error = %e, "DNS resolution failed");
        }
    }

    match http::probe_liveness(http_client, domain).await {
        Ok(status) => {
            result.is_live = true;
            result.http_status = status;
        }
        Err(e) => {
            debug!(domain, error = %e, "HTTP probe failed");
        }
    }

    if let Err(e) = store
        .update_enrichment(
            &result.domain,
            result.is_live,
            &result.resolved_ips,
            &result.hosting_provider,
            result.http_status,
        )
        .await
    {
        warn!(domain, error = %e, "failed to persist enrichment");
    }

    let _ = result_tx.try_send(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Db;

    async fn test_enricher() -> (Enricher, mpsc::Receiver<EnrichResult>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let db = Db::open(tmp.path().join("test.db")).await.unwrap();
        let (result_tx, result_rx) = mpsc::channel(16);
        let enricher = Enricher::new(Arc::new(db), result_tx).unwrap();
        (enricher, result_rx, tmp)
    }

    #[tokio::test]
    async fn test_enqueue_drops_when_full() {
        let (enricher, _result_rx, _tmp) = test_enricher().await;
        // No workers running: the queue fills at capacity and the rest drop.
        for i in 0..(QUEUE_CAPACITY + 50) {
            enricher.enqueue(&format!("domain-{i}.example"));
        }
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let (enricher, _result_rx, _tmp) = test_enricher().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let run = tokio::spawn(async move {
            enricher.run(shutdown_rx).await;
        });

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("enricher did not shut down")
            .unwrap();
    }
}

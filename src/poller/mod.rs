// src/poller/mod.rs
//! Per-log CT polling: cursor management, batch fetching, scoring, and
//! hit storage.

mod manager;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::ct_log::{self, CtLogClient};
use crate::domain::{CTLogEntry, Hit, Profile, Store};
use crate::scoring::Engine;

pub use manager::Manager;

/// Per-log polling progress, emitted after each processed batch.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// Human-readable name of the monitored log.
    pub log_name: String,

    /// Certificate entries processed by this poller since start.
    pub certs_scanned: i64,

    /// Domains that scored above zero and were stored.
    pub hits_found: i64,

    /// Next tree index this poller will fetch.
    pub current_index: i64,

    /// Most recently observed tree size.
    pub tree_size: i64,
}

/// Polls a single CT log: maintains a cursor into the tree, fetches
/// entries in batches, scores every extracted domain, and upserts hits.
/// All three output channels are offered with try-send semantics; the
/// poller never blocks on a downstream consumer.
pub struct Poller {
    client: CtLogClient,
    log_name: String,
    scorer: Engine,
    store: Arc<dyn Store>,
    profile: Arc<Profile>,
    session: String,
    batch_size: i64,
    poll_interval: Duration,
    backtrack: i64,
    hit_tx: mpsc::Sender<Hit>,
    stats_tx: mpsc::Sender<PollStats>,
    discard_tx: Option<mpsc::Sender<String>>,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        log_url: &str,
        log_name: &str,
        scorer: Engine,
        store: Arc<dyn Store>,
        profile: Arc<Profile>,
        session: String,
        batch_size: i64,
        poll_interval: Duration,
        backtrack: i64,
        hit_tx: mpsc::Sender<Hit>,
        stats_tx: mpsc::Sender<PollStats>,
        discard_tx: Option<mpsc::Sender<String>>,
    ) -> Result<Self> {
        Ok(Poller {
            client: CtLogClient::new(log_url)?,
            log_name: log_name.to_string(),
            scorer,
            store,
            profile,
            session,
            batch_size,
            poll_interval,
            backtrack,
            hit_tx,
            stats_tx,
            discard_tx,
        })
    }

    /// Run the polling loop until the shutdown flag flips. The starting
    /// cursor is `max(0, tree_size - backtrack)`; with no backtrack the
    /// poller begins at the tip and waits for new entries.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(log = %self.log_name, "starting poller");

        let sth = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            res = self.client.get_sth() => {
                res.with_context(|| format!("getting initial STH for {}", self.log_name))?
            }
        };

        let mut cursor = (sth.tree_size - self.backtrack).max(0);
        info!(
            log = %self.log_name,
            tree_size = sth.tree_size,
            starting_at = cursor,
            "poller initialized"
        );

        let mut stats = PollStats {
            log_name: self.log_name.clone(),
            current_index: cursor,
            tree_size: sth.tree_size,
            ..Default::default()
        };

        loop {
            if *shutdown.borrow() {
                info!(log = %self.log_name, "poller shutting down");
                return Ok(());
            }

            // Refresh the tree head.
            let sth = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                res = self.client.get_sth() => match res {
                    Ok(sth) => sth,
                    Err(e) => {
                        warn!(log = %self.log_name, error = %e, "failed to get STH, will retry");
                        if self.sleep(&mut shutdown).await.is_err() {
                            return Ok(());
                        }
                        continue;
                    }
                }
            };
            stats.tree_size = sth.tree_size;

            // Caught up to the tip: wait for the log to grow.
            if cursor >= sth.tree_size {
                if self.sleep(&mut shutdown).await.is_err() {
                    return Ok(());
                }
                continue;
            }

            let end = (cursor + self.batch_size - 1).min(sth.tree_size - 1);

            let entries = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                res = self.client.get_entries(cursor, end) => match res {
                    Ok(entries) => entries,
                    Err(e) => {
                        // Cursor is not advanced; the next attempt repeats this range.
                        warn!(
                            log = %self.log_name,
                            start = cursor,
                            end,
                            error = %e,
                            "failed to get entries, will retry"
                        );
                        if self.sleep(&mut shutdown).await.is_err() {
                            return Ok(());
                        }
                        continue;
                    }
                }
            };

            for entry in &entries {
                if *shutdown.borrow() {
                    return Ok(());
                }
                self.process_entry(entry, &mut stats).await;
            }

            cursor = end + 1;
            stats.current_index = cursor;

            // Stats are advisory; drop the update if nobody is listening.
            let _ = self.stats_tx.try_send(stats.clone());
        }
    }

    /// Parse one entry, score every extracted domain, and store hits.
    /// Parse failures skip the entry with a warning; they never abort the
    /// batch.
    async fn process_entry(&self, entry: &CTLogEntry, stats: &mut PollStats) {
        stats.certs_scanned += 1;

        let parsed = match ct_log::parse_entry(entry) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    log = %entry.log_url,
                    index = entry.index,
                    error = %e,
                    "failed to parse certificate"
                );
                return;
            }
        };

        for domain in &parsed.domains {
            let scored = self.scorer.score(domain, &self.profile);
            if scored.score == 0 {
                if let Some(discard_tx) = &self.discard_tx {
                    let _ = discard_tx.try_send(domain.clone());
                }
                continue;
            }

            let hit = Hit {
                domain: scored.domain,
                score: scored.score,
                severity: scored.severity,
                keywords: scored.matched_keywords,
                issuer: parsed.issuer_org.clone(),
                issuer_cn: parsed.issuer_cn.clone(),
                san_domains: parsed.domains.clone(),
                cert_not_before: parsed.not_before,
                ct_log: self.log_name.clone(),
                profile: self.profile.name.clone(),
                session: self.session.clone(),
                ..Default::default()
            };

            if let Err(e) = self.store.upsert_hit(&hit).await {
                warn!(domain = %hit.domain, error = %e, "failed to upsert hit");
                continue;
            }

            stats.hits_found += 1;

            // Drop silently when the UI consumer is saturated.
            let _ = self.hit_tx.try_send(hit);
        }
    }

    /// Wait one poll interval, or return Err when shutdown fires first.
    async fn sleep(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), ()> {
        tokio::select! {
            _ = shutdown.changed() => Err(()),
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
        }
    }
}

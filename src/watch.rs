// src/watch.rs
//! The `watch` pipeline: wires pollers, scoring, storage, enrichment,
//! and the UI channels together, and owns shutdown ordering.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::config::Config;
use crate::domain::Hit;
use crate::enrichment::{EnrichResult, Enricher};
use crate::poller;
use crate::profile;
use crate::scoring::Engine;
use crate::storage::Db;
use crate::tui;

/// Channel capacities for the data plane. Producers use try-send
/// throughout, so these bound memory, not correctness.
const HIT_CHAN_CAPACITY: usize = 256;
const STATS_CHAN_CAPACITY: usize = 64;
const DISCARD_CHAN_CAPACITY: usize = 256;
const ENRICH_CHAN_CAPACITY: usize = 256;

/// Run the monitoring pipeline until a termination signal (headless) or
/// the live feed exits. Constructs profile -> store -> scorer -> poller
/// manager -> enricher, in that order.
pub async fn run(cfg: Config, profile_name: &str, session: &str, headless: bool) -> Result<()> {
    let store = Arc::new(
        Db::open(&cfg.db_path)
            .await
            .context("opening database")?,
    );

    let registry = profile::Manager::new(&cfg.custom_profiles, &cfg.skip_suffixes)
        .context("building profile registry")?;
    let prof = Arc::new(registry.load_profile(profile_name)?);
    info!(
        profile = %prof.name,
        keywords = prof.keywords.len(),
        logs = cfg.ct_logs.len(),
        batch_size = cfg.batch_size,
        backtrack = cfg.backtrack,
        "starting watch"
    );

    let cfg = Arc::new(cfg);
    let (shutdown_tx, _) = watch::channel(false);

    let (hit_tx, hit_rx) = mpsc::channel::<Hit>(HIT_CHAN_CAPACITY);
    let (stats_tx, stats_rx) = mpsc::channel::<poller::PollStats>(STATS_CHAN_CAPACITY);
    let (discard_tx, discard_rx) = mpsc::channel::<String>(DISCARD_CHAN_CAPACITY);
    let (enrich_tx, enrich_rx) = mpsc::channel::<EnrichResult>(ENRICH_CHAN_CAPACITY);

    let manager = poller::Manager::new(
        Arc::clone(&cfg),
        Engine::new(),
        store.clone(),
        prof,
        session.to_string(),
    );
    manager.start(hit_tx, stats_tx, Some(discard_tx)).await;

    let enricher = Arc::new(Enricher::new(store.clone(), enrich_tx).context("building enricher")?);
    let enricher_task = {
        let enricher = Arc::clone(&enricher);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { enricher.run(shutdown_rx).await })
    };

    // Tap the hit stream: forward each hit to the UI and enqueue its
    // domain for enrichment.
    let (ui_hit_tx, ui_hit_rx) = mpsc::channel::<Hit>(HIT_CHAN_CAPACITY);
    let tap_task = tokio::spawn(tap_hits(
        hit_rx,
        Arc::clone(&enricher),
        ui_hit_tx,
        shutdown_tx.subscribe(),
    ));

    // Bridge per-log poller stats into one aggregate for the UI.
    let (ui_stats_tx, ui_stats_rx) = mpsc::channel::<tui::PollStats>(STATS_CHAN_CAPACITY);
    let bridge_task = tokio::spawn(bridge_poll_stats(
        stats_rx,
        ui_stats_tx,
        shutdown_tx.subscribe(),
    ));

    if headless {
        // Nobody renders the UI channels headless; drain them so buffers
        // never fill. Aggregate stats are logged instead of discarded.
        drain(ui_hit_rx);
        drain(enrich_rx);
        drain(discard_rx);
        tokio::spawn(log_stats(ui_stats_rx, shutdown_tx.subscribe()));

        info!("headless mode, waiting for shutdown signal");
        wait_for_signal().await?;
    } else {
        let channels = tui::UiChannels {
            hits: ui_hit_rx,
            stats: ui_stats_rx,
            enrichments: enrich_rx,
            discards: discard_rx,
        };
        tokio::select! {
            _ = tui::feed::run(channels, shutdown_tx.subscribe()) => {},
            res = wait_for_signal() => res?,
        }
    }

    info!("shutdown requested, stopping pipeline");
    let _ = shutdown_tx.send(true);
    manager.stop().await;
    let _ = enricher_task.await;
    let _ = tap_task.await;
    let _ = bridge_task.await;
    store.close().await;
    info!("watch shutdown complete");

    Ok(())
}

/// Forward hits to the UI channel (try-send) while enqueuing each domain
/// for enrichment. Exits when the hit channel closes or shutdown fires.
async fn tap_hits(
    mut hit_rx: mpsc::Receiver<Hit>,
    enricher: Arc<Enricher>,
    ui_hit_tx: mpsc::Sender<Hit>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            hit = hit_rx.recv() => {
                let Some(hit) = hit else { return };
                enricher.enqueue(&hit.domain);
                let _ = ui_hit_tx.try_send(hit);
            }
        }
    }
}

/// Maintain a per-log map of the latest poller stats and emit a
/// recomputed aggregate on every update.
async fn bridge_poll_stats(
    mut stats_rx: mpsc::Receiver<poller::PollStats>,
    ui_stats_tx: mpsc::Sender<tui::PollStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut per_log: std::collections::HashMap<String, poller::PollStats> =
        std::collections::HashMap::new();
    let start = Instant::now();

    loop {
        let stats = tokio::select! {
            _ = shutdown.changed() => return,
            stats = stats_rx.recv() => match stats {
                Some(stats) => stats,
                None => return,
            },
        };

        per_log.insert(stats.log_name.clone(), stats);

        let mut total_certs = 0;
        let mut total_hits = 0;
        for s in per_log.values() {
            total_certs += s.certs_scanned;
            total_hits += s.hits_found;
        }

        let elapsed = start.elapsed().as_secs_f64();
        let certs_per_sec = if elapsed > 0.0 {
            total_certs as f64 / elapsed
        } else {
            0.0
        };
        let hits_per_min = if elapsed > 0.0 {
            total_hits as f64 / (elapsed / 60.0)
        } else {
            0.0
        };

        let aggregate = tui::PollStats {
            certs_scanned: total_certs,
            hits_found: total_hits,
            certs_per_sec,
            active_logs: per_log.len(),
            hits_per_min,
        };

        // The UI reads at its own pace.
        let _ = ui_stats_tx.try_send(aggregate);
    }
}

/// Periodically log the latest aggregate stats in headless mode.
async fn log_stats(
    mut stats_rx: mpsc::Receiver<tui::PollStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut latest: Option<tui::PollStats> = None;
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(30));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            stats = stats_rx.recv() => match stats {
                Some(stats) => latest = Some(stats),
                None => return,
            },
            _ = ticker.tick() => {
                if let Some(stats) = &latest {
                    info!(
                        certs_scanned = stats.certs_scanned,
                        hits_found = stats.hits_found,
                        certs_per_sec = stats.certs_per_sec,
                        active_logs = stats.active_logs,
                        "polling progress"
                    );
                }
            },
        }
    }
}

/// Spawn a task that discards everything from a receiver until its
/// producers are gone.
fn drain<T: Send + 'static>(mut rx: mpsc::Receiver<T>) {
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("installing SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("installing SIGINT handler")?,
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("installing SIGINT handler")?;
    }
    Ok(())
}

// src/tui/feed.rs
//! Line-oriented live feed: consumes the UI message channels and prints
//! colour-coded events to the terminal.

use std::time::Duration;

use colored::Colorize;
use tokio::sync::{mpsc, watch};

use super::messages::PollStats;
use crate::domain::Hit;
use crate::enrichment::EnrichResult;
use crate::output::colored_severity;

/// How often the aggregate stats line is printed.
const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Receiver bundle handed from the watch wiring to the UI.
pub struct UiChannels {
    pub hits: mpsc::Receiver<Hit>,
    pub stats: mpsc::Receiver<PollStats>,
    pub enrichments: mpsc::Receiver<EnrichResult>,
    pub discards: mpsc::Receiver<String>,
}

/// Run the feed until shutdown fires or every producer is gone. Discarded
/// domains are drained silently; they only matter to a full-screen UI's
/// activity ticker.
pub async fn run(mut channels: UiChannels, mut shutdown: watch::Receiver<bool>) {
    let mut latest_stats: Option<PollStats> = None;
    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            hit = channels.hits.recv() => match hit {
                Some(hit) => print_hit(&hit),
                None => return,
            },
            stats = channels.stats.recv() => {
                if let Some(stats) = stats {
                    latest_stats = Some(stats);
                }
            },
            enrichment = channels.enrichments.recv() => {
                if let Some(result) = enrichment {
                    print_enrichment(&result);
                }
            },
            discard = channels.discards.recv() => {
                let _ = discard;
            },
            _ = ticker.tick() => {
                if let Some(stats) = &latest_stats {
                    print_stats(stats);
                }
            },
        }
    }
}

fn print_hit(hit: &Hit) {
    println!(
        "{} [{:>2}] {} {} {}",
        colored_severity(hit.severity),
        hit.score,
        hit.domain.bold(),
        hit.keywords.join(",").dimmed(),
        hit.ct_log.dimmed(),
    );
}

fn print_enrichment(result: &EnrichResult) {
    let liveness = if result.is_live {
        format!("live ({})", result.http_status).green().to_string()
    } else {
        "unreachable".dimmed().to_string()
    };
    println!(
        "  {} {} {} {}",
        "probe".cyan(),
        result.domain,
        liveness,
        result.hosting_provider.dimmed(),
    );
}

fn print_stats(stats: &PollStats) {
    eprintln!(
        "{} {} certs | {} hits | {:.1} certs/s | {} logs",
        "stats".dimmed(),
        stats.certs_scanned,
        stats.hits_found,
        stats.certs_per_sec,
        stats.active_logs,
    );
}

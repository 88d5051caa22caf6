// src/tui/messages.rs
//! Messages the pipeline publishes for UI consumption. All channels
//! carrying these are written with try-send semantics: a slow UI misses
//! updates, it never stalls the pipeline.

use crate::domain::Hit;

/// A new scored domain arrived from a poller.
#[derive(Debug, Clone)]
pub struct HitMsg {
    pub hit: Hit,
}

/// Updated aggregate polling statistics.
#[derive(Debug, Clone)]
pub struct StatsMsg {
    pub stats: PollStats,
}

/// A batch of hits loaded from the database (history browsing).
#[derive(Debug, Clone)]
pub struct HitsLoadedMsg {
    pub hits: Vec<Hit>,
}

/// The enrichment pipeline finished probing a domain.
#[derive(Debug, Clone)]
pub struct EnrichmentMsg {
    pub domain: String,
    pub is_live: bool,
    pub resolved_ips: Vec<String>,
    pub hosting_provider: String,
    pub http_status: i64,
}

/// A hit's bookmark state was toggled.
#[derive(Debug, Clone)]
pub struct BookmarkToggleMsg {
    pub domain: String,
    pub bookmarked: bool,
}

/// One or more hits were deleted from storage.
#[derive(Debug, Clone)]
pub struct DeleteHitsMsg {
    pub domains: Vec<String>,
}

/// A domain scored zero and was discarded. Feeds the activity display so
/// scanning progress is visible even when nothing matches.
#[derive(Debug, Clone)]
pub struct DiscardedDomainMsg {
    pub domain: String,
}

/// Aggregate statistics across all pollers, computed by the stats bridge
/// from per-log poller updates.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// Certificate entries processed across all logs.
    pub certs_scanned: i64,

    /// Domains that scored above zero and were stored.
    pub hits_found: i64,

    /// Average processing rate since the watch started.
    pub certs_per_sec: f64,

    /// Number of CT log pollers reporting.
    pub active_logs: usize,

    /// Rolling rate of new hits per minute.
    pub hits_per_min: f64,
}

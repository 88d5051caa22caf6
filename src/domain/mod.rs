// src/domain/mod.rs
//! Shared types and trait seams used across the pipeline.

use anyhow::Result;
use async_trait::async_trait;

pub mod query;
pub mod types;

pub use query::{DbStats, KeywordCount, QueryFilter};
pub use types::{CTLogEntry, Hit, Profile, ScoredDomain, Severity};

/// Persistence operations for hits. Implementations must be safe for
/// concurrent use: pollers and enrichment workers share one store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new hit record. Fails if the domain already exists;
    /// prefer `upsert_hit` for the normal write path.
    async fn insert_hit(&self, hit: &Hit) -> Result<()>;

    /// Insert or update a hit keyed on domain. Certificate and scoring
    /// columns are replaced; enrichment columns are preserved.
    async fn upsert_hit(&self, hit: &Hit) -> Result<()>;

    /// Return hits matching the filter. An empty filter returns all hits.
    async fn query_hits(&self, filter: &QueryFilter) -> Result<Vec<Hit>>;

    /// Aggregate statistics: totals, severity breakdown, top keywords, date range.
    async fn stats(&self) -> Result<DbStats>;

    /// Remove every hit record.
    async fn clear_all(&self) -> Result<()>;

    /// Remove all hits tagged with the given session name.
    async fn clear_session(&self, session: &str) -> Result<()>;

    /// Set or clear the bookmark flag on a single domain.
    async fn set_bookmark(&self, domain: &str, bookmarked: bool) -> Result<()>;

    /// Delete a single hit by domain.
    async fn delete_hit(&self, domain: &str) -> Result<()>;

    /// Delete a batch of hits in one transaction. Empty input is a no-op.
    async fn delete_hits(&self, domains: &[String]) -> Result<()>;

    /// Write enrichment columns for a domain, stamping `live_checked_at`.
    async fn update_enrichment(
        &self,
        domain: &str,
        is_live: bool,
        resolved_ips: &[String],
        provider: &str,
        http_status: i64,
    ) -> Result<()>;
}

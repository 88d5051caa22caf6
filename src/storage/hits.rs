// src/storage/hits.rs
//! Hit row operations: insert, upsert, query, bookmark, delete, enrichment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_timestamp, Db};
use crate::domain::{Hit, QueryFilter, Store};

/// ISO 8601 format used for timestamps stored in SQLite.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Columns selected for full Hit rows, in scan order.
const HIT_COLUMNS: &str = "domain, score, severity, keywords, issuer, issuer_cn, san_domains, \
     cert_not_before, ct_log, profile, session, created_at, updated_at, \
     is_live, resolved_ips, hosting_provider, http_status, live_checked_at, bookmarked";

/// Heterogeneous bind argument for dynamically built queries.
enum Arg {
    Int(i64),
    Text(String),
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

impl Db {
    /// Insert or update a hit keyed on domain. Certificate and scoring
    /// columns are replaced on conflict; `created_at` and the enrichment
    /// columns are left untouched.
    pub async fn upsert_hit(&self, hit: &Hit) -> Result<()> {
        let (keywords, san_domains) = encode_arrays(hit)?;
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            "INSERT INTO hits (domain, score, severity, keywords, issuer, issuer_cn, san_domains, \
                 cert_not_before, ct_log, profile, session, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(domain) DO UPDATE SET \
                 score = excluded.score, \
                 severity = excluded.severity, \
                 keywords = excluded.keywords, \
                 issuer = excluded.issuer, \
                 issuer_cn = excluded.issuer_cn, \
                 san_domains = excluded.san_domains, \
                 cert_not_before = excluded.cert_not_before, \
                 ct_log = excluded.ct_log, \
                 profile = excluded.profile, \
                 session = excluded.session, \
                 updated_at = excluded.updated_at",
        )
        .bind(&hit.domain)
        .bind(hit.score)
        .bind(severity_text(hit))
        .bind(&keywords)
        .bind(&hit.issuer)
        .bind(&hit.issuer_cn)
        .bind(&san_domains)
        .bind(hit.cert_not_before.as_ref().map(format_timestamp))
        .bind(&hit.ct_log)
        .bind(&hit.profile)
        .bind(&hit.session)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .with_context(|| format!("upserting hit for {}", hit.domain))?;

        Ok(())
    }

    /// Insert a new hit. Fails if the domain already exists.
    pub async fn insert_hit(&self, hit: &Hit) -> Result<()> {
        let (keywords, san_domains) = encode_arrays(hit)?;
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            "INSERT INTO hits (domain, score, severity, keywords, issuer, issuer_cn, san_domains, \
                 cert_not_before, ct_log, profile, session, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&hit.domain)
        .bind(hit.score)
        .bind(severity_text(hit))
        .bind(&keywords)
        .bind(&hit.issuer)
        .bind(&hit.issuer_cn)
        .bind(&san_domains)
        .bind(hit.cert_not_before.as_ref().map(format_timestamp))
        .bind(&hit.ct_log)
        .bind(&hit.profile)
        .bind(&hit.session)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .with_context(|| format!("inserting hit for {}", hit.domain))?;

        Ok(())
    }

    /// Execute a filtered query. Every WHERE clause is parameterised; the
    /// ORDER BY column passes through a fixed allow-list and the direction
    /// is normalised to ASC or DESC before interpolation -- those two
    /// tokens are the only SQL text not bound as a placeholder.
    pub async fn query_hits(&self, filter: &QueryFilter) -> Result<Vec<Hit>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Arg> = Vec::new();

        if !filter.keyword.is_empty() {
            clauses.push("keywords LIKE ?");
            args.push(Arg::Text(format!("%{}%", filter.keyword)));
        }
        if filter.score_min > 0 {
            clauses.push("score >= ?");
            args.push(Arg::Int(filter.score_min));
        }
        if let Some(severity) = filter.severity {
            clauses.push("severity = ?");
            args.push(Arg::Text(severity.as_str().to_string()));
        }
        if !filter.session.is_empty() {
            clauses.push("session = ?");
            args.push(Arg::Text(filter.session.clone()));
        }
        if let Some(since) = filter.since {
            let cutoff = Utc::now()
                - chrono::Duration::from_std(since).unwrap_or_else(|_| chrono::Duration::zero());
            clauses.push("created_at >= ?");
            args.push(Arg::Text(format_timestamp(&cutoff)));
        }
        if !filter.tld.is_empty() {
            let tld = if filter.tld.starts_with('.') {
                filter.tld.clone()
            } else {
                format!(".{}", filter.tld)
            };
            clauses.push("domain LIKE ?");
            args.push(Arg::Text(format!("%{tld}")));
        }
        if filter.bookmarked {
            clauses.push("bookmarked = 1");
        }
        if filter.live_only {
            clauses.push("is_live = 1");
        }

        let mut sql = format!("SELECT {HIT_COLUMNS} FROM hits");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let sort_by = sanitize_sort_column(&filter.sort_by);
        let sort_dir = if filter.sort_dir.eq_ignore_ascii_case("ASC") {
            "ASC"
        } else {
            "DESC"
        };
        sql.push_str(&format!(" ORDER BY {sort_by} {sort_dir}"));

        if filter.limit > 0 {
            sql.push_str(" LIMIT ?");
            args.push(Arg::Int(filter.limit));
        }
        if filter.offset > 0 {
            sql.push_str(" OFFSET ?");
            args.push(Arg::Int(filter.offset));
        }

        let mut query = sqlx::query(&sql);
        for arg in &args {
            query = match arg {
                Arg::Int(v) => query.bind(v),
                Arg::Text(s) => query.bind(s),
            };
        }

        let rows = query
            .fetch_all(self.pool())
            .await
            .context("querying hits")?;

        rows.iter().map(hit_from_row).collect()
    }

    /// Set or clear the bookmark flag on a domain.
    pub async fn set_bookmark(&self, domain: &str, bookmarked: bool) -> Result<()> {
        sqlx::query("UPDATE hits SET bookmarked = ? WHERE domain = ?")
            .bind(bookmarked as i64)
            .bind(domain)
            .execute(self.pool())
            .await
            .with_context(|| format!("setting bookmark for {domain}"))?;
        Ok(())
    }

    /// Delete a single hit by domain.
    pub async fn delete_hit(&self, domain: &str) -> Result<()> {
        sqlx::query("DELETE FROM hits WHERE domain = ?")
            .bind(domain)
            .execute(self.pool())
            .await
            .with_context(|| format!("deleting hit for {domain}"))?;
        Ok(())
    }

    /// Delete a batch of hits in one transaction. Empty input is a no-op.
    pub async fn delete_hits(&self, domains: &[String]) -> Result<()> {
        if domains.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; domains.len()].join(",");
        let sql = format!("DELETE FROM hits WHERE domain IN ({placeholders})");

        let mut tx = self.pool().begin().await.context("starting delete transaction")?;
        let mut query = sqlx::query(&sql);
        for domain in domains {
            query = query.bind(domain);
        }
        query
            .execute(&mut *tx)
            .await
            .context("deleting hit batch")?;
        tx.commit().await.context("committing delete transaction")?;
        Ok(())
    }

    /// Write enrichment columns for a domain, stamping `live_checked_at`
    /// with the current time.
    pub async fn update_enrichment(
        &self,
        domain: &str,
        is_live: bool,
        resolved_ips: &[String],
        provider: &str,
        http_status: i64,
    ) -> Result<()> {
        let ips = serde_json::to_string(resolved_ips).context("encoding resolved IPs")?;
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            "UPDATE hits SET is_live = ?, resolved_ips = ?, hosting_provider = ?, \
                 http_status = ?, live_checked_at = ? \
             WHERE domain = ?",
        )
        .bind(is_live as i64)
        .bind(&ips)
        .bind(provider)
        .bind(http_status)
        .bind(&now)
        .bind(domain)
        .execute(self.pool())
        .await
        .with_context(|| format!("updating enrichment for {domain}"))?;

        Ok(())
    }
}

#[async_trait]
impl Store for Db {
    async fn insert_hit(&self, hit: &Hit) -> Result<()> {
        Db::insert_hit(self, hit).await
    }

    async fn upsert_hit(&self, hit: &Hit) -> Result<()> {
        Db::upsert_hit(self, hit).await
    }

    async fn query_hits(&self, filter: &QueryFilter) -> Result<Vec<Hit>> {
        Db::query_hits(self, filter).await
    }

    async fn stats(&self) -> Result<crate::domain::DbStats> {
        Db::stats(self).await
    }

    async fn clear_all(&self) -> Result<()> {
        Db::clear_all(self).await
    }

    async fn clear_session(&self, session: &str) -> Result<()> {
        Db::clear_session(self, session).await
    }

    async fn set_bookmark(&self, domain: &str, bookmarked: bool) -> Result<()> {
        Db::set_bookmark(self, domain, bookmarked).await
    }

    async fn delete_hit(&self, domain: &str) -> Result<()> {
        Db::delete_hit(self, domain).await
    }

    async fn delete_hits(&self, domains: &[String]) -> Result<()> {
        Db::delete_hits(self, domains).await
    }

    async fn update_enrichment(
        &self,
        domain: &str,
        is_live: bool,
        resolved_ips: &[String],
        provider: &str,
        http_status: i64,
    ) -> Result<()> {
        Db::update_enrichment(self, domain, is_live, resolved_ips, provider, http_status).await
    }
}

fn severity_text(hit: &Hit) -> String {
    hit.severity.map(|s| s.as_str().to_string()).unwrap_or_default()
}

fn encode_arrays(hit: &Hit) -> Result<(String, String)> {
    let keywords = serde_json::to_string(&hit.keywords).context("encoding keywords")?;
    let san_domains = serde_json::to_string(&hit.san_domains).context("encoding SAN domains")?;
    Ok((keywords, san_domains))
}

/// Read a single row into a Hit. SQLite hands timestamps back as text,
/// so they are scanned as strings and parsed leniently.
pub(crate) fn hit_from_row(row: &SqliteRow) -> Result<Hit> {
    let severity: String = row.get("severity");
    let keywords_json: String = row.get("keywords");
    let san_domains_json: String = row.get("san_domains");
    let cert_not_before: Option<String> = row.get("cert_not_before");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let live_checked_at: Option<String> = row.get("live_checked_at");
    let resolved_ips_json: String = row.get("resolved_ips");

    Ok(Hit {
        domain: row.get("domain"),
        score: row.get("score"),
        severity: severity.parse().ok(),
        keywords: serde_json::from_str(&keywords_json).context("decoding keywords")?,
        issuer: row.get("issuer"),
        issuer_cn: row.get("issuer_cn"),
        san_domains: serde_json::from_str(&san_domains_json).context("decoding SAN domains")?,
        cert_not_before: cert_not_before.as_deref().and_then(parse_timestamp),
        ct_log: row.get("ct_log"),
        profile: row.get("profile"),
        session: row.get("session"),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        is_live: row.get::<i64, _>("is_live") != 0,
        resolved_ips: serde_json::from_str(&resolved_ips_json).context("decoding resolved IPs")?,
        hosting_provider: row.get("hosting_provider"),
        http_status: row.get("http_status"),
        live_checked_at: live_checked_at.as_deref().and_then(parse_timestamp),
        bookmarked: row.get::<i64, _>("bookmarked") != 0,
    })
}

/// Map a user-supplied sort column to a safe SQL identifier. Anything
/// outside the allow-list falls back to `created_at`.
fn sanitize_sort_column(col: &str) -> &'static str {
    match col.to_lowercase().as_str() {
        "domain" => "domain",
        "score" => "score",
        "severity" => "severity",
        "session" => "session",
        "created_at" => "created_at",
        "updated_at" => "updated_at",
        "ct_log" => "ct_log",
        "profile" => "profile",
        _ => "created_at",
    }
}

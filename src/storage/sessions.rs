// src/storage/sessions.rs
//! Bulk clearing and aggregate statistics.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;

use super::Db;
use crate::domain::{DbStats, KeywordCount, Severity};

impl Db {
    /// Remove every hit. Idempotent.
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM hits")
            .execute(self.pool())
            .await
            .context("clearing all hits")?;
        Ok(())
    }

    /// Remove all hits tagged with the given session. Idempotent.
    pub async fn clear_session(&self, session: &str) -> Result<()> {
        sqlx::query("DELETE FROM hits WHERE session = ?")
            .bind(session)
            .execute(self.pool())
            .await
            .with_context(|| format!("clearing session {session:?}"))?;
        Ok(())
    }

    /// Aggregate statistics: total count, per-severity counts, first/last
    /// hit timestamps, and the top 10 keywords.
    pub async fn stats(&self) -> Result<DbStats> {
        let mut stats = DbStats::default();

        let row = sqlx::query("SELECT COUNT(*) AS n FROM hits")
            .fetch_one(self.pool())
            .await
            .context("counting total hits")?;
        stats.total_hits = row.get("n");

        if stats.total_hits == 0 {
            return Ok(stats);
        }

        let rows = sqlx::query("SELECT severity, COUNT(*) AS n FROM hits GROUP BY severity")
            .fetch_all(self.pool())
            .await
            .context("counting by severity")?;
        for row in rows {
            let severity: String = row.get("severity");
            if let Ok(sev) = severity.parse::<Severity>() {
                stats.by_severity.insert(sev, row.get("n"));
            }
        }

        let row = sqlx::query("SELECT MIN(created_at) AS first, MAX(created_at) AS last FROM hits")
            .fetch_one(self.pool())
            .await
            .context("querying hit time range")?;
        let first: Option<String> = row.get("first");
        let last: Option<String> = row.get("last");
        stats.first_hit = first.as_deref().and_then(parse_timestamp);
        stats.last_hit = last.as_deref().and_then(parse_timestamp);

        stats.top_keywords = self.top_keywords(10).await?;

        Ok(stats)
    }

    /// Decode the keywords JSON of every hit, count occurrences, and
    /// return the top N.
    async fn top_keywords(&self, limit: usize) -> Result<Vec<KeywordCount>> {
        let rows = sqlx::query("SELECT keywords FROM hits")
            .fetch_all(self.pool())
            .await
            .context("querying keywords")?;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for row in rows {
            let keywords_json: String = row.get("keywords");
            let Ok(keywords) = serde_json::from_str::<Vec<String>>(&keywords_json) else {
                continue;
            };
            for kw in keywords {
                *counts.entry(kw).or_insert(0) += 1;
            }
        }

        Ok(top_n(counts, limit))
    }
}

/// Top N entries from a frequency map by count descending. Selection sort
/// over the first N positions; the map is small and N is 10.
fn top_n(counts: HashMap<String, i64>, n: usize) -> Vec<KeywordCount> {
    let mut items: Vec<(String, i64)> = counts.into_iter().collect();

    let limit = n.min(items.len());
    for i in 0..limit {
        let mut max_idx = i;
        for j in (i + 1)..items.len() {
            if items[j].1 > items[max_idx].1 {
                max_idx = j;
            }
        }
        items.swap(i, max_idx);
    }

    items
        .into_iter()
        .take(limit)
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect()
}

/// Parse a timestamp string as SQLite may return it. Accepts several
/// ISO 8601 variants; None for empty or unparseable input.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        for s in [
            "2026-01-15T10:30:00Z",
            "2026-01-15 10:30:00",
            "2026-01-15T10:30:00",
            "2026-01-15 10:30:00.123456789",
            "2026-01-15T10:30:00+00:00",
        ] {
            let parsed = parse_timestamp(s).unwrap_or_else(|| panic!("failed to parse {s:?}"));
            assert_eq!(parsed.date_naive().to_string(), "2026-01-15");
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a timestamp").is_none());
        assert!(parse_timestamp("2026-13-45").is_none());
    }

    #[test]
    fn test_top_n_sorts_by_count_descending() {
        let mut counts = HashMap::new();
        counts.insert("bitcoin".to_string(), 5);
        counts.insert("wallet".to_string(), 9);
        counts.insert("login".to_string(), 1);

        let top = top_n(counts, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].keyword, "wallet");
        assert_eq!(top[0].count, 9);
        assert_eq!(top[1].keyword, "bitcoin");
    }

    #[test]
    fn test_top_n_with_fewer_entries_than_limit() {
        let mut counts = HashMap::new();
        counts.insert("solo".to_string(), 3);
        let top = top_n(counts, 10);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_top_n_empty() {
        assert!(top_n(HashMap::new(), 10).is_empty());
    }
}

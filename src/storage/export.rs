// src/storage/export.rs
//! Streaming hit exports: JSONL and CSV.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::hits::format_timestamp;
use super::Db;
use crate::domain::{Hit, QueryFilter};

/// CSV column order. Fixed for compatibility: new columns append to the
/// right, with the enrichment columns after the original thirteen.
const CSV_HEADER: &str = "domain,score,severity,keywords,issuer,issuer_cn,san_domains,\
cert_not_before,ct_log,profile,session,created_at,updated_at,\
is_live,resolved_ips,hosting_provider,http_status,live_checked_at,bookmarked";

impl Db {
    /// Write one JSON object per hit. Limit and offset are cleared so the
    /// export always covers the full filtered set.
    pub async fn export_jsonl<W: Write>(&self, w: &mut W, filter: &QueryFilter) -> Result<()> {
        let hits = self.query_unbounded(filter).await?;
        for hit in &hits {
            serde_json::to_writer(&mut *w, hit).context("encoding hit to JSONL")?;
            writeln!(w).context("writing JSONL line")?;
        }
        Ok(())
    }

    /// Write hits as CSV with a header row. Array columns are
    /// semicolon-joined; booleans render as true/false; missing
    /// timestamps render empty.
    pub async fn export_csv<W: Write>(&self, w: &mut W, filter: &QueryFilter) -> Result<()> {
        let hits = self.query_unbounded(filter).await?;

        writeln!(w, "{CSV_HEADER}").context("writing CSV header")?;
        for hit in &hits {
            writeln!(w, "{}", csv_record(hit)).context("writing CSV row")?;
        }
        Ok(())
    }

    async fn query_unbounded(&self, filter: &QueryFilter) -> Result<Vec<Hit>> {
        let mut unbounded = filter.clone();
        unbounded.limit = 0;
        unbounded.offset = 0;
        self.query_hits(&unbounded)
            .await
            .context("querying hits for export")
    }
}

fn csv_record(hit: &Hit) -> String {
    let fields = [
        escape_field(&hit.domain),
        hit.score.to_string(),
        hit.severity.map(|s| s.to_string()).unwrap_or_default(),
        escape_field(&hit.keywords.join(";")),
        escape_field(&hit.issuer),
        escape_field(&hit.issuer_cn),
        escape_field(&hit.san_domains.join(";")),
        optional_timestamp(&hit.cert_not_before),
        escape_field(&hit.ct_log),
        escape_field(&hit.profile),
        escape_field(&hit.session),
        optional_timestamp(&hit.created_at),
        optional_timestamp(&hit.updated_at),
        hit.is_live.to_string(),
        escape_field(&hit.resolved_ips.join(";")),
        escape_field(&hit.hosting_provider),
        hit.http_status.to_string(),
        optional_timestamp(&hit.live_checked_at),
        hit.bookmarked.to_string(),
    ];
    fields.join(",")
}

fn optional_timestamp(ts: &Option<DateTime<Utc>>) -> String {
    ts.as_ref().map(format_timestamp).unwrap_or_default()
}

/// Quote a CSV field when it contains a comma, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("simple"), "simple");
        assert_eq!(escape_field("with,comma"), "\"with,comma\"");
        assert_eq!(escape_field("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_csv_record_shape() {
        let hit = Hit {
            domain: "evil.xyz".to_string(),
            score: 6,
            severity: Some(crate::domain::Severity::High),
            keywords: vec!["bitcoin".to_string(), "wallet".to_string()],
            is_live: true,
            http_status: 200,
            ..Default::default()
        };
        let record = csv_record(&hit);
        let fields: Vec<&str> = record.split(',').collect();
        assert_eq!(fields.len(), CSV_HEADER.split(',').count());
        assert_eq!(fields[0], "evil.xyz");
        assert_eq!(fields[2], "HIGH");
        assert_eq!(fields[3], "bitcoin;wallet");
        assert_eq!(fields[13], "true");
        // Unprobed timestamp renders empty.
        assert_eq!(fields[17], "");
        assert_eq!(fields[18], "false");
    }
}

// src/output.rs
//! CLI output formatting: query results as table/JSONL/CSV, stats and
//! profile detail rendering.

use std::io::Write;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::domain::{DbStats, Hit, Profile, Severity};

/// Write hits as an aligned text table. Keywords and issuer are
/// truncated to keep rows readable.
pub fn format_table<W: Write>(hits: &[Hit], w: &mut W) -> Result<()> {
    let mut rows: Vec<[String; 6]> = Vec::with_capacity(hits.len() + 1);
    rows.push([
        "SEVERITY".to_string(),
        "SCORE".to_string(),
        "DOMAIN".to_string(),
        "KEYWORDS".to_string(),
        "ISSUER".to_string(),
        "TIMESTAMP".to_string(),
    ]);

    for hit in hits {
        rows.push([
            hit.severity.map(|s| s.to_string()).unwrap_or_default(),
            hit.score.to_string(),
            hit.domain.clone(),
            truncate(&hit.keywords.join(", "), 30),
            truncate(&hit.issuer_cn, 25),
            hit.created_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        ]);
    }

    let mut widths = [0usize; 6];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    for row in &rows {
        let line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(w, "{}", line.trim_end()).context("writing table row")?;
    }

    Ok(())
}

/// Write hits as one JSON object per line.
pub fn format_jsonl<W: Write>(hits: &[Hit], w: &mut W) -> Result<()> {
    for hit in hits {
        serde_json::to_writer(&mut *w, hit).context("encoding hit as JSON")?;
        writeln!(w).context("writing JSONL line")?;
    }
    Ok(())
}

/// Write hits as CSV with a header row. Severity leads so spreadsheet
/// sorting works out of the box.
pub fn format_csv<W: Write>(hits: &[Hit], w: &mut W) -> Result<()> {
    writeln!(
        w,
        "severity,score,domain,keywords,issuer,issuer_cn,ct_log,profile,session,timestamp"
    )
    .context("writing CSV header")?;

    for hit in hits {
        let row = [
            hit.severity.map(|s| s.to_string()).unwrap_or_default(),
            hit.score.to_string(),
            escape_csv(&hit.domain),
            escape_csv(&hit.keywords.join(";")),
            escape_csv(&hit.issuer),
            escape_csv(&hit.issuer_cn),
            escape_csv(&hit.ct_log),
            escape_csv(&hit.profile),
            escape_csv(&hit.session),
            hit.created_at
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_default(),
        ];
        writeln!(w, "{}", row.join(",")).context("writing CSV row")?;
    }
    Ok(())
}

/// Human-readable database statistics.
pub fn format_stats<W: Write>(stats: &DbStats, w: &mut W) -> Result<()> {
    writeln!(w, "Database Statistics")?;
    writeln!(w, "==================")?;
    writeln!(w)?;
    writeln!(w, "Total Hits:  {}", stats.total_hits)?;
    writeln!(w)?;

    writeln!(w, "By Severity:")?;
    for sev in [Severity::High, Severity::Med, Severity::Low] {
        let count = stats.by_severity.get(&sev).copied().unwrap_or(0);
        writeln!(w, "  {:<6} {}", sev.to_string(), count)?;
    }

    if !stats.top_keywords.is_empty() {
        writeln!(w)?;
        writeln!(w, "Top Keywords:")?;
        for (i, kw) in stats.top_keywords.iter().enumerate() {
            writeln!(w, "  {:>2}. {:<20} {}", i + 1, kw.keyword, kw.count)?;
        }
    }

    if let (Some(first), Some(last)) = (stats.first_hit, stats.last_hit) {
        writeln!(w)?;
        writeln!(w, "Date Range:")?;
        writeln!(w, "  First Hit: {}", first.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(w, "  Last Hit:  {}", last.format("%Y-%m-%d %H:%M:%S"))?;
    }

    Ok(())
}

/// Full detail view of one profile.
pub fn format_profile_detail<W: Write>(profile: &Profile, w: &mut W) -> Result<()> {
    writeln!(w, "Profile: {}", profile.name)?;
    if !profile.description.is_empty() {
        writeln!(w, "Description: {}", profile.description)?;
    }
    writeln!(w)?;

    writeln!(w, "Keywords ({}):", profile.keywords.len())?;
    writeln!(w, "  {}", profile.keywords.join(", "))?;
    writeln!(w)?;

    writeln!(w, "Suspicious TLDs ({}):", profile.suspicious_tlds.len())?;
    writeln!(w, "  {}", profile.suspicious_tlds.join(", "))?;
    writeln!(w)?;

    writeln!(w, "Skip Suffixes ({}):", profile.skip_suffixes.len())?;
    for suffix in &profile.skip_suffixes {
        writeln!(w, "  - {suffix}")?;
    }

    Ok(())
}

/// One line per profile with its description.
pub fn format_profile_list<W: Write>(profiles: &[Profile], w: &mut W) -> Result<()> {
    writeln!(w, "Available Profiles:")?;
    writeln!(w)?;
    for profile in profiles {
        let desc = if profile.description.is_empty() {
            format!("{} keywords", profile.keywords.len())
        } else {
            profile.description.clone()
        };
        writeln!(w, "  {:<12} {}", profile.name, desc)?;
    }
    Ok(())
}

/// Colour a severity for terminal display.
pub fn colored_severity(severity: Option<Severity>) -> String {
    match severity {
        Some(Severity::High) => "HIGH".red().bold().to_string(),
        Some(Severity::Med) => "MED".yellow().to_string(),
        Some(Severity::Low) => "LOW".normal().to_string(),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}...", &s[..max.saturating_sub(3)])
    } else {
        s.to_string()
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_hit() -> Hit {
        Hit {
            domain: "evil-bitcoin.xyz".to_string(),
            score: 6,
            severity: Some(Severity::High),
            keywords: vec!["bitcoin".to_string()],
            issuer: "Let's Encrypt".to_string(),
            issuer_cn: "R3".to_string(),
            ct_log: "Google Argon".to_string(),
            profile: "crypto".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_table_has_header_and_row() {
        let mut buf = Vec::new();
        format_table(&[sample_hit()], &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("SEVERITY"));
        assert!(lines[1].contains("evil-bitcoin.xyz"));
        assert!(lines[1].contains("2026-01-15 10:30:00"));
    }

    #[test]
    fn test_jsonl_round_trips() {
        let mut buf = Vec::new();
        format_jsonl(&[sample_hit()], &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let decoded: Hit = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(decoded, sample_hit());
    }

    #[test]
    fn test_csv_header_and_escaping() {
        let mut hit = sample_hit();
        hit.issuer = "Issuer, Inc".to_string();
        let mut buf = Vec::new();
        format_csv(&[hit], &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("severity,score,domain"));
        assert!(out.contains("\"Issuer, Inc\""));
    }

    #[test]
    fn test_stats_rendering() {
        let mut stats = DbStats {
            total_hits: 3,
            ..Default::default()
        };
        stats.by_severity.insert(Severity::High, 1);
        stats.by_severity.insert(Severity::Med, 2);

        let mut buf = Vec::new();
        format_stats(&stats, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Total Hits:  3"));
        assert!(out.contains("HIGH   1"));
        assert!(out.contains("MED    2"));
        assert!(out.contains("LOW    0"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 30), "short");
        let long = "a".repeat(40);
        let truncated = truncate(&long, 30);
        assert_eq!(truncated.len(), 30);
        assert!(truncated.ends_with("..."));
    }
}

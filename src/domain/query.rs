// src/domain/query.rs
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::Severity;

/// Filtering criteria for querying hits from storage. All fields are
/// optional; zero values mean "no filter". Set fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Substring match against the stored keywords JSON column.
    pub keyword: String,

    /// Minimum score. Zero means no minimum.
    pub score_min: i64,

    /// Exact severity match.
    pub severity: Option<Severity>,

    /// Only hits created within this duration before now.
    pub since: Option<Duration>,

    /// Domain suffix match. A leading dot is optional; ".xyz" and "xyz"
    /// behave identically.
    pub tld: String,

    /// Exact session tag match.
    pub session: String,

    /// Only bookmarked hits.
    pub bookmarked: bool,

    /// Only hits that answered an HTTP probe.
    pub live_only: bool,

    /// Sort column. Must be one of the allow-listed column names;
    /// anything else falls back to `created_at`.
    pub sort_by: String,

    /// Sort direction, "ASC" or "DESC" (case-insensitive). Defaults to DESC.
    pub sort_dir: String,

    /// Maximum number of results. Zero means unlimited.
    pub limit: i64,

    /// Number of results to skip, for pagination.
    pub offset: i64,
}

/// Aggregate statistics about stored hits.
#[derive(Debug, Clone, Default)]
pub struct DbStats {
    /// Total number of hit rows.
    pub total_hits: i64,

    /// Hit count per severity level.
    pub by_severity: HashMap<Severity, i64>,

    /// Most frequently matched keywords, by count descending.
    pub top_keywords: Vec<KeywordCount>,

    /// Timestamp of the earliest stored hit. None when the store is empty.
    pub first_hit: Option<DateTime<Utc>>,

    /// Timestamp of the most recent stored hit. None when the store is empty.
    pub last_hit: Option<DateTime<Utc>>,
}

/// How many times a keyword has matched across all stored hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: i64,
}

// src/domain/types.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threat level classification derived from a hit's score.
/// HIGH >= 6, MED 4-5, LOW 1-3. A score of zero carries no severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MED")]
    Med,
    #[serde(rename = "LOW")]
    Low,
}

impl Severity {
    /// Map a numeric score to a severity level. Zero scores have none.
    pub fn from_score(score: i64) -> Option<Severity> {
        match score {
            s if s >= 6 => Some(Severity::High),
            s if s >= 4 => Some(Severity::Med),
            s if s >= 1 => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Med => "MED",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" => Ok(Severity::High),
            "MED" => Ok(Severity::Med),
            "LOW" => Ok(Severity::Low),
            other => anyhow::bail!("invalid severity {:?}; expected HIGH, MED, or LOW", other),
        }
    }
}

/// A scored domain persisted to storage. One row per domain: repeat
/// observations update the existing record rather than appending.
///
/// Certificate and scoring fields are written by the poller; the
/// enrichment fields start zero-valued and are filled in by the
/// enrichment pipeline; `bookmarked` is operator state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Domain name extracted from the certificate CN or SAN. Unique key.
    pub domain: String,

    /// Total score from the scoring heuristics.
    pub score: i64,

    /// Threat level derived from the score.
    pub severity: Option<Severity>,

    /// Profile keywords found in the domain, in profile order.
    pub keywords: Vec<String>,

    /// Certificate issuer organization name.
    pub issuer: String,

    /// Certificate issuer Common Name.
    pub issuer_cn: String,

    /// All DNS SAN entries from the certificate, including the domain itself.
    pub san_domains: Vec<String>,

    /// Certificate validity start.
    pub cert_not_before: Option<DateTime<Utc>>,

    /// Name of the CT log this entry was fetched from.
    pub ct_log: String,

    /// Name of the keyword profile active when the hit was scored.
    pub profile: String,

    /// Optional operator tag grouping hits from one monitoring run.
    pub session: String,

    /// When the hit was first stored.
    pub created_at: Option<DateTime<Utc>>,

    /// When the hit was last updated (a repeat certificate for the domain).
    pub updated_at: Option<DateTime<Utc>>,

    /// Whether the domain answered an HTTP probe. False until probed.
    pub is_live: bool,

    /// DNS A/AAAA records for the domain. Empty until probed.
    pub resolved_ips: Vec<String>,

    /// Detected CDN or hosting provider. Empty until probed.
    pub hosting_provider: String,

    /// HTTP status code from the liveness probe. Zero until probed.
    pub http_status: i64,

    /// When the liveness probe last ran.
    pub live_checked_at: Option<DateTime<Utc>>,

    /// Operator flag marking the hit as interesting.
    pub bookmarked: bool,
}

/// Raw entry from a CT log, after base64 decoding. Output of the CT log
/// client and input to the leaf parser. Never persisted.
#[derive(Debug, Clone)]
pub struct CTLogEntry {
    /// Decoded MerkleTreeLeaf bytes from the `leaf_input` field.
    pub leaf_input: Vec<u8>,

    /// Decoded `extra_data` bytes (certificate chain).
    pub extra_data: Vec<u8>,

    /// Zero-based position of this entry in the log tree.
    pub index: i64,

    /// Base URL of the CT log that produced this entry.
    pub log_url: String,
}

/// Output of the scoring engine. The poller combines this with
/// certificate metadata to build the full Hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDomain {
    pub domain: String,
    pub score: i64,
    pub severity: Option<Severity>,
    pub matched_keywords: Vec<String>,
}

/// A keyword profile: the terms, TLDs, and exclusions used for scoring.
/// Loaded from built-in definitions or `[custom_profiles.<name>]` config
/// tables, and immutable after startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Unique profile name (e.g. "crypto", "phishing", "all").
    #[serde(default)]
    pub name: String,

    /// Terms searched for in domain names. Case-insensitive substring
    /// matching; each match contributes 2 points.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// TLDs that receive a +1 bonus. Entries are accepted with or without
    /// the leading dot.
    #[serde(default)]
    pub suspicious_tlds: Vec<String>,

    /// Domain suffixes excluded from scoring entirely. A matching domain
    /// scores zero regardless of keyword content.
    #[serde(default)]
    pub skip_suffixes: Vec<String>,

    /// Human-readable summary. The value `extends:<base>` inherits the
    /// base profile's sets.
    #[serde(default)]
    pub description: String,
}

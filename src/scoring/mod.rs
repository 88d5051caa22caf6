// src/scoring/mod.rs
//! Domain scoring heuristics.

mod heuristics;

use crate::domain::{Profile, ScoredDomain, Severity};

/// Stateless scoring engine. Runs every heuristic against a domain and
/// classifies the total. Scoring never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Score a domain against a profile. Domains matching a skip suffix
    /// short-circuit to zero regardless of keyword content.
    pub fn score(&self, domain: &str, profile: &Profile) -> ScoredDomain {
        let lower = domain.to_lowercase();

        // Skip suffixes first -- infrastructure domains generate noise.
        for suffix in &profile.skip_suffixes {
            if lower.ends_with(&suffix.to_lowercase()) {
                return ScoredDomain {
                    domain: domain.to_string(),
                    score: 0,
                    severity: None,
                    matched_keywords: Vec::new(),
                };
            }
        }

        let (kw_score, matched) = heuristics::match_keywords(&lower, &profile.keywords);
        let mut total = kw_score;
        total += heuristics::score_tld(&lower, &profile.suspicious_tlds);
        total += heuristics::score_domain_length(domain);
        total += heuristics::score_hyphen_density(domain);
        total += heuristics::score_number_sequences(domain);
        total += heuristics::score_multi_keyword_bonus(matched.len());

        ScoredDomain {
            domain: domain.to_string(),
            score: total,
            severity: Severity::from_score(total),
            matched_keywords: matched,
        }
    }
}

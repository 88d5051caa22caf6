// src/scoring/heuristics.rs
//! Individual scoring heuristics. Each takes a domain string and returns
//! the points it contributes.

/// Returns the keyword score and the matched keywords in profile order.
/// Each case-insensitive substring match contributes 2 points.
/// `lower` must already be lowercased by the caller.
pub(crate) fn match_keywords(lower: &str, keywords: &[String]) -> (i64, Vec<String>) {
    let mut score = 0;
    let mut matched = Vec::new();
    for kw in keywords {
        if lower.contains(&kw.to_lowercase()) {
            score += 2;
            matched.push(kw.clone());
        }
    }
    (score, matched)
}

/// +1 if the domain ends with any of the suspicious TLDs. Profile entries
/// are accepted with or without a leading dot.
pub(crate) fn score_tld(lower: &str, suspicious_tlds: &[String]) -> i64 {
    for tld in suspicious_tlds {
        let t = tld.to_lowercase();
        let dotted = if t.starts_with('.') { t } else { format!(".{t}") };
        if lower.ends_with(&dotted) {
            return 1;
        }
    }
    0
}

/// +1 if the registered portion (everything before the last dot) exceeds
/// 30 characters. Auto-generated and impersonation domains run long.
pub(crate) fn score_domain_length(domain: &str) -> i64 {
    if registered_part(domain).len() > 30 {
        1
    } else {
        0
    }
}

/// +1 if the registered portion contains 2 or more hyphens, a common
/// pattern in phishing and typosquatting domains.
pub(crate) fn score_hyphen_density(domain: &str) -> i64 {
    let hyphens = registered_part(domain).matches('-').count();
    if hyphens >= 2 {
        1
    } else {
        0
    }
}

/// +1 if the domain contains 4 or more consecutive digits anywhere.
pub(crate) fn score_number_sequences(domain: &str) -> i64 {
    let mut consecutive = 0;
    for ch in domain.chars() {
        if ch.is_numeric() {
            consecutive += 1;
            if consecutive >= 4 {
                return 1;
            }
        } else {
            consecutive = 0;
        }
    }
    0
}

/// +2 when 3 or more keywords matched: stacked keywords indicate
/// intentional impersonation rather than coincidence.
pub(crate) fn score_multi_keyword_bonus(match_count: usize) -> i64 {
    if match_count >= 3 {
        2
    } else {
        0
    }
}

/// The registered domain portion, excluding the final label.
/// "evil-bank-login.phishing.xyz" -> "evil-bank-login.phishing";
/// a string without a dot is returned whole.
fn registered_part(domain: &str) -> &str {
    match domain.rfind('.') {
        Some(idx) => &domain[..idx],
        None => domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_keywords_in_profile_order() {
        let keywords: Vec<String> = ["wallet", "bitcoin"].iter().map(|s| s.to_string()).collect();
        let (score, matched) = match_keywords("bitcoin-wallet.com", &keywords);
        assert_eq!(score, 4);
        assert_eq!(matched, vec!["wallet", "bitcoin"]);
    }

    #[test]
    fn test_score_tld_with_and_without_dot() {
        let dotted: Vec<String> = vec![".xyz".to_string()];
        let bare: Vec<String> = vec!["xyz".to_string()];
        assert_eq!(score_tld("evil.xyz", &dotted), 1);
        assert_eq!(score_tld("evil.xyz", &bare), 1);
        // A bare entry must not match mid-label.
        assert_eq!(score_tld("evilxyz", &bare), 0);
        assert_eq!(score_tld("evil.com", &dotted), 0);
    }

    #[test]
    fn test_registered_part() {
        assert_eq!(registered_part("example.com"), "example");
        assert_eq!(registered_part("a.b.c.xyz"), "a.b.c");
        assert_eq!(registered_part("nodot"), "nodot");
    }

    #[test]
    fn test_score_domain_length_boundary() {
        // Exactly 30 characters before the TLD: no bonus.
        let thirty = format!("{}.com", "a".repeat(30));
        assert_eq!(score_domain_length(&thirty), 0);
        let thirty_one = format!("{}.com", "a".repeat(31));
        assert_eq!(score_domain_length(&thirty_one), 1);
    }

    #[test]
    fn test_score_domain_length_no_dot_counts_whole_string() {
        assert_eq!(score_domain_length(&"a".repeat(31)), 1);
        assert_eq!(score_domain_length(&"a".repeat(30)), 0);
    }

    #[test]
    fn test_score_hyphen_density() {
        assert_eq!(score_hyphen_density("one-hyphen.com"), 0);
        assert_eq!(score_hyphen_density("two-hyphens-here.com"), 1);
        // Hyphens in the final label do not count.
        assert_eq!(score_hyphen_density("plain.multi-part-tld"), 0);
    }

    #[test]
    fn test_score_number_sequences_requires_consecutive_digits() {
        assert_eq!(score_number_sequences("a1b2c3d4.com"), 0);
        assert_eq!(score_number_sequences("abc1234.com"), 1);
        assert_eq!(score_number_sequences("123.456.com"), 0);
    }

    #[test]
    fn test_multi_keyword_bonus_threshold() {
        assert_eq!(score_multi_keyword_bonus(2), 0);
        assert_eq!(score_multi_keyword_bonus(3), 2);
        assert_eq!(score_multi_keyword_bonus(7), 2);
    }
}

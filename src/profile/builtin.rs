// src/profile/builtin.rs
//! Built-in keyword profiles.

use crate::domain::Profile;

/// Infrastructure domain suffixes that generate noise and are skipped
/// during scoring regardless of profile.
pub(crate) fn common_skip_suffixes() -> Vec<String> {
    [
        "cloudflaressl.com",
        "amazonaws.com",
        "herokuapp.com",
        "azurewebsites.net",
        "googleusercontent.com",
        "fastly.net",
        "akamaiedge.net",
        "cloudfront.net",
        "github.io",
        "gitlab.io",
        "netlify.app",
        "vercel.app",
        "firebaseapp.com",
        "appspot.com",
        "trafficmanager.net",
        "azure-api.net",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Profile targeting cryptocurrency and financial scam domains.
pub(crate) fn crypto_profile() -> Profile {
    Profile {
        name: "crypto".to_string(),
        keywords: [
            "casino", "swap", "exchange", "airdrop", "token",
            "wallet", "invest", "mining", "defi", "stake",
            "yield", "claim", "reward", "bonus", "crypto",
            "bitcoin", "ethereum", "binance", "coinbase", "metamask",
            "login",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        suspicious_tlds: [
            ".xyz", ".top", ".vip", ".win", ".bet",
            ".casino", ".click", ".buzz", ".icu", ".monster",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        skip_suffixes: common_skip_suffixes(),
        description: "Cryptocurrency, casino, and financial scam domains".to_string(),
    }
}

/// Profile targeting credential phishing and brand impersonation domains.
pub(crate) fn phishing_profile() -> Profile {
    Profile {
        name: "phishing".to_string(),
        keywords: [
            "login", "signin", "verify", "secure", "account",
            "update", "confirm", "banking", "paypal", "microsoft",
            "apple", "google", "amazon", "netflix", "support",
            "helpdesk", "password", "credential",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        suspicious_tlds: [
            ".xyz", ".top", ".info", ".click", ".buzz",
            ".icu", ".monster", ".tk", ".ml", ".ga",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        skip_suffixes: common_skip_suffixes(),
        description: "Credential phishing and brand impersonation domains".to_string(),
    }
}

/// Combined profile: deduplicated union of all built-in keywords and TLDs,
/// concatenation order with first occurrence winning.
pub(crate) fn all_profile() -> Profile {
    let crypto = crypto_profile();
    let phishing = phishing_profile();

    Profile {
        name: "all".to_string(),
        keywords: merge_unique(&crypto.keywords, &phishing.keywords),
        suspicious_tlds: merge_unique(&crypto.suspicious_tlds, &phishing.suspicious_tlds),
        skip_suffixes: common_skip_suffixes(),
        description: "Combined profile with all keywords and TLDs from crypto + phishing".to_string(),
    }
}

/// Concatenate two string lists, keeping the first occurrence of each entry.
pub(crate) fn merge_unique(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(a.len() + b.len());
    let mut result = Vec::with_capacity(a.len() + b.len());
    for s in a.iter().chain(b.iter()) {
        if seen.insert(s.clone()) {
            result.push(s.clone());
        }
    }
    result
}

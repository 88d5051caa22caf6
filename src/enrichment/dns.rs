// src/enrichment/dns.rs
//! DNS resolution and hosting-provider fingerprinting.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use ipnet::IpNet;
use lazy_static::lazy_static;
use tracing::debug;

/// Maximum time allowed for a DNS lookup.
const DNS_TIMEOUT: Duration = Duration::from_secs(3);

lazy_static! {
    /// Known provider CIDR ranges. A representative subset, enough for
    /// common CDN and cloud detection. A malformed entry is a programming
    /// error and panics at first use.
    static ref KNOWN_CIDRS: Vec<(&'static str, Vec<IpNet>)> = vec![
        ("cloudflare", parse_cidrs(&[
            "104.16.0.0/12",
            "172.64.0.0/13",
            "131.0.72.0/22",
            "2606:4700::/32",
        ])),
        ("fastly", parse_cidrs(&["151.101.0.0/16", "199.232.0.0/16"])),
        ("akamai", parse_cidrs(&["23.0.0.0/12", "104.64.0.0/10"])),
        ("digitalocean", parse_cidrs(&[
            "167.172.0.0/16",
            "164.90.0.0/16",
            "143.198.0.0/16",
            "137.184.0.0/16",
        ])),
    ];

    /// Substrings in reverse DNS names mapped to provider tags.
    static ref REVERSE_DNS_PATTERNS: Vec<(&'static str, &'static str)> = vec![
        ("cloudflare", "cloudflare"),
        ("amazonaws.com", "aws"),
        ("googleusercontent", "gcp"),
        ("1e100.net", "gcp"),
        ("azure.com", "azure"),
        ("msedge.net", "azure"),
        ("fastly", "fastly"),
        ("akamai", "akamai"),
        ("digitalocean.com", "digitalocean"),
    ];
}

fn parse_cidrs(cidrs: &[&str]) -> Vec<IpNet> {
    cidrs
        .iter()
        .map(|c| c.parse().expect("invalid CIDR in provider table"))
        .collect()
}

/// Resolves domains and identifies their hosting provider.
pub struct DnsProber {
    resolver: TokioResolver,
}

impl DnsProber {
    pub fn new() -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = DNS_TIMEOUT;
        // ndots 1 stops the resolver appending local search domains; CT
        // entries are always fully qualified.
        opts.ndots = 1;

        let resolver = Resolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .with_options(opts)
        .build();

        DnsProber { resolver }
    }

    /// Resolve A/AAAA records and identify the hosting provider: CIDR
    /// membership first, then a reverse lookup of the first IP matched
    /// against the pattern table, else "unknown".
    pub async fn resolve_domain(&self, domain: &str) -> Result<(Vec<String>, String)> {
        let lookup = tokio::time::timeout(DNS_TIMEOUT, self.resolver.lookup_ip(domain))
            .await
            .with_context(|| format!("DNS lookup timed out for {domain}"))?
            .with_context(|| format!("resolving {domain}"))?;

        let addrs: Vec<IpAddr> = lookup.iter().collect();
        let ips: Vec<String> = addrs.iter().map(|ip| ip.to_string()).collect();

        if let Some(provider) = match_cidr(&addrs) {
            return Ok((ips, provider.to_string()));
        }

        if let Some(provider) = self.match_reverse_dns(&addrs).await {
            return Ok((ips, provider.to_string()));
        }

        Ok((ips, "unknown".to_string()))
    }

    /// PTR lookup of the first IP that resolves, checked against the
    /// pattern table. Only the first resolvable IP is tried; cascading
    /// slow lookups are not worth the signal.
    async fn match_reverse_dns(&self, addrs: &[IpAddr]) -> Option<&'static str> {
        for addr in addrs {
            let lookup =
                match tokio::time::timeout(DNS_TIMEOUT, self.resolver.reverse_lookup(*addr)).await {
                    Ok(Ok(lookup)) => lookup,
                    Ok(Err(e)) => {
                        debug!(ip = %addr, error = %e, "reverse lookup failed");
                        continue;
                    }
                    Err(_) => {
                        debug!(ip = %addr, "reverse lookup timed out");
                        continue;
                    }
                };

            for name in lookup.iter() {
                if let Some(provider) = match_reverse_name(&name.to_string()) {
                    return Some(provider);
                }
            }
            break;
        }
        None
    }
}

impl Default for DnsProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Check each IP against the known provider CIDR ranges.
fn match_cidr(addrs: &[IpAddr]) -> Option<&'static str> {
    for addr in addrs {
        for (provider, nets) in KNOWN_CIDRS.iter() {
            if nets.iter().any(|net| net.contains(addr)) {
                return Some(provider);
            }
        }
    }
    None
}

/// Match a reverse DNS name against the pattern table.
fn match_reverse_name(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    for (pattern, provider) in REVERSE_DNS_PATTERNS.iter() {
        if lower.contains(pattern) {
            return Some(provider);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_match_cidr_cloudflare_v4() {
        assert_eq!(match_cidr(&[ip("104.16.0.1")]), Some("cloudflare"));
        assert_eq!(match_cidr(&[ip("172.67.1.1")]), Some("cloudflare"));
    }

    #[test]
    fn test_match_cidr_cloudflare_v6() {
        assert_eq!(match_cidr(&[ip("2606:4700::6810:1")]), Some("cloudflare"));
    }

    #[test]
    fn test_match_cidr_other_providers() {
        assert_eq!(match_cidr(&[ip("151.101.1.1")]), Some("fastly"));
        assert_eq!(match_cidr(&[ip("23.1.2.3")]), Some("akamai"));
        assert_eq!(match_cidr(&[ip("167.172.5.5")]), Some("digitalocean"));
    }

    #[test]
    fn test_match_cidr_unknown() {
        assert_eq!(match_cidr(&[ip("8.8.8.8")]), None);
        assert_eq!(match_cidr(&[]), None);
    }

    #[test]
    fn test_match_cidr_second_ip_matches() {
        assert_eq!(match_cidr(&[ip("8.8.8.8"), ip("104.16.0.1")]), Some("cloudflare"));
    }

    #[test]
    fn test_match_reverse_name() {
        assert_eq!(
            match_reverse_name("ec2-1-2-3-4.compute-1.amazonaws.com."),
            Some("aws")
        );
        assert_eq!(match_reverse_name("any-host.1e100.net."), Some("gcp"));
        assert_eq!(match_reverse_name("Edge.Msedge.NET."), Some("azure"));
        assert_eq!(match_reverse_name("unrelated.example.org."), None);
    }

    #[test]
    fn test_provider_tables_parse() {
        // Forces lazy initialization; a malformed entry panics here.
        assert!(!KNOWN_CIDRS.is_empty());
        assert!(!REVERSE_DNS_PATTERNS.is_empty());
    }
}

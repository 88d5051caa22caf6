// src/ct_log/leaf.rs
//! MerkleTreeLeaf decoding (RFC 6962 section 3.4) and certificate domain
//! extraction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use thiserror::Error;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::*;

use crate::domain::CTLogEntry;

/// Structural errors in a MerkleTreeLeaf. Per-entry failures are skipped
/// with a warning by the poller; they never abort a batch.
#[derive(Debug, Error)]
pub enum LeafError {
    #[error("leaf input too short: {0} bytes")]
    TooShort(usize),

    #[error("{0} truncated: need {1} bytes, have {2}")]
    Truncated(&'static str, usize, usize),

    #[error("unknown entry type: {0}")]
    UnknownEntryType(u16),
}

/// Certificate fields the poller needs to build a Hit.
#[derive(Debug, Clone)]
pub struct ParsedCert {
    /// Subject CN (when non-empty) followed by DNS SANs, first
    /// occurrence wins.
    pub domains: Vec<String>,

    /// Issuer organization name, empty when absent.
    pub issuer_org: String,

    /// Issuer Common Name, empty when absent.
    pub issuer_cn: String,

    /// Certificate validity start.
    pub not_before: Option<DateTime<Utc>>,
}

/// Parse a CT log entry: decode the MerkleTreeLeaf, parse the X.509
/// certificate, and extract domains plus issuer metadata.
pub fn parse_entry(entry: &CTLogEntry) -> Result<ParsedCert> {
    let cert_der = extract_cert_from_leaf(&entry.leaf_input)
        .context("extracting certificate from leaf")?;

    let (_, cert) = X509Certificate::from_der(&cert_der)
        .map_err(|e| anyhow::anyhow!("parsing x509 certificate: {e:?}"))?;

    let not_before = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0);

    let parsed = ParsedCert {
        domains: unique_domains(&cert),
        issuer_org: name_attr(cert.issuer().iter_organization().next()),
        issuer_cn: name_attr(cert.issuer().iter_common_name().next()),
        not_before,
    };
    Ok(parsed)
}

/// Decode the MerkleTreeLeaf structure and return the DER-encoded
/// certificate bytes.
///
/// Layout: Version(1) + LeafType(1) + Timestamp(8) + EntryType(2, BE),
/// then for x509_entry (type 0) a 3-byte length-prefixed ASN1Cert, and
/// for precert_entry (type 1) a 32-byte issuer_key_hash followed by a
/// 3-byte length-prefixed TBSCertificate.
pub fn extract_cert_from_leaf(leaf_input: &[u8]) -> Result<Vec<u8>, LeafError> {
    if leaf_input.len() < 15 {
        return Err(LeafError::TooShort(leaf_input.len()));
    }

    let entry_type = u16::from_be_bytes([leaf_input[10], leaf_input[11]]);

    match entry_type {
        0 => {
            // ASN1Cert is an opaque<1..2^24-1>: 3-byte length + DER cert.
            let cert_len = u24(&leaf_input[12..15]);
            let need = 15 + cert_len;
            if leaf_input.len() < need {
                return Err(LeafError::Truncated("x509_entry cert", need, leaf_input.len()));
            }
            Ok(leaf_input[15..need].to_vec())
        }
        1 => {
            // PreCert: issuer_key_hash(32) + TBSCertificate opaque<1..2^24-1>.
            let mut offset = 12;
            if leaf_input.len() < offset + 32 + 3 {
                return Err(LeafError::Truncated(
                    "precert_entry header",
                    offset + 35,
                    leaf_input.len(),
                ));
            }
            offset += 32;
            let tbs_len = u24(&leaf_input[offset..offset + 3]);
            offset += 3;
            let need = offset + tbs_len;
            if leaf_input.len() < need {
                return Err(LeafError::Truncated("precert TBS", need, leaf_input.len()));
            }
            Ok(wrap_tbs_certificate(&leaf_input[offset..need]))
        }
        other => Err(LeafError::UnknownEntryType(other)),
    }
}

/// Wrap a raw TBSCertificate in a minimal Certificate structure so the
/// X.509 parser accepts it. Pre-certificate leaves carry only the TBS;
/// the dummy SHA256withRSA algorithm and empty signature satisfy the
/// outer SEQUENCE shape. Signature data is discarded by design of the
/// leaf format, not by this wrapper.
fn wrap_tbs_certificate(tbs: &[u8]) -> Vec<u8> {
    // AlgorithmIdentifier: SEQUENCE { OID 1.2.840.113549.1.1.11 (sha256WithRSA), NULL }
    const DUMMY_ALG: [u8; 15] = [
        0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b, 0x05, 0x00,
    ];
    // Empty signature: BIT STRING of length 1 (zero unused bits, no content).
    const EMPTY_SIG: [u8; 3] = [0x03, 0x01, 0x00];

    let inner_len = tbs.len() + DUMMY_ALG.len() + EMPTY_SIG.len();
    let len_bytes = der_length(inner_len);

    let mut out = Vec::with_capacity(1 + len_bytes.len() + inner_len);
    out.push(0x30); // outer SEQUENCE
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(tbs);
    out.extend_from_slice(&DUMMY_ALG);
    out.extend_from_slice(&EMPTY_SIG);
    out
}

/// DER definite-form length encoding.
fn der_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let mut bytes = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        bytes.push((remaining & 0xff) as u8);
        remaining >>= 8;
    }
    bytes.reverse();
    let mut out = vec![0x80 | bytes.len() as u8];
    out.extend_from_slice(&bytes);
    out
}

/// 3-byte big-endian length prefix.
fn u24(bytes: &[u8]) -> usize {
    ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize)
}

/// All unique domain names from a certificate: Subject CN first (when
/// non-empty), then DNS SANs, first occurrence winning.
fn unique_domains(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut domains = Vec::new();

    let cn = name_attr(cert.subject().iter_common_name().next());
    if !cn.is_empty() && seen.insert(cn.clone()) {
        domains.push(cn);
    }

    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for general_name in &san.general_names {
                if let GeneralName::DNSName(dns_name) = general_name {
                    let name = dns_name.to_string();
                    if seen.insert(name.clone()) {
                        domains.push(name);
                    }
                }
            }
        }
    }

    domains
}

/// Render a name attribute as a string, empty when absent or non-UTF-8.
fn name_attr(attr: Option<&x509_parser::x509::AttributeTypeAndValue<'_>>) -> String {
    attr.and_then(|a| a.as_str().ok()).unwrap_or_default().to_string()
}

// src/ct_log/types.rs
use serde::Deserialize;

/// Response from a CT log's get-sth endpoint. Extra fields (root hash,
/// signature) are ignored; this system trusts the log.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedTreeHead {
    /// Total number of entries in the log tree.
    pub tree_size: i64,

    /// Unix millisecond timestamp when this tree head was signed.
    pub timestamp: i64,
}

/// Single raw entry from the get-entries endpoint, still base64-encoded.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntry {
    pub leaf_input: String,
    #[serde(default)]
    pub extra_data: String,
}

/// Wrapper around the get-entries JSON response.
#[derive(Debug, Deserialize)]
pub(crate) struct GetEntriesResponse {
    pub entries: Vec<RawEntry>,
}

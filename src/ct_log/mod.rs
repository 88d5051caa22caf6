// src/ct_log/mod.rs
//! RFC 6962 Certificate Transparency log access: the HTTP client and the
//! MerkleTreeLeaf parser.

pub mod client;
pub mod leaf;
pub mod types;

pub use client::CtLogClient;
pub use leaf::{extract_cert_from_leaf, parse_entry, LeafError, ParsedCert};
pub use types::SignedTreeHead;

//! Credential hashing.
//!
//! The cache stores a SHA-256 digest of the credential so that a credential
//! change can be detected without ever persisting the secret itself.

use ring::digest::{SHA256, digest};
use std::fmt::Write;

/// Returns the lowercase hex SHA-256 digest of `token`.
///
/// An empty token hashes to an empty string, which never matches a stored
/// digest.
pub fn token_hash(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let sum = digest(&SHA256, token.as_bytes());
    sum.as_ref()
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

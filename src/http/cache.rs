//! HTTP cache validation
//!
//! `ETag` generation for bundle assets and `If-None-Match` evaluation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strong `ETag` over asset content, e.g. `"1f3a-9c0d2e"`
///
/// The length prefix keeps same-hash collisions of different sizes apart.
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Whether the client's `If-None-Match` value matches `etag`
///
/// Accepts lists (`"a", "b"`), the `*` wildcard, and weak validators
/// (`W/"a"`), which compare equal under the weak comparison RFC 9110 uses
/// for `If-None-Match`.
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

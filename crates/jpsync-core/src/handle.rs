//! Deterministic downstream handles.

use sha2::{Digest, Sha256};

use crate::vendor::Vendor;

/// Lowercase ASCII slug: alphanumerics kept, every other run of characters
/// collapsed into a single `-`, no leading or trailing dashes.
///
/// Non-ASCII text carries identity the slug would otherwise lose, so a
/// source id containing any is suffixed with 12 hex digits of its SHA-256
/// (`限定A` → `a-…`), or replaced by them when no alphanumeric is left.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if raw.is_ascii() && !slug.is_empty() {
        return slug;
    }
    let hash = short_hash(raw);
    if slug.is_empty() {
        hash
    } else {
        format!("{slug}-{hash}")
    }
}

fn short_hash(raw: &str) -> String {
    Sha256::digest(raw.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// `{vendor-tag}-{source-id-slug}`. The tag is always added, even when the
/// source id already starts with it, so distinct ids never share a handle.
#[must_use]
pub fn handle_for(vendor: Vendor, source_id: &str) -> String {
    format!("{}-{}", vendor.tag(), slugify(source_id))
}

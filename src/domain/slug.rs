//! Slugs for imported records.

use slug::slugify;

const MAX_SLUG_LEN: usize = 96;

/// Slug derived from the product title, falling back to the lowercased identifier.
pub fn record_slug(title: &str, asin: &str) -> String {
    let candidate = slugify(title);
    let base = if candidate.is_empty() {
        asin.to_ascii_lowercase()
    } else {
        candidate
    };

    match base.char_indices().nth(MAX_SLUG_LEN) {
        Some((cut, _)) => base[..cut].trim_end_matches('-').to_string(),
        None => base,
    }
}

//! Slug derivation from titles.
//!
//! Normalization is pure; uniqueness probing lives on the store because it
//! needs the database.

/// Normalize a title into a URL-safe slug.
///
/// Lowercases, strips everything except ASCII letters, digits, whitespace
/// and hyphens, converts whitespace runs to single hyphens, collapses hyphen
/// runs, and trims leading/trailing hyphens. Normalizing an existing slug
/// returns it unchanged.
#[must_use]
pub fn normalize(title: &str) -> String {
    let lowered = title.trim().to_lowercase();

    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut last_was_hyphen = false;
    for c in kept.chars() {
        let mapped = if c.is_whitespace() { '-' } else { c };
        if mapped == '-' {
            if !last_was_hyphen {
                slug.push('-');
            }
            last_was_hyphen = true;
        } else {
            slug.push(mapped);
            last_was_hyphen = false;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Render the candidate slug for a probe attempt: the base slug itself for
/// attempt 0, then `base-1`, `base-2`, ...
#[must_use]
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}

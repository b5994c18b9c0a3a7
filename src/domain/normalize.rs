//! Normalization rules shared by cache key derivation and row grouping.
//!
//! A query parameter and a fetched row field must pass through the same
//! function before they are compared, otherwise grouping fragments and cache
//! keys stop colliding for cosmetic variants of one entity.

/// Normalize a free-text name such as a chapter, topic or subject title.
///
/// Hyphens and underscores become spaces, whitespace runs collapse to a
/// single space, and the result is lower-cased and trimmed.
pub fn normalize_name(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a short category or exam code.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}

//! URL slug derivation shared by products and categories.

/// Lowercases a display name and joins whitespace-separated words with
/// hyphens.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

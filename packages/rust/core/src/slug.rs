//! Slug generation for permalinks.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of anything that is not a Unicode letter, digit or underscore.
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Derive a lower-case, hyphen-joined slug from a display name.
///
/// Distinct names can produce the same slug; callers that index by slug
/// must cope with that (see [`crate::graph::PathIndex`]).
///
/// ```
/// use hcexport_core::slug::slugify;
///
/// assert_eq!(slugify("Fritzbox 7490 - The WiFi is very slow."), "fritzbox-7490-the-wifi-is-very-slow");
/// assert_eq!(slugify("  Über uns  "), "über-uns");
/// ```
pub fn slugify(name: &str) -> String {
    NON_WORD
        .split(name.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

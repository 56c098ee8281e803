//! Area-code extraction from free-text process names
//!
//! Schedule rows carry the construction-method area code embedded in
//! the process name, e.g. "HDD-123-45 Fertigstellung Bohrung". The code
//! doubles as the join key against the crossing-partner register.

use once_cell::sync::Lazy;
use regex::Regex;

/// Construction-method prefix, separator, 2-3 digit area, 2 digit
/// section, anchored to word boundaries so longer digit runs never
/// match.
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(HDD|KV|OBW)[-\s]\d{2,3}-\d{2}\b").unwrap());

/// Extract the first area code from a process name, verbatim.
///
/// Prefixes are case-sensitive; at most one code is returned even when
/// the text contains several.
pub fn extract_code(text: &str) -> Option<String> {
    CODE_PATTERN.find(text).map(|m| m.as_str().to_string())
}

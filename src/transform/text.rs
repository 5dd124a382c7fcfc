//! Text cleanup helpers shared by extraction and transformation

use regex::Regex;
use std::sync::LazyLock;

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]").expect("citation pattern is valid")
});

/// Remove bracketed citation markers such as `[1]` or `[n 1]` and trim.
///
/// ```
/// use tabular_etl::transform::strip_citations;
///
/// assert_eq!(strip_citations("123[4][5]"), "123");
/// assert_eq!(strip_citations(" United States[n 1] "), "United States");
/// ```
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").trim().to_string()
}

/// Remove thousands separators and surrounding whitespace.
pub fn strip_thousands(text: &str) -> String {
    text.trim().replace(',', "")
}

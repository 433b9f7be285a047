//! SQL extraction from model completions.

use std::sync::OnceLock;

use regex::Regex;

/// Matches from the first "```sql" line to the last closing fence.
///
/// Inside the block only `\n` may break lines; `\r` and the Unicode line
/// and paragraph separators stop the match.
fn fenced_sql() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"```sql\n((?:[^\r\n\x{2028}\x{2029}]|\n)+)\n```").ok())
        .as_ref()
}

/// Extract the SQL text from a completion.
///
/// Returns the inner text of a block fenced with "```sql" when one is
/// present, otherwise the completion unchanged.
#[must_use]
pub fn extract_sql(completion: &str) -> &str {
    fenced_sql()
        .and_then(|pattern| pattern.captures(completion))
        .and_then(|caps| caps.get(1))
        .map_or(completion, |m| m.as_str())
}

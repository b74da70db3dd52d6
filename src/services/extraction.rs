use std::sync::LazyLock;

use regex::Regex;

use crate::models::Candidate;

/// Title patterns, most specific first. Model output mixes quoting
/// conventions within a single response, so every pattern runs and the
/// matches are merged; the first pattern that matched a span wins
/// through dedup.
///
/// The bare pattern is non-greedy up to the first `(YYYY)`, so a title
/// that itself contains a parenthesized year-like substring before its
/// real year will mis-split. Known limitation.
static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"«([^»]+)»\s*\((\d{4})\)").expect("valid regex"),
        Regex::new(r#""([^"]+)"\s*\((\d{4})\)"#).expect("valid regex"),
        Regex::new(r"([^,;\n]+?)\s*\((\d{4})\)").expect("valid regex"),
    ]
});

/// Characters stripped from the edges of a bare-pattern capture: the
/// bare pattern also matches quoted spans and would otherwise yield
/// `«Title»` alongside `Title`.
const TRIM_CHARS: &[char] = &['«', '»', '"', '*', '\'', ' ', '\t'];

/// Extracts candidate (title, year) pairs from raw generation output.
///
/// Matches are ordered by first appearance in the text and deduplicated
/// by exact (title, year) equality. An empty result is a valid outcome,
/// not an error.
pub fn extract_titles(text: &str) -> Vec<Candidate> {
    let mut matches: Vec<(usize, Candidate)> = Vec::new();

    for pattern in TITLE_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let start = captures.get(0).map_or(0, |m| m.start());
            let title = captures[1].trim_matches(TRIM_CHARS).to_string();
            if title.is_empty() {
                continue;
            }
            let year = captures[2].parse::<i32>().ok();
            matches.push((start, Candidate::new(title, year)));
        }
    }

    matches.sort_by_key(|(start, _)| *start);

    let mut candidates: Vec<Candidate> = Vec::new();
    for (_, candidate) in matches {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    tracing::debug!(count = candidates.len(), "Extracted candidate titles");

    candidates
}

//! Id-sequence helpers shared across the engine.

use std::collections::HashSet;

/// Deduplicate ids preserving first occurrence; empty ids are dropped.
pub fn ordered_unique<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        let id = id.as_ref();
        if id.is_empty() || seen.contains(id) {
            continue;
        }
        seen.insert(id.to_string());
        out.push(id.to_string());
    }
    out
}

/// First `n` characters of `s`, safe on multi-byte boundaries.
///
/// Used for short id prefixes in rendered headings and labels.
pub fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

//! Lexical relevance scoring and token-cost estimation.
//!
//! The planner ranks unfold candidates without any embedding calls, so
//! relevance here is a deliberately small tf-style score over query terms
//! and cost is a character-count proxy. All offsets and window sizes are
//! counted in characters, not bytes.

use std::collections::HashMap;

/// Terms ignored during query tokenization.
const STOPWORDS: [&str; 22] = [
    "the", "and", "for", "that", "with", "this", "from", "into", "have", "will", "your",
    "있다", "하기", "에서", "그리고", "합니다", "대한", "하는", "해야", "관련", "으로", "했다",
];

/// Characters that can appear inside a token.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ('가'..='힣').contains(&c)
}

/// Splits already-lowercased text into token runs of at least two characters.
fn scan_tokens(lowered: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in lowered.char_indices() {
        if is_token_char(c) {
            if start.is_none() {
                start = Some(idx);
            }
        } else if let Some(s) = start.take() {
            let token = &lowered[s..idx];
            if token.chars().count() >= 2 {
                tokens.push(token);
            }
        }
    }
    if let Some(s) = start {
        let token = &lowered[s..];
        if token.chars().count() >= 2 {
            tokens.push(token);
        }
    }
    tokens
}

/// Query terms: lowercased tokens minus stopwords, deduplicated while
/// preserving first occurrence. Term order matters downstream, earlier
/// terms weigh more.
pub fn tokenize_query(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for token in scan_tokens(&lowered) {
        if STOPWORDS.contains(&token) || terms.iter().any(|t| t == token) {
            continue;
        }
        terms.push(token.to_string());
    }
    terms
}

/// Lexical relevance of `text` against ordered query terms, rounded to
/// four decimals.
///
/// Per matching term: a position weight of `3.0 / (index + 1)`, a term
/// frequency component capped at 2.5, and a 0.5 bonus when the term occurs
/// within the first 240 characters.
pub fn score_text(query_terms: &[String], text: &str) -> f64 {
    let body = text.to_lowercase();
    if body.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in scan_tokens(&body) {
        *counts.entry(token).or_insert(0) += 1;
    }
    let head = braid_core::char_prefix(&body, 240);

    let mut score = 0.0;
    for (idx, term) in query_terms.iter().enumerate() {
        let tf = counts.get(term.as_str()).copied().unwrap_or(0);
        if tf == 0 {
            continue;
        }
        score += 3.0 / (idx as f64 + 1.0);
        score += f64::min(2.5, 0.6 * tf as f64);
        if head.contains(term.as_str()) {
            score += 0.5;
        }
    }
    round_to(score, 4)
}

/// Rough token cost of `text`: ceil(chars / 4) of the trimmed text with a
/// floor of one, zero for blank input. A proxy, not a tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let chars = trimmed.chars().count();
    usize::max(1, chars.div_ceil(4))
}

/// Short preview of `text`, windowed around the first query-term hit.
///
/// Without a hit the preview is the leading `max_chars` characters. With a
/// hit the window starts a third of `max_chars` before it. Ellipses mark
/// truncation on either side.
pub fn node_preview(text: &str, query: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let lowered = text.to_lowercase();
    let total_chars = text.chars().count();

    let hit = tokenize_query(query)
        .into_iter()
        .find_map(|term| lowered.find(&term).map(|b| lowered[..b].chars().count()));

    let Some(pos) = hit else {
        let snippet = char_slice(text, 0, max_chars);
        return if total_chars > max_chars {
            format!("{}...", snippet)
        } else {
            snippet.to_string()
        };
    };

    let start = pos.saturating_sub(max_chars / 3);
    let end = usize::min(total_chars, start + max_chars);
    let mut snippet = char_slice(text, start, end).trim().to_string();
    if start > 0 {
        snippet = format!("...{}", snippet);
    }
    if end < total_chars {
        snippet = format!("{}...", snippet);
    }
    snippet
}

pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Substring between two character offsets, clamped to the text length.
fn char_slice(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    &s[char_boundary(s, start)..char_boundary(s, end)]
}

fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

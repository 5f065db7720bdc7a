//! Shapes raw model speech into something an advisor can say aloud.
//!
//! Output always has 2 to 5 sentences, no semicolons, and at most
//! `max_words` words.

use council_core::{MAX_SENTENCES, MIN_MAX_WORDS, MIN_SENTENCES};
use regex::Regex;
use std::sync::LazyLock;

/// Appended when the model gives fewer than two sentences.
pub const DETAIL_FALLBACK: &str =
    "I do not know. What is the specific detail you want me to confirm?";

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern compiles"));

/// Split on terminal punctuation followed by whitespace. The punctuation
/// stays with its sentence and empty fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // The punctuation class is ASCII, so it is exactly one byte.
        out.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    out.push(&text[start..]);
    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn normalize(raw: &str, max_sentences: usize, max_words: usize) -> String {
    let max_sentences = max_sentences.clamp(MIN_SENTENCES, MAX_SENTENCES);
    let max_words = max_words.max(MIN_MAX_WORDS);

    let cleaned = raw.replace(';', ".");
    let sentences: Vec<&str> = split_sentences(cleaned.trim())
        .into_iter()
        .take(max_sentences)
        .collect();
    if sentences.len() < MIN_SENTENCES {
        return with_fallback(&sentences.join(" "), max_words);
    }

    let joined = sentences.join(" ");
    if word_count(&joined) <= max_words {
        return joined;
    }
    let truncated = truncate_words(&joined, max_words);
    if split_sentences(&truncated).len() < MIN_SENTENCES {
        // The first sentence alone blew the budget.
        return with_fallback(&truncated, max_words);
    }
    truncated
}

/// `body` followed by the fallback clause, trimmed so the pair fits.
fn with_fallback(body: &str, max_words: usize) -> String {
    let budget = max_words.saturating_sub(word_count(DETAIL_FALLBACK));
    let body = body.trim();
    if body.is_empty() || budget == 0 {
        return DETAIL_FALLBACK.to_string();
    }
    let body = if word_count(body) > budget {
        truncate_words(body, budget)
    } else {
        terminate(body.to_string())
    };
    format!("{body} {DETAIL_FALLBACK}")
}

fn truncate_words(text: &str, max_words: usize) -> String {
    terminate(
        text.split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn terminate(mut text: String) -> String {
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

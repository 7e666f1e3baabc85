//! Text normalization and tokenization

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// Anything that is not a word character, whitespace, or basic punctuation
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^\w\s.,!?;:()\-]").unwrap();

    static ref NON_WORD_CHARS: Regex = Regex::new(r"[^\w\s]").unwrap();

    static ref SENTENCE_BREAK: Regex = Regex::new(r"[.!?]+").unwrap();

    /// Word runs, whitespace runs, or a single punctuation character
    static ref DIFF_TOKEN: Regex = Regex::new(r"\w+|\s+|[^\w\s]").unwrap();
}

/// Collapse whitespace, drop unsupported characters, trim
pub fn normalize_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    DISALLOWED_CHARS
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Join page fragments with single spaces and trim the result
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(|f| f.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Lowercase word tokens with punctuation stripped, keeping only words of
/// at least `min_len` characters
pub fn word_tokens(text: &str, min_len: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD_CHARS
        .replace_all(&lowered, " ")
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Split on runs of sentence terminators, dropping empty sentences
pub fn sentences(text: &str) -> Vec<String> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word-boundary tokens for diffing: every character of the input lands in
/// exactly one token
pub fn diff_tokens(text: &str) -> Vec<&str> {
    DIFF_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Number of whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

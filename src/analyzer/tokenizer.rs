//! Tokenization: CamelCase/snake_case-aware splitting, stop-word removal, stemming.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::stemmer::stem;

/// An uppercase letter followed by a lowercase/digit run, OR a run of
/// lowercase/digits, OR a run of uppercase letters. Segments CamelCase,
/// keeps digits, drops punctuation and whitespace.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][a-z0-9]*|[a-z0-9]+|[A-Z]+").expect("static regex is valid"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "did", "do", "does", "doing", "don", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor",
        "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "s", "same", "she", "should", "so", "some", "such",
        "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Tokenizes `text` into lowercased, stop-word-filtered, stemmed terms.
///
/// Tokens of length ≤2 pass the stop-word filter like any other token, but
/// are returned unstemmed (the stemmer's own identity rule for short words).
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|tok| !STOP_WORDS.contains(tok.as_str()))
        .map(|tok| stem(&tok))
        .collect()
}

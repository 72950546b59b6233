//! Edge n-gram fragments used to link a term to its prefixes in the postings
//! index, so a query term can match a longer indexed term (or vice versa)
//! through a shared prefix rather than requiring an exact stem match.

use ahash::AHashSet;

/// Fragments generated for `term`: the term itself, plus every prefix of
/// length in `[3, min(len, 10))`. Terms shorter than 3 runes only produce
/// themselves.
pub fn edge_ngrams(term: &str) -> AHashSet<String> {
    let chars: Vec<char> = term.chars().collect();
    let n = chars.len();

    let mut fragments = AHashSet::new();
    fragments.insert(term.to_string());

    if n < 3 {
        return fragments;
    }

    let upper = n.min(10);
    for i in 3..upper {
        fragments.insert(chars[..i].iter().collect());
    }
    fragments
}

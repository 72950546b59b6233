//! Bounded Levenshtein distance for the fuzzy-match scoring branch.

/// Distances above this are not interesting to the scorer; rows are
/// abandoned early once every cell in them exceeds it.
pub const MAX_DISTANCE: usize = 3;

/// Levenshtein edit distance between `a` and `b`, bounded by [`MAX_DISTANCE`].
///
/// Returns `(distance, true)` when the true distance is at most
/// [`MAX_DISTANCE`], or `(0, false)` once a full row exceeds it (the
/// remaining rows can only grow from there, so the scan stops).
pub fn bounded_distance(a: &str, b: &str) -> (usize, bool) {
    let (s1, s2) = if a.len() > b.len() { (b, a) } else { (a, b) };
    let s1 = s1.as_bytes();
    let s2 = s2.as_bytes();
    let n = s1.len();
    let m = s2.len();

    let mut prev_row: Vec<usize> = (0..=n).collect();
    let mut curr_row = vec![0usize; n + 1];

    for j in 1..=m {
        curr_row[0] = j;
        for i in 1..=n {
            let cost = if s1[i - 1] == s2[j - 1] { 0 } else { 1 };
            curr_row[i] = (prev_row[i] + 1)
                .min(curr_row[i - 1] + 1)
                .min(prev_row[i - 1] + cost);
        }

        if curr_row.iter().all(|&v| v > MAX_DISTANCE) {
            return (0, false);
        }
        prev_row.copy_from_slice(&curr_row);
    }

    (prev_row[n], true)
}

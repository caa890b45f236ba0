// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! String similarity for "did you mean" suggestions.

/// Computes the Levenshtein edit distance between two strings.
///
/// Operates on characters, not bytes, so multibyte names compare
/// sensibly. Uses the two-row dynamic programming formulation.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1) // deletion
                .min(current[j] + 1); // insertion
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Picks the closest candidate to `name` within edit distance 3.
///
/// Ties resolve to the earliest candidate, which callers arrange to be
/// declaration order.
#[must_use]
pub fn did_you_mean<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    const MAX_DISTANCE: usize = 3;
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let distance = edit_distance(name, candidate);
        if distance <= MAX_DISTANCE && best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("Start", "Strat"), 2);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(
            edit_distance("Cellar", "Celler"),
            edit_distance("Celler", "Cellar")
        );
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    #[test]
    fn suggests_near_misses_only() {
        let candidates = ["Start", "Cellar", "End"];
        assert_eq!(did_you_mean("Strat", candidates), Some("Start"));
        assert_eq!(did_you_mean("Celler", candidates), Some("Cellar"));
        assert_eq!(did_you_mean("Basement", candidates), None);
    }

    #[test]
    fn ties_resolve_to_the_first_candidate() {
        // Both are distance 1 from "bat".
        assert_eq!(did_you_mean("bat", ["bad", "bar"]), Some("bad"));
    }

    #[test]
    fn threshold_is_a_flat_three() {
        // "kitten" to "sitting" is distance 3, right at the limit.
        assert_eq!(did_you_mean("kitten", ["sitting"]), Some("sitting"));
        // One past the limit is no longer suggested.
        assert_eq!(did_you_mean("abcd", ["wxyz"]), None);
    }
}

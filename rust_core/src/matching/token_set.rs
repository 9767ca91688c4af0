//! Token-set similarity scorer.
//!
//! Order- and duplicate-insensitive ratio in `[0, 100]`, built on the
//! Indel similarity `2 * LCS / (len_a + len_b)`. Keys are tokenized once
//! into a [`TokenSet`] and then scored in batches with [`score_matrix`].

use rayon::prelude::*;
use std::cmp::Ordering;

/// Sorted, deduplicated tokens of one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    /// Whitespace split, surrounding punctuation trimmed, empty tokens dropped
    pub fn new(text: &str) -> Self {
        let mut tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        tokens.sort();
        tokens.dedup();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Length of the longest common subsequence, in chars
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Indel-normalized similarity scaled to 0-100
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn join(parts: &[&str]) -> String {
    parts.join(" ")
}

fn concat(sect: &str, diff: &str) -> String {
    match (sect.is_empty(), diff.is_empty()) {
        (true, _) => diff.to_string(),
        (_, true) => sect.to_string(),
        _ => format!("{sect} {diff}"),
    }
}

/// Token-set ratio of two pre-tokenized keys
pub fn token_set_ratio(a: &TokenSet, b: &TokenSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut sect: Vec<&str> = Vec::new();
    let mut diff_a: Vec<&str> = Vec::new();
    let mut diff_b: Vec<&str> = Vec::new();

    // Both sides are sorted; walk them together
    let (mut i, mut j) = (0, 0);
    while i < a.tokens.len() && j < b.tokens.len() {
        match a.tokens[i].cmp(&b.tokens[j]) {
            Ordering::Equal => {
                sect.push(&a.tokens[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                diff_a.push(&a.tokens[i]);
                i += 1;
            }
            Ordering::Greater => {
                diff_b.push(&b.tokens[j]);
                j += 1;
            }
        }
    }
    diff_a.extend(a.tokens[i..].iter().map(|s| s.as_str()));
    diff_b.extend(b.tokens[j..].iter().map(|s| s.as_str()));

    // One key's tokens are a subset of the other's
    if !sect.is_empty() && (diff_a.is_empty() || diff_b.is_empty()) {
        return 100.0;
    }

    let diff_a = join(&diff_a);
    let diff_b = join(&diff_b);
    if sect.is_empty() {
        return ratio(&diff_a, &diff_b);
    }

    let sect = join(&sect);
    let combined_a = concat(&sect, &diff_a);
    let combined_b = concat(&sect, &diff_b);

    ratio(&sect, &combined_a)
        .max(ratio(&sect, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Convenience wrapper for one-off comparisons
pub fn score(a: &str, b: &str) -> f64 {
    token_set_ratio(&TokenSet::new(a), &TokenSet::new(b))
}

/// Scores for every `(query, choice)` pair; `result[q][c]`.
/// Query rows are computed in parallel.
pub fn score_matrix(queries: &[TokenSet], choices: &[TokenSet]) -> Vec<Vec<f64>> {
    queries
        .par_iter()
        .map(|query| {
            choices
                .iter()
                .map(|choice| token_set_ratio(query, choice))
                .collect()
        })
        .collect()
}

/// Index and score of the best entry; the first index wins ties
pub fn argmax(scores: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &s) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if s <= current => {}
            _ => best = Some((idx, s)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_trims_punctuation_and_dedups() {
        let set = TokenSet::new("X - Y  (Y) vs");
        assert_eq!(set.tokens(), &["vs", "x", "y"]);
        assert!(TokenSet::new(" - ").is_empty());
    }

    #[test]
    fn test_order_and_duplicates_ignored() {
        assert_eq!(score("partizan vs zvezda", "zvezda partizan partizan vs"), 100.0);
    }

    #[test]
    fn test_subset_scores_full() {
        assert_eq!(
            score(
                "team x vs team y 2025-03-01 20:45:00",
                "x - y vs  2025-03-01 20:45:00"
            ),
            100.0
        );
    }

    #[test]
    fn test_truncated_name_scores_high() {
        let s = score(
            "manchester united vs chelsea 2025-03-01 20:45:00",
            "manchester utd vs chelsea 2025-03-01 20:45:00",
        );
        assert!(s >= 80.0, "score was {s}");
        assert!(s < 100.0);
    }

    #[test]
    fn test_different_fixtures_score_low() {
        let s = score(
            "partizan vs vojvodina 2025-03-01 18:00:00",
            "crvena zvezda vs cukaricki 2025-03-01 18:00:00",
        );
        assert!(s < 80.0, "score was {s}");
    }

    #[test]
    fn test_ratio_is_indel_normalized() {
        assert_eq!(ratio("abcd", "abcd"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        // LCS("united", "utd") = 3, 2 * 3 / 9
        assert!((ratio("united", "utd") - 66.666).abs() < 0.01);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_abbreviated_team_name_passes_default_threshold() {
        let s = score(
            "man utd vs chelsea 2025-03-01 18:30:00",
            "manchester united vs chelsea 2025-03-01 18:30:00",
        );
        assert!(s >= 80.0, "score was {s}");
        assert!((s - 88.37).abs() < 0.01);
    }

    #[test]
    fn test_disjoint_and_empty() {
        assert_eq!(score("", "abc"), 0.0);
        assert!(score("abc", "xyz") < 1.0);
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = "arsenal vs spurs 2025-03-02 17:30:00";
        let b = "arsenal london vs tottenham spurs 2025-03-02 17:30:00";
        assert_eq!(score(a, b), score(b, a));
    }

    #[test]
    fn test_score_matrix_shape() {
        let queries = vec![TokenSet::new("a b"), TokenSet::new("c d"), TokenSet::new("e")];
        let choices = vec![TokenSet::new("b a"), TokenSet::new("d c")];
        let m = score_matrix(&queries, &choices);
        assert_eq!(m.len(), 3);
        assert!(m.iter().all(|row| row.len() == 2));
        assert_eq!(m[0][0], 100.0);
        assert_eq!(m[1][1], 100.0);
    }

    #[test]
    fn test_argmax_first_index_wins_ties() {
        assert_eq!(argmax(&[50.0, 90.0, 90.0, 10.0]), Some((1, 90.0)));
        assert_eq!(argmax(&[]), None);
    }
}

//! Bounded string-similarity scorers used by the store resolver.
//!
//! Every scorer returns a value in `0.0..=100.0` and is a pure function of its
//! two inputs. Inputs are first reduced to [`scoring_form`], so case and
//! punctuation never affect a score.

use crate::error::AmsError;
use crate::normalize::scoring_form;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strsim::{jaro_winkler, normalized_levenshtein};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scorer {
    /// Best of plain, token-sort and token-set ratios, switching to
    /// partial-window ratios when one string is much longer than the other.
    #[default]
    Weighted,
    JaroWinkler,
    Levenshtein,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let a = scoring_form(a);
        let b = scoring_form(b);
        let raw = match self {
            Scorer::Weighted => weighted_ratio(&a, &b),
            Scorer::JaroWinkler => {
                if a.is_empty() || b.is_empty() {
                    0.0
                } else {
                    jaro_winkler(&a, &b) * 100.0
                }
            }
            Scorer::Levenshtein => {
                if a.is_empty() || b.is_empty() {
                    0.0
                } else {
                    ratio(&a, &b)
                }
            }
        };
        raw.clamp(0.0, 100.0)
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scorer::Weighted => "weighted",
            Scorer::JaroWinkler => "jaro-winkler",
            Scorer::Levenshtein => "levenshtein",
        };
        f.write_str(name)
    }
}

impl FromStr for Scorer {
    type Err = AmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weighted" | "wratio" => Ok(Scorer::Weighted),
            "jaro-winkler" | "jaro_winkler" | "jarowinkler" => Ok(Scorer::JaroWinkler),
            "levenshtein" => Ok(Scorer::Levenshtein),
            other => Err(AmsError::Config(format!("unknown scorer '{}'", other))),
        }
    }
}

/// Normalized edit similarity on already-processed strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

/// Best [`ratio`] of the shorter string against every equal-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if short_len == long_chars.len() {
        return ratio(short, long);
    }

    let mut best = 0.0_f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let score = ratio(short, &candidate);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    s.split_whitespace().sorted().join(" ")
}

fn token_sort_ratio(a: &str, b: &str, partial: bool) -> f64 {
    let (a, b) = (sorted_tokens(a), sorted_tokens(b));
    if partial {
        partial_ratio(&a, &b)
    } else {
        ratio(&a, &b)
    }
}

fn token_set_ratio(a: &str, b: &str, partial: bool) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).join(" ");
    let only_a = tokens_a.difference(&tokens_b).join(" ");
    let only_b = tokens_b.difference(&tokens_a).join(" ");

    let combined_a = format!("{} {}", intersection, only_a).trim().to_string();
    let combined_b = format!("{} {}", intersection, only_b).trim().to_string();

    let scorer = |x: &str, y: &str| {
        if partial {
            partial_ratio(x, y)
        } else if x.is_empty() || y.is_empty() {
            0.0
        } else {
            ratio(x, y)
        }
    };

    scorer(&intersection, &combined_a)
        .max(scorer(&intersection, &combined_b))
        .max(scorer(&combined_a, &combined_b))
}

/// Weighted combination of the ratios above.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let base = ratio(a, b);
    if len_ratio < 1.5 {
        let token_sort = token_sort_ratio(a, b, false) * 0.95;
        let token_set = token_set_ratio(a, b, false) * 0.95;
        return base.max(token_sort).max(token_set);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = partial_ratio(a, b) * partial_scale;
    let partial_sort = token_sort_ratio(a, b, true) * 0.95 * partial_scale;
    let partial_set = token_set_ratio(a, b, true) * 0.95 * partial_scale;
    base.max(partial).max(partial_sort).max(partial_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_strings_score_100() {
        for scorer in [Scorer::Weighted, Scorer::JaroWinkler, Scorer::Levenshtein] {
            assert_eq!(scorer.score("North Store", "north store"), 100.0);
        }
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(Scorer::Weighted.score("", "North Store"), 0.0);
        assert_eq!(Scorer::JaroWinkler.score("North", "  "), 0.0);
    }

    #[test]
    fn test_token_order_is_forgiven() {
        let reordered = Scorer::Weighted.score("Store North", "North Store");
        let unrelated = Scorer::Weighted.score("Harbour Plaza", "North Store");
        assert!(reordered >= 90.0, "reordered scored {}", reordered);
        assert!(reordered > unrelated);
    }

    #[test]
    fn test_partial_match_on_longer_name() {
        let score = Scorer::Weighted.score("Bondi", "Shaver Shop Bondi Junction");
        let other = Scorer::Weighted.score("Bondi", "Shaver Shop Chadstone");
        assert!(score > other, "{} vs {}", score, other);
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("bondi", "shaver shop bondi"), 100.0);
    }

    #[test]
    fn test_scorer_from_str() {
        assert_eq!("weighted".parse::<Scorer>().unwrap(), Scorer::Weighted);
        assert_eq!("Jaro-Winkler".parse::<Scorer>().unwrap(), Scorer::JaroWinkler);
        assert!("soundex".parse::<Scorer>().is_err());
        assert_eq!(Scorer::Levenshtein.to_string(), "levenshtein");
    }

    proptest! {
        #[test]
        fn scores_are_bounded_and_deterministic(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
            for scorer in [Scorer::Weighted, Scorer::JaroWinkler, Scorer::Levenshtein] {
                let first = scorer.score(&a, &b);
                prop_assert!((0.0..=100.0).contains(&first));
                prop_assert_eq!(first, scorer.score(&a, &b));
            }
        }
    }
}

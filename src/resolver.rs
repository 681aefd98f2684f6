use crate::model::{OrderRow, ResolvedOrderRow, StoreDirectoryEntry};
use crate::normalize::{normalize_optional, normalize_store_name};
use crate::similarity::Scorer;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Tuning knobs for store resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolverOptions {
    pub scorer: Scorer,
    /// Best matches scoring below this are rejected. `None` accepts the best
    /// candidate no matter how poor it is.
    pub min_score: Option<f64>,
}

/// Outcome of resolving one raw location.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched { store: String, score: f64 },
    BelowThreshold { best: String, score: f64 },
    NoLocation,
    NoCandidates,
}

impl Resolution {
    pub fn store(&self) -> Option<&str> {
        match self {
            Resolution::Matched { store, .. } => Some(store),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Resolution::Matched { score, .. } | Resolution::BelowThreshold { score, .. } => Some(*score),
            _ => None,
        }
    }
}

/// Fuzzy resolver from free-text locations to canonical store names.
///
/// Candidates keep the order in which names first appear in the directory.
/// When two candidates tie on score the earlier one wins.
#[derive(Debug, Clone)]
pub struct StoreResolver {
    candidates: Vec<String>,
    options: ResolverOptions,
}

impl StoreResolver {
    pub fn new(candidates: impl IntoIterator<Item = String>, options: ResolverOptions) -> Self {
        let mut seen = HashSet::new();
        let candidates = candidates
            .into_iter()
            .map(|name| normalize_store_name(&name))
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();
        Self { candidates, options }
    }

    pub fn from_directory(directory: &[StoreDirectoryEntry], options: ResolverOptions) -> Self {
        Self::new(directory.iter().map(|e| e.store_name.clone()), options)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Highest-scoring candidate for an already normalized location, ignoring
    /// any threshold. `None` only when there are no candidates.
    fn best_candidate(&self, location: &str) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for candidate in &self.candidates {
            let score = self.options.scorer.score(location, candidate);
            // Strictly greater keeps the first of any tied candidates.
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate.as_str(), score));
            }
        }
        best
    }

    /// Resolve one raw location.
    pub fn resolve(&self, raw_location: Option<&str>) -> Resolution {
        let Some(location) = normalize_optional(raw_location) else {
            return Resolution::NoLocation;
        };
        self.resolve_normalized(&location)
    }

    fn resolve_normalized(&self, location: &str) -> Resolution {
        let Some((best, score)) = self.best_candidate(location) else {
            return Resolution::NoCandidates;
        };

        match self.options.min_score {
            Some(min) if score < min => Resolution::BelowThreshold {
                best: best.to_string(),
                score,
            },
            _ => Resolution::Matched {
                store: best.to_string(),
                score,
            },
        }
    }

    /// Resolve every row, preserving order. Each distinct normalized location
    /// is scored once and the scoring is spread across threads.
    pub fn resolve_rows(&self, rows: Vec<OrderRow>) -> Vec<(ResolvedOrderRow, Resolution)> {
        let normalized: Vec<Option<String>> = rows
            .iter()
            .map(|row| normalize_optional(row.location.as_deref()))
            .collect();

        let distinct: Vec<&String> = {
            let mut seen = HashSet::new();
            normalized
                .iter()
                .flatten()
                .filter(|loc| seen.insert(loc.as_str()))
                .collect()
        };

        let resolved: HashMap<&str, Resolution> = distinct
            .par_iter()
            .map(|loc| (loc.as_str(), self.resolve_normalized(loc)))
            .collect();

        debug!(
            "Resolved {} distinct locations against {} candidate stores",
            resolved.len(),
            self.candidates.len()
        );

        rows.into_iter()
            .zip(normalized.iter())
            .map(|(order, location)| {
                let resolution = match location {
                    Some(loc) => resolved
                        .get(loc.as_str())
                        .cloned()
                        .unwrap_or(Resolution::NoCandidates),
                    None => Resolution::NoLocation,
                };
                let row = ResolvedOrderRow {
                    order,
                    resolved_store: resolution.store().map(str::to_string),
                    match_score: resolution.score(),
                };
                (row, resolution)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver(names: &[&str]) -> StoreResolver {
        StoreResolver::new(names.iter().map(|s| s.to_string()), ResolverOptions::default())
    }

    #[test]
    fn test_resolves_padded_lowercase_location() {
        let r = resolver(&["North Store", "South Store", "Harbour Plaza"]);
        assert_eq!(r.resolve(Some(" north store ")).store(), Some("North Store"));
    }

    #[test]
    fn test_null_and_empty_locations_resolve_to_none() {
        let r = resolver(&["North Store"]);
        assert_eq!(r.resolve(None), Resolution::NoLocation);
        assert_eq!(r.resolve(Some("   ")), Resolution::NoLocation);
    }

    #[test]
    fn test_empty_directory_resolves_to_none() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(Some("North Store")), Resolution::NoCandidates);
    }

    #[test]
    fn test_poor_match_still_accepted_without_threshold() {
        let r = resolver(&["Harbour Plaza"]);
        assert_eq!(r.resolve(Some("zzzz")).store(), Some("Harbour Plaza"));
    }

    #[test]
    fn test_min_score_rejects_poor_match() {
        let r = StoreResolver::new(
            vec!["Harbour Plaza".to_string()],
            ResolverOptions {
                min_score: Some(80.0),
                ..Default::default()
            },
        );
        match r.resolve(Some("zzzz")) {
            Resolution::BelowThreshold { best, score } => {
                assert_eq!(best, "Harbour Plaza");
                assert!(score < 80.0);
            }
            other => panic!("expected BelowThreshold, got {:?}", other),
        }
    }

    #[test]
    fn test_tie_goes_to_first_candidate() {
        // Both candidates normalize to scoring forms equally distant from the input.
        let r = resolver(&["Store B", "Store A"]);
        let res = r.resolve(Some("Store C"));
        assert_eq!(res.store(), Some("Store B"));

        let r = resolver(&["Store A", "Store B"]);
        assert_eq!(r.resolve(Some("Store C")).store(), Some("Store A"));
    }

    #[test]
    fn test_candidates_are_normalized_and_deduplicated() {
        let r = resolver(&[" north store", "North Store", "SOUTH store", ""]);
        assert_eq!(r.candidates(), &["North Store".to_string(), "South Store".to_string()]);
    }

    #[test]
    fn test_resolve_rows_preserves_order() {
        let r = resolver(&["North Store", "South Store"]);
        let rows = vec![
            OrderRow { location: Some("south".into()), ..Default::default() },
            OrderRow { location: None, ..Default::default() },
            OrderRow { location: Some("NORTH STORE".into()), ..Default::default() },
            OrderRow { location: Some("south".into()), ..Default::default() },
        ];
        let resolved: Vec<Option<String>> = r
            .resolve_rows(rows)
            .into_iter()
            .map(|(row, _)| row.resolved_store)
            .collect();
        assert_eq!(
            resolved,
            vec![
                Some("South Store".to_string()),
                None,
                Some("North Store".to_string()),
                Some("South Store".to_string()),
            ]
        );
    }

    proptest! {
        #[test]
        fn winner_scores_at_least_every_other_candidate(
            location in "[a-zA-Z ]{1,20}",
            names in proptest::collection::vec("[a-zA-Z]{1,10}( [a-zA-Z]{1,10})?", 1..6),
        ) {
            prop_assume!(!location.trim().is_empty());
            let r = StoreResolver::new(names, ResolverOptions::default());
            let res = r.resolve(Some(location.as_str()));
            let winner = res.store().expect("non-empty location and candidates");
            let normalized = normalize_store_name(&location);
            let winning_score = Scorer::Weighted.score(&normalized, winner);
            for candidate in r.candidates() {
                prop_assert!(winning_score >= Scorer::Weighted.score(&normalized, candidate));
            }
        }
    }
}

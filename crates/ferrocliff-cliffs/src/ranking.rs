//! Ranking and filtering of matched pairs for display.

use std::cmp::Ordering;

use ferrocliff_common::{AnalysisConfig, SortKey};

use crate::models::MatchedPair;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankOptions {
    pub sort_key: SortKey,
    /// Drop pairs where either compound has an activity of exactly zero.
    pub hide_zero_activity: bool,
}

impl From<&AnalysisConfig> for RankOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            sort_key: config.sort_key,
            hide_zero_activity: config.hide_zero_activity,
        }
    }
}

/// Descending on the chosen key; pairs whose key is undefined go last.
fn compare(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter and sort a copy of `pairs`. The sort is stable, so ties keep scan
/// order. The input is left untouched.
pub fn rank_pairs(pairs: &[MatchedPair], options: &RankOptions) -> Vec<MatchedPair> {
    let mut ranked: Vec<MatchedPair> = pairs
        .iter()
        .filter(|p| !(options.hide_zero_activity && p.has_zero_activity()))
        .cloned()
        .collect();
    let key = options.sort_key;
    ranked.sort_by(|a, b| compare(a.sort_value(key), b.sort_value(key)));
    ranked
}

/// First `limit` entries of an already ranked list.
pub fn top(ranked: &[MatchedPair], limit: usize) -> &[MatchedPair] {
    &ranked[..limit.min(ranked.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Compound;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn compound(id: usize, activity: f64) -> Arc<Compound> {
        Arc::new(Compound {
            id,
            structure: format!("C{id}"),
            activity,
            external_id: format!("compound_{id}"),
            observations: 1,
        })
    }

    fn pair(a: (usize, f64), b: (usize, f64), sim: f64) -> MatchedPair {
        MatchedPair::score(compound(a.0, a.1), compound(b.0, b.1), sim).unwrap()
    }

    fn keys(pairs: &[MatchedPair]) -> Vec<(usize, usize)> {
        pairs.iter().map(MatchedPair::key).collect()
    }

    fn sample() -> Vec<MatchedPair> {
        vec![
            pair((1, 5.0), (2, 6.0), 0.95), // delta 1, fold 1.2
            pair((3, 0.0), (4, 8.0), 0.75), // delta 8, fold none
            pair((5, 2.0), (6, 8.0), 0.80), // delta 6, fold 4
            pair((7, 4.0), (8, 5.0), 0.90), // delta 1, fold 1.25
        ]
    }

    #[test]
    fn test_sorts_descending_by_score() {
        let ranked = rank_pairs(&sample(), &RankOptions::default());
        let scores: Vec<f64> = ranked.iter().map(|p| p.cliff_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(keys(&ranked), vec![(3, 4), (5, 6), (1, 2), (7, 8)]);
    }

    #[test]
    fn test_undefined_fold_change_sorts_last() {
        let options = RankOptions { sort_key: SortKey::FoldChange, hide_zero_activity: false };
        let ranked = rank_pairs(&sample(), &options);
        assert_eq!(keys(&ranked), vec![(5, 6), (7, 8), (1, 2), (3, 4)]);
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let input = vec![
            pair((1, 1.0), (2, 3.0), 0.8),
            pair((3, 4.0), (4, 6.0), 0.9),
            pair((5, 7.0), (6, 9.0), 0.7),
        ];
        let options = RankOptions { sort_key: SortKey::ActivityDelta, hide_zero_activity: false };
        assert_eq!(keys(&rank_pairs(&input, &options)), vec![(1, 2), (3, 4), (5, 6)]);
    }

    #[test]
    fn test_hide_zero_activity_is_a_subset() {
        let all = rank_pairs(&sample(), &RankOptions::default());
        let options = RankOptions { hide_zero_activity: true, ..RankOptions::default() };
        let hidden = rank_pairs(&sample(), &options);
        assert_eq!(hidden.len(), 3);
        assert!(hidden.iter().all(|p| !p.has_zero_activity()));
        assert!(hidden.iter().all(|h| all.iter().any(|p| p.key() == h.key())));
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let options = RankOptions { sort_key: SortKey::Similarity, hide_zero_activity: true };
        let once = rank_pairs(&sample(), &options);
        let twice = rank_pairs(&once, &options);
        assert_eq!(keys(&once), keys(&twice));
    }

    #[test]
    fn test_top_truncates() {
        let ranked = rank_pairs(&sample(), &RankOptions::default());
        assert_eq!(top(&ranked, 2).len(), 2);
        assert_eq!(top(&ranked, 50).len(), 4);
    }
}

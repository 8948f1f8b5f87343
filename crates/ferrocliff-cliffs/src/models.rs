//! Compounds and matched pairs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ferrocliff_common::SortKey;

/// One valid input row projected onto structure / activity / id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundRecord {
    pub structure: String,
    pub activity: f64,
    pub external_id: Option<String>,
    pub row_index: usize,
}

/// A unique structure after deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    /// Sequential id (1-based) in first-appearance order, stable for the session.
    pub id: usize,
    /// Raw structure string, trimmed. Not chemically canonicalised.
    pub structure: String,
    /// Mean of every activity observed for this exact structure string.
    pub activity: f64,
    /// Provided label, or `compound_<id>`.
    pub external_id: String,
    /// Number of rows merged into this compound.
    pub observations: usize,
}

/// Two compounds close enough in structure to be compared, with the cliff
/// metrics derived from their activities.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedPair {
    pub a: Arc<Compound>,
    pub b: Arc<Compound>,
    pub similarity: f64,
    pub activity_delta: f64,
    /// `None` unless both activities are positive and distinct.
    pub fold_change: Option<f64>,
    pub cliff_score: f64,
}

/// `similarity³ × activity_delta`.
pub fn cliff_score(similarity: f64, activity_delta: f64) -> f64 {
    similarity.powi(3) * activity_delta
}

/// Ratio of the larger to the smaller activity. Only defined for two
/// distinct positive activities; zero is never used as a divisor.
pub fn fold_change(x: f64, y: f64) -> Option<f64> {
    if x <= 0.0 || y <= 0.0 || x == y {
        return None;
    }
    let ratio = x.max(y) / x.min(y);
    ratio.is_finite().then_some(ratio)
}

impl MatchedPair {
    /// Build a pair from a similarity that already passed the threshold.
    /// Returns `None` when the activities are identical: a cliff needs a
    /// measurable difference.
    pub fn score(a: Arc<Compound>, b: Arc<Compound>, similarity: f64) -> Option<Self> {
        let (a, b) = if a.id <= b.id { (a, b) } else { (b, a) };
        let activity_delta = (a.activity - b.activity).abs();
        if activity_delta == 0.0 {
            return None;
        }
        Some(Self {
            fold_change: fold_change(a.activity, b.activity),
            cliff_score: cliff_score(similarity, activity_delta),
            a,
            b,
            similarity,
            activity_delta,
        })
    }

    /// Identity of the pair, independent of scan order.
    pub fn key(&self) -> (usize, usize) {
        (self.a.id, self.b.id)
    }

    pub fn has_zero_activity(&self) -> bool {
        self.a.activity == 0.0 || self.b.activity == 0.0
    }

    pub fn sort_value(&self, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Score => Some(self.cliff_score),
            SortKey::ActivityDelta => Some(self.activity_delta),
            SortKey::FoldChange => self.fold_change,
            SortKey::Similarity => Some(self.similarity),
        }
    }
}

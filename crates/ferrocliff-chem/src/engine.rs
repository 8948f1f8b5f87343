//! The chemistry engine contract.

use ferrocliff_common::Result;
use serde::{Deserialize, Serialize};

/// Atoms and bonds of a target structure covered by a query pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub atoms: Vec<usize>,
    pub bonds: Vec<usize>,
}

impl PatternMatch {
    /// A match that covers no bond is not a meaningful hit
    /// (e.g. a single-atom pattern).
    pub fn engages_bond(&self) -> bool {
        !self.bonds.is_empty()
    }
}

/// Rendering options for a depiction.
#[derive(Debug, Clone, PartialEq)]
pub struct DepictOptions {
    pub width: u32,
    pub height: u32,
    /// Atoms/bonds to emphasise.
    pub highlight: Option<PatternMatch>,
}

impl DepictOptions {
    pub fn plain(width: u32, height: u32) -> Self {
        Self { width, height, highlight: None }
    }

    pub fn highlighted(width: u32, height: u32, highlight: PatternMatch) -> Self {
        Self { width, height, highlight: Some(highlight) }
    }
}

impl Default for DepictOptions {
    fn default() -> Self {
        Self::plain(120, 80)
    }
}

/// Renderable image data (SVG markup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Depiction(pub String);

impl Depiction {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A chemistry toolkit able to parse structures, compare them, depict them
/// and match query patterns against them.
///
/// Handles are owned values: dropping a `Molecule` or `Pattern` releases
/// whatever the engine holds for it, so every handle is released on every
/// path, errors included.
pub trait ChemistryEngine: Send + Sync {
    type Molecule: Send + Sync;
    type Pattern: Send + Sync;

    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Parse a structure notation. `None` means the structure is invalid.
    fn parse(&self, notation: &str) -> Option<Self::Molecule>;

    /// Parse a query pattern. `None` means the pattern is invalid.
    fn parse_pattern(&self, pattern: &str) -> Option<Self::Pattern>;

    /// Normalised fingerprint similarity in [0, 1].
    /// Must be deterministic and symmetric.
    fn similarity(&self, a: &Self::Molecule, b: &Self::Molecule) -> Result<f64>;

    fn depict(&self, mol: &Self::Molecule, options: &DepictOptions) -> Result<Depiction>;

    /// `Ok(None)` when the pattern does not occur in the molecule.
    fn match_pattern(&self, mol: &Self::Molecule, pattern: &Self::Pattern) -> Result<Option<PatternMatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_atom_match_does_not_engage_bond() {
        let m = PatternMatch { atoms: vec![3], bonds: vec![] };
        assert!(!m.engages_bond());
        let m = PatternMatch { atoms: vec![3, 4], bonds: vec![2] };
        assert!(m.engages_bond());
    }
}

//! Similarity Oracle: the context object every core component talks to.
//!
//! Wraps a [`ChemistryEngine`] so that per-item failures (unparseable
//! structures, failed fingerprints, depictions or matches) become a logged
//! "no score / no match" sentinel instead of an error that aborts a batch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ferrocliff_common::{CliffError, DepictionConfig, Result};
use tracing::{debug, warn};

use crate::engine::{ChemistryEngine, DepictOptions, Depiction, PatternMatch};

pub struct SimilarityOracle<E: ChemistryEngine> {
    engine: Arc<E>,
    depiction: DepictionConfig,
    /// Plain depictions keyed by structure string. Failures are cached too:
    /// a failed depiction is a permanent skip for that structure.
    depictions: Mutex<HashMap<String, Option<Depiction>>>,
}

impl<E: ChemistryEngine> SimilarityOracle<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            depiction: DepictionConfig::default(),
            depictions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_depiction(mut self, depiction: DepictionConfig) -> Self {
        self.depiction = depiction;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Parse a structure, logging invalid input.
    pub fn parse(&self, notation: &str) -> Option<E::Molecule> {
        let mol = self.engine.parse(notation);
        if mol.is_none() {
            warn!(engine = self.engine.name(), structure = %notation, "Invalid structure, skipping");
        }
        mol
    }

    /// Similarity between two parsed molecules; `None` on engine failure or a
    /// non-finite score.
    pub fn compare(&self, a: &E::Molecule, b: &E::Molecule) -> Option<f64> {
        match self.engine.similarity(a, b) {
            Ok(s) if s.is_finite() => Some(s.clamp(0.0, 1.0)),
            Ok(s) => {
                warn!(engine = self.engine.name(), score = s, "Non-finite similarity, skipping pair");
                None
            }
            Err(e) => {
                warn!(engine = self.engine.name(), error = %e, "Similarity failed, skipping pair");
                None
            }
        }
    }

    /// Similarity between two structure notations.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let mol_a = self.parse(a)?;
        let mol_b = self.parse(b)?;
        self.compare(&mol_a, &mol_b)
    }

    /// Parse a user query pattern. An invalid pattern is a query error, not a
    /// per-item skip.
    pub fn parse_query(&self, pattern: &str) -> Result<E::Pattern> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(CliffError::InvalidQuery("empty pattern".to_string()));
        }
        self.engine
            .parse_pattern(trimmed)
            .ok_or_else(|| CliffError::InvalidQuery(trimmed.to_string()))
    }

    /// Match a query pattern against a structure.
    ///
    /// `Ok(None)` covers both "pattern absent" and "matched zero bonds".
    /// `Err` means the structure could not be matched at all; callers treat it
    /// as a skip.
    pub fn match_structure(&self, notation: &str, pattern: &E::Pattern) -> Result<Option<PatternMatch>> {
        let mol = self
            .engine
            .parse(notation)
            .ok_or_else(|| CliffError::Chemistry(format!("unparseable structure {notation}")))?;
        let found = self.engine.match_pattern(&mol, pattern)?;
        Ok(found.filter(PatternMatch::engages_bond))
    }

    /// Plain depiction, computed once per structure string.
    pub fn depiction(&self, notation: &str) -> Option<Depiction> {
        if let Some(cached) = self.lock_cache().get(notation) {
            return cached.clone();
        }

        let options = DepictOptions::plain(self.depiction.width, self.depiction.height);
        let rendered = self.render(notation, &options);
        self.lock_cache().insert(notation.to_string(), rendered.clone());
        rendered
    }

    /// Depiction with the matched atoms and bonds emphasised. Not cached:
    /// it depends on the query.
    pub fn highlighted_depiction(&self, notation: &str, found: &PatternMatch) -> Option<Depiction> {
        let options = DepictOptions::highlighted(self.depiction.width, self.depiction.height, found.clone());
        self.render(notation, &options)
    }

    pub fn cached_depictions(&self) -> usize {
        self.lock_cache().len()
    }

    fn render(&self, notation: &str, options: &DepictOptions) -> Option<Depiction> {
        let mol = self.parse(notation)?;
        match self.engine.depict(&mol, options) {
            Ok(d) => {
                debug!(structure = %notation, highlighted = options.highlight.is_some(), "Depiction rendered");
                Some(d)
            }
            Err(e) => {
                warn!(structure = %notation, error = %e, "Failed to generate depiction");
                None
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<Depiction>>> {
        self.depictions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Length-ratio engine: enough to exercise the oracle's error handling.
    #[derive(Default)]
    struct LengthEngine {
        depict_calls: AtomicUsize,
    }

    impl ChemistryEngine for LengthEngine {
        type Molecule = String;
        type Pattern = String;

        fn name(&self) -> &str {
            "length"
        }

        fn parse(&self, notation: &str) -> Option<String> {
            (!notation.contains('!')).then(|| notation.to_string())
        }

        fn parse_pattern(&self, pattern: &str) -> Option<String> {
            (!pattern.contains('?')).then(|| pattern.to_string())
        }

        fn similarity(&self, a: &String, b: &String) -> Result<f64> {
            if a.contains('#') || b.contains('#') {
                return Err(CliffError::Chemistry("fingerprint failed".to_string()));
            }
            if a.contains('~') || b.contains('~') {
                return Ok(f64::NAN);
            }
            let (x, y) = (a.len() as f64, b.len() as f64);
            Ok(x.min(y) / x.max(y))
        }

        fn depict(&self, mol: &String, options: &DepictOptions) -> Result<Depiction> {
            self.depict_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Depiction(format!("<svg data-hl=\"{}\">{mol}</svg>", options.highlight.is_some())))
        }

        fn match_pattern(&self, mol: &String, pattern: &String) -> Result<Option<PatternMatch>> {
            Ok(mol.find(pattern.as_str()).map(|start| PatternMatch {
                atoms: (start..start + pattern.len()).collect(),
                bonds: (start..start + pattern.len() - 1).collect(),
            }))
        }
    }

    fn oracle() -> SimilarityOracle<LengthEngine> {
        SimilarityOracle::new(Arc::new(LengthEngine::default()))
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let o = oracle();
        assert_eq!(o.similarity("CCO", "CCCCCC"), o.similarity("CCCCCC", "CCO"));
        assert_eq!(o.similarity("CCO", "CCCCCC"), Some(0.5));
    }

    #[test]
    fn test_engine_failures_become_none() {
        let o = oracle();
        assert_eq!(o.similarity("CC!", "CCO"), None);
        assert_eq!(o.similarity("CC#", "CCO"), None);
        assert_eq!(o.similarity("CC~", "CCO"), None);
    }

    #[test]
    fn test_depiction_memoized_per_structure() {
        let o = oracle();
        let first = o.depiction("CCO").unwrap();
        let second = o.depiction("CCO").unwrap();
        assert_eq!(first, second);
        assert_eq!(o.engine().depict_calls.load(Ordering::SeqCst), 1);
        assert_eq!(o.cached_depictions(), 1);
    }

    #[test]
    fn test_highlighted_depiction_not_cached() {
        let o = oracle();
        let m = PatternMatch { atoms: vec![0, 1], bonds: vec![0] };
        let d = o.highlighted_depiction("CCO", &m).unwrap();
        assert!(d.as_str().contains("data-hl=\"true\""));
        assert_eq!(o.cached_depictions(), 0);
    }

    #[test]
    fn test_invalid_query_is_error() {
        let o = oracle();
        assert!(matches!(o.parse_query("C?C"), Err(CliffError::InvalidQuery(_))));
        assert!(matches!(o.parse_query("   "), Err(CliffError::InvalidQuery(_))));
    }

    #[test]
    fn test_zero_bond_match_is_no_match() {
        let o = oracle();
        let single = o.parse_query("O").unwrap();
        assert_eq!(o.match_structure("CCO", &single).unwrap(), None);

        let pair = o.parse_query("CO").unwrap();
        let found = o.match_structure("CCO", &pair).unwrap().unwrap();
        assert_eq!(found.bonds, vec![1]);
    }

    #[test]
    fn test_unparseable_structure_match_is_error() {
        let o = oracle();
        let q = o.parse_query("CC").unwrap();
        assert!(o.match_structure("CC!", &q).is_err());
    }
}

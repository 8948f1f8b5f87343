//! Table-driven chemistry engine for tests.
//!
//! Similarities and pattern matches are scripted per structure string; any
//! structure can be marked invalid or made to fail. Every handle handed out
//! is counted so tests can assert that none outlive a scan or a search.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

use ferrocliff_chem::{ChemistryEngine, DepictOptions, Depiction, PatternMatch};
use ferrocliff_common::{CliffError, Result};

/// A handle that decrements the engine's live counter when dropped.
#[derive(Debug)]
pub struct StubHandle {
    pub notation: String,
    live: Arc<AtomicIsize>,
}

impl StubHandle {
    fn new(notation: &str, live: &Arc<AtomicIsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { notation: notation.to_string(), live: live.clone() }
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct StubEngine {
    similarities: HashMap<(String, String), f64>,
    default_similarity: f64,
    invalid: HashSet<String>,
    failing_similarity: HashSet<String>,
    matches: HashMap<(String, String), PatternMatch>,
    failing_match: HashSet<String>,
    invalid_patterns: HashSet<String>,
    substring_matching: bool,
    live: Arc<AtomicIsize>,
    parses: AtomicUsize,
    comparisons: AtomicUsize,
    depictions: AtomicUsize,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symmetric: `sim(a, b)` and `sim(b, a)` share one entry.
    pub fn with_similarity(mut self, a: &str, b: &str, similarity: f64) -> Self {
        self.similarities.insert(key(a, b), similarity);
        self
    }

    pub fn with_default_similarity(mut self, similarity: f64) -> Self {
        self.default_similarity = similarity;
        self
    }

    pub fn with_invalid(mut self, notation: &str) -> Self {
        self.invalid.insert(notation.to_string());
        self
    }

    pub fn with_failing_similarity(mut self, notation: &str) -> Self {
        self.failing_similarity.insert(notation.to_string());
        self
    }

    pub fn with_match(mut self, notation: &str, pattern: &str, found: PatternMatch) -> Self {
        self.matches.insert((notation.to_string(), pattern.to_string()), found);
        self
    }

    pub fn with_failing_match(mut self, notation: &str) -> Self {
        self.failing_match.insert(notation.to_string());
        self
    }

    pub fn with_invalid_pattern(mut self, pattern: &str) -> Self {
        self.invalid_patterns.insert(pattern.to_string());
        self
    }

    /// Unscripted patterns match when they occur as a substring; one atom per
    /// character, one bond between consecutive characters.
    pub fn with_substring_matching(mut self) -> Self {
        self.substring_matching = true;
        self
    }

    /// Handles currently alive.
    pub fn live_handles(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    pub fn comparison_count(&self) -> usize {
        self.comparisons.load(Ordering::SeqCst)
    }

    pub fn depiction_count(&self) -> usize {
        self.depictions.load(Ordering::SeqCst)
    }
}

impl ChemistryEngine for StubEngine {
    type Molecule = StubHandle;
    type Pattern = StubHandle;

    fn name(&self) -> &str {
        "stub"
    }

    fn parse(&self, notation: &str) -> Option<StubHandle> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        if notation.is_empty() || self.invalid.contains(notation) {
            return None;
        }
        Some(StubHandle::new(notation, &self.live))
    }

    fn parse_pattern(&self, pattern: &str) -> Option<StubHandle> {
        if self.invalid_patterns.contains(pattern) {
            return None;
        }
        Some(StubHandle::new(pattern, &self.live))
    }

    fn similarity(&self, a: &StubHandle, b: &StubHandle) -> Result<f64> {
        self.comparisons.fetch_add(1, Ordering::SeqCst);
        if self.failing_similarity.contains(&a.notation) || self.failing_similarity.contains(&b.notation) {
            return Err(CliffError::Chemistry("fingerprint generation failed".to_string()));
        }
        if a.notation == b.notation {
            return Ok(1.0);
        }
        Ok(self
            .similarities
            .get(&key(&a.notation, &b.notation))
            .copied()
            .unwrap_or(self.default_similarity))
    }

    fn depict(&self, mol: &StubHandle, options: &DepictOptions) -> Result<Depiction> {
        self.depictions.fetch_add(1, Ordering::SeqCst);
        let marker = match &options.highlight {
            Some(m) => format!(" highlight=\"{:?}\"", m.bonds),
            None => String::new(),
        };
        Ok(Depiction(format!("<svg{marker}>{}</svg>", mol.notation)))
    }

    fn match_pattern(&self, mol: &StubHandle, pattern: &StubHandle) -> Result<Option<PatternMatch>> {
        if self.failing_match.contains(&mol.notation) {
            return Err(CliffError::Chemistry(format!("match failed for {}", mol.notation)));
        }
        if let Some(found) = self.matches.get(&(mol.notation.clone(), pattern.notation.clone())) {
            return Ok(Some(found.clone()));
        }
        if self.substring_matching {
            if let Some(start) = mol.notation.find(pattern.notation.as_str()) {
                let len = pattern.notation.len();
                return Ok(Some(PatternMatch {
                    atoms: (start..start + len).collect(),
                    bonds: (start..start + len.saturating_sub(1)).collect(),
                }));
            }
        }
        Ok(None)
    }
}

//! Pairwise cliff scanner.
//!
//! Enumerates every unordered compound pair, asks the Similarity Oracle for a
//! score, keeps pairs at or above the threshold with a non-zero activity
//! delta, and scores them. The `n(n-1)/2` comparisons run in bounded chunks
//! with a yield point between chunks; progress is reported after each chunk.
//!
//! A scan never reads earlier partial results, so restarting is always safe.
//! Each scan holds a [`Ticket`]; once a newer ticket is issued the older scan
//! stops at its next chunk boundary and its output is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ferrocliff_chem::{ChemistryEngine, SimilarityOracle};
use ferrocliff_common::AnalysisConfig;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::batch::{pair_chunks, total_pairs};
use crate::models::{Compound, MatchedPair};

// ── Generations ───────────────────────────────────────────────────────────────

/// Monotonically increasing invocation counter. Issuing a ticket invalidates
/// every ticket issued before it.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new invocation, superseding any in flight.
    pub fn advance(&self) -> Ticket {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { id, counter: self.0.clone() }
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.id
    }
}

// ── Progress / outcome ────────────────────────────────────────────────────────

/// Emitted after every chunk; `completed` never decreases within a scan and
/// the final event is `(total, total)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub generation: u64,
    pub completed: usize,
    pub total: usize,
}

impl ScanProgress {
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    /// Matched pairs in scan order.
    Completed(Vec<MatchedPair>),
    /// A newer scan was started; nothing from this one may be used.
    Superseded { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    /// Inclusive lower bound on similarity.
    pub threshold: f64,
    pub chunk_size: usize,
}

impl From<&AnalysisConfig> for ScanOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            chunk_size: config.chunk_size,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

pub struct CliffScanner<E: ChemistryEngine> {
    oracle: Arc<SimilarityOracle<E>>,
    options: ScanOptions,
}

impl<E: ChemistryEngine> CliffScanner<E> {
    pub fn new(oracle: Arc<SimilarityOracle<E>>, options: ScanOptions) -> Self {
        Self { oracle, options }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Scan all compound pairs.
    ///
    /// Each compound is parsed once up front; the handles live until the scan
    /// returns, whichever way it returns. Compounds that fail to parse are
    /// logged once and every pair involving them is skipped.
    #[instrument(skip_all, fields(generation = ticket.id(), compounds = compounds.len()))]
    pub async fn scan(
        &self,
        compounds: &[Arc<Compound>],
        ticket: &Ticket,
        progress: Option<&broadcast::Sender<ScanProgress>>,
    ) -> ScanOutcome {
        let n = compounds.len();
        let total = total_pairs(n);
        let emit = |completed: usize| {
            if let Some(tx) = progress {
                let _ = tx.send(ScanProgress { generation: ticket.id(), completed, total });
            }
        };

        info!(total, threshold = self.options.threshold, chunk = self.options.chunk_size, "Starting cliff scan");

        let molecules: Vec<Option<E::Molecule>> = compounds
            .iter()
            .map(|c| self.oracle.parse(&c.structure))
            .collect();
        let unparsed = molecules.iter().filter(|m| m.is_none()).count();
        if unparsed > 0 {
            debug!(unparsed, "Compounds without a valid structure are excluded from pairing");
        }

        let mut pairs = Vec::new();
        let mut completed = 0usize;

        for chunk in pair_chunks(n, self.options.chunk_size) {
            if !ticket.is_current() {
                debug!(completed, total, "Scan superseded, abandoning");
                return ScanOutcome::Superseded { generation: ticket.id() };
            }

            for &(i, j) in &chunk {
                let (Some(mol_a), Some(mol_b)) = (&molecules[i], &molecules[j]) else {
                    continue;
                };
                let Some(similarity) = self.oracle.compare(mol_a, mol_b) else {
                    continue;
                };
                if similarity < self.options.threshold {
                    continue;
                }
                if let Some(pair) = MatchedPair::score(compounds[i].clone(), compounds[j].clone(), similarity) {
                    pairs.push(pair);
                }
            }

            completed += chunk.len();
            emit(completed);
            tokio::task::yield_now().await;
        }

        if !ticket.is_current() {
            return ScanOutcome::Superseded { generation: ticket.id() };
        }
        if total == 0 {
            emit(0);
        }

        info!(matched = pairs.len(), total, "Cliff scan complete");
        ScanOutcome::Completed(pairs)
    }
}

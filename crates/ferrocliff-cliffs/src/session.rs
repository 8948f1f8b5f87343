//! Analysis session: owns the derived collections for one upload.
//!
//! Compounds, matched pairs and search results are `Arc` snapshots replaced
//! wholesale, never mutated in place. Scans and searches each carry a
//! generation ticket; a result is committed only while its ticket is still
//! the newest, so a superseded invocation's late completion is dropped.

use std::sync::Arc;

use ferrocliff_chem::{ChemistryEngine, SimilarityOracle};
use ferrocliff_common::{AnalysisConfig, CliffError, ColumnSelection, RawRow, Result};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dedup::{deduplicate, DedupSummary};
use crate::models::{Compound, MatchedPair};
use crate::ranking::{rank_pairs, RankOptions};
use crate::scanner::{CliffScanner, Generation, ScanOptions, ScanOutcome, ScanProgress};
use crate::search::{SearchOutcome, SearchResults, SearchState, SubstructureSearch};

/// Capacity of the progress broadcast channel.
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Result of a (re)scan.
#[derive(Debug, Clone)]
pub enum Recompute {
    Committed { generation: u64, pairs: Arc<Vec<MatchedPair>> },
    Superseded { generation: u64 },
}

impl Recompute {
    pub fn pairs(&self) -> Option<&Arc<Vec<MatchedPair>>> {
        match self {
            Recompute::Committed { pairs, .. } => Some(pairs),
            Recompute::Superseded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub summary: DedupSummary,
    pub scan: Recompute,
}

/// What the presentation layer should show: the ranked list, or the current
/// search results when a search has completed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum DisplaySet {
    Ranked(Vec<MatchedPair>),
    Search(Arc<SearchResults>),
}

impl DisplaySet {
    pub fn len(&self) -> usize {
        match self {
            DisplaySet::Ranked(pairs) => pairs.len(),
            DisplaySet::Search(results) => results.hits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CliffSession<E: ChemistryEngine> {
    id: Uuid,
    oracle: Arc<SimilarityOracle<E>>,
    config: RwLock<AnalysisConfig>,
    compounds: RwLock<Arc<Vec<Arc<Compound>>>>,
    pairs: RwLock<Arc<Vec<MatchedPair>>>,
    /// Last successful search; untouched by a failed query.
    results: RwLock<Option<Arc<SearchResults>>>,
    search_state: RwLock<SearchState>,
    scans: Generation,
    searches: Generation,
    progress: broadcast::Sender<ScanProgress>,
}

impl<E: ChemistryEngine> CliffSession<E> {
    pub fn new(oracle: Arc<SimilarityOracle<E>>, config: AnalysisConfig) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        let id = Uuid::new_v4();
        info!(session = %id, engine = oracle.engine().name(), threshold = config.similarity_threshold, "Cliff session created");
        Self {
            id,
            oracle,
            config: RwLock::new(config),
            compounds: RwLock::new(Arc::new(Vec::new())),
            pairs: RwLock::new(Arc::new(Vec::new())),
            results: RwLock::new(None),
            search_state: RwLock::new(SearchState::Idle),
            scans: Generation::new(),
            searches: Generation::new(),
            progress,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn oracle(&self) -> &Arc<SimilarityOracle<E>> {
        &self.oracle
    }

    /// Progress events for every scan this session runs.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    pub async fn config(&self) -> AnalysisConfig {
        self.config.read().await.clone()
    }

    // ── Upload ────────────────────────────────────────────────────────────────

    /// Deduplicate a new upload and scan it.
    ///
    /// An input error clears every derived collection so no result from a
    /// previous upload is shown against the new one.
    pub async fn load(&self, rows: &[RawRow], columns: &ColumnSelection) -> Result<LoadReport> {
        let summary = match deduplicate(rows, columns) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Upload rejected, clearing results");
                self.reset().await;
                return Err(e);
            }
        };

        *self.compounds.write().await = Arc::new(summary.compounds.clone());
        let scan = self.rescan().await;
        Ok(LoadReport { summary, scan })
    }

    async fn reset(&self) {
        self.scans.advance();
        self.searches.advance();
        *self.compounds.write().await = Arc::new(Vec::new());
        *self.pairs.write().await = Arc::new(Vec::new());
        *self.results.write().await = None;
        *self.search_state.write().await = SearchState::Idle;
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    /// Recompute matched pairs from the current compounds and threshold,
    /// superseding any scan in flight. A committed pair set resets search.
    pub async fn rescan(&self) -> Recompute {
        let ticket = self.scans.advance();
        let compounds = self.compounds().await;
        let options = ScanOptions::from(&*self.config.read().await);
        let scanner = CliffScanner::new(self.oracle.clone(), options);

        let pairs = match scanner.scan(&compounds, &ticket, Some(&self.progress)).await {
            ScanOutcome::Completed(pairs) => Arc::new(pairs),
            ScanOutcome::Superseded { generation } => return Recompute::Superseded { generation },
        };

        {
            let mut slot = self.pairs.write().await;
            if !ticket.is_current() {
                return Recompute::Superseded { generation: ticket.id() };
            }
            *slot = pairs.clone();
        }
        self.searches.advance();
        *self.results.write().await = None;
        *self.search_state.write().await = SearchState::Idle;

        info!(session = %self.id, generation = ticket.id(), pairs = pairs.len(), "Matched pairs committed");
        Recompute::Committed { generation: ticket.id(), pairs }
    }

    /// Change the similarity threshold and rescan.
    pub async fn set_threshold(&self, threshold: f64) -> Result<Recompute> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CliffError::Config(format!("similarity threshold must be in [0, 1], got {threshold}")));
        }
        self.config.write().await.similarity_threshold = threshold;
        Ok(self.rescan().await)
    }

    pub async fn set_rank_options(&self, options: RankOptions) {
        let mut config = self.config.write().await;
        config.sort_key = options.sort_key;
        config.hide_zero_activity = options.hide_zero_activity;
    }

    pub async fn default_rank_options(&self) -> RankOptions {
        RankOptions::from(&*self.config.read().await)
    }

    pub async fn compounds(&self) -> Arc<Vec<Arc<Compound>>> {
        self.compounds.read().await.clone()
    }

    /// Matched pairs in scan order.
    pub async fn pairs(&self) -> Arc<Vec<MatchedPair>> {
        self.pairs.read().await.clone()
    }

    pub async fn ranked(&self, options: &RankOptions) -> Vec<MatchedPair> {
        rank_pairs(&self.pairs().await, options)
    }

    // ── Search ────────────────────────────────────────────────────────────────

    /// Run a substructure query over the full ranked list.
    ///
    /// An invalid query moves the state to `Error` and leaves the last
    /// results and the ranking as they were.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let ticket = self.searches.advance();
        *self.search_state.write().await = SearchState::Searching { query: query.to_string() };

        let options = self.default_rank_options().await;
        let ranked = self.ranked(&options).await;
        let chunk_size = self.config.read().await.chunk_size;
        let searcher = SubstructureSearch::new(self.oracle.clone(), chunk_size);

        let outcome = searcher.search(query, &ranked, &ticket).await;

        let mut state = self.search_state.write().await;
        if !ticket.is_current() {
            return Ok(SearchOutcome::Superseded { generation: ticket.id() });
        }
        match outcome {
            Ok(SearchOutcome::Completed(results)) => {
                *self.results.write().await = Some(results.clone());
                *state = SearchState::Results { results: results.clone() };
                Ok(SearchOutcome::Completed(results))
            }
            Ok(superseded) => Ok(superseded),
            Err(e) => {
                warn!(session = %self.id, query, error = %e, "Search failed");
                *state = SearchState::Error { query: query.to_string(), message: e.to_string() };
                Err(e)
            }
        }
    }

    /// Drop any search and return to the unfiltered ranked list.
    pub async fn clear_search(&self) {
        self.searches.advance();
        *self.results.write().await = None;
        *self.search_state.write().await = SearchState::Idle;
    }

    pub async fn search_state(&self) -> SearchState {
        self.search_state.read().await.clone()
    }

    pub async fn search_results(&self) -> Option<Arc<SearchResults>> {
        self.results.read().await.clone()
    }

    pub async fn displayed(&self) -> DisplaySet {
        if let Some(results) = self.search_results().await {
            return DisplaySet::Search(results);
        }
        let options = self.default_rank_options().await;
        DisplaySet::Ranked(self.ranked(&options).await)
    }
}

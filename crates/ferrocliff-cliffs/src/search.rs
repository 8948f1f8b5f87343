//! Substructure search over the full matched-pair list.
//!
//! A pair is kept when at least one member contains the query pattern with
//! at least one matched bond. Matched members get a highlighted depiction,
//! the other member keeps its plain one.

use std::collections::HashMap;
use std::sync::Arc;

use ferrocliff_chem::{ChemistryEngine, Depiction, PatternMatch, SimilarityOracle};
use ferrocliff_common::Result;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{Compound, MatchedPair};
use crate::scanner::Ticket;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub pair: MatchedPair,
    pub a_match: Option<PatternMatch>,
    pub b_match: Option<PatternMatch>,
    pub a_depiction: Option<Depiction>,
    pub b_depiction: Option<Depiction>,
}

impl SearchHit {
    pub fn key(&self) -> (usize, usize) {
        self.pair.key()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    /// Hits in the order of the input pair list.
    pub hits: Vec<SearchHit>,
    /// Pairs examined.
    pub searched: usize,
    /// Pairs skipped because a member could not be matched.
    pub skipped: usize,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// `Idle → Searching → (Results | Error)`; a new query or an explicit clear
/// leaves `Results`/`Error`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    #[default]
    Idle,
    Searching { query: String },
    Results { results: Arc<SearchResults> },
    Error { query: String, message: String },
}

impl SearchState {
    pub fn results(&self) -> Option<&Arc<SearchResults>> {
        match self {
            SearchState::Results { results } => Some(results),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SearchState::Idle)
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Completed(Arc<SearchResults>),
    Superseded { generation: u64 },
}

/// Per-compound outcome, computed at most once per search.
#[derive(Clone)]
enum MemberMatch {
    Hit { found: PatternMatch, depiction: Option<Depiction> },
    Miss,
    Failed,
}

pub struct SubstructureSearch<E: ChemistryEngine> {
    oracle: Arc<SimilarityOracle<E>>,
    chunk_size: usize,
}

impl<E: ChemistryEngine> SubstructureSearch<E> {
    pub fn new(oracle: Arc<SimilarityOracle<E>>, chunk_size: usize) -> Self {
        Self { oracle, chunk_size: chunk_size.max(1) }
    }

    /// Filter `pairs` to those where either member contains `query`.
    ///
    /// An invalid query fails before any pair is examined. Zero hits is a
    /// successful, empty result.
    #[instrument(skip_all, fields(query = %query, pairs = pairs.len(), generation = ticket.id()))]
    pub async fn search(&self, query: &str, pairs: &[MatchedPair], ticket: &Ticket) -> Result<SearchOutcome> {
        let pattern = self.oracle.parse_query(query)?;

        let mut memo: HashMap<usize, MemberMatch> = HashMap::new();
        let mut hits = Vec::new();
        let mut skipped = 0usize;

        for chunk in pairs.chunks(self.chunk_size) {
            if !ticket.is_current() {
                debug!("Search superseded, abandoning");
                return Ok(SearchOutcome::Superseded { generation: ticket.id() });
            }

            for pair in chunk {
                let a = self.member(&mut memo, &pair.a, &pattern);
                let b = self.member(&mut memo, &pair.b, &pattern);

                let (a_match, a_depiction) = match a {
                    MemberMatch::Failed => {
                        skipped += 1;
                        continue;
                    }
                    MemberMatch::Hit { found, depiction } => (Some(found), depiction),
                    MemberMatch::Miss => (None, None),
                };
                let (b_match, b_depiction) = match b {
                    MemberMatch::Failed => {
                        skipped += 1;
                        continue;
                    }
                    MemberMatch::Hit { found, depiction } => (Some(found), depiction),
                    MemberMatch::Miss => (None, None),
                };
                if a_match.is_none() && b_match.is_none() {
                    continue;
                }

                hits.push(SearchHit {
                    a_depiction: a_depiction.or_else(|| self.oracle.depiction(&pair.a.structure)),
                    b_depiction: b_depiction.or_else(|| self.oracle.depiction(&pair.b.structure)),
                    pair: pair.clone(),
                    a_match,
                    b_match,
                });
            }

            tokio::task::yield_now().await;
        }

        if !ticket.is_current() {
            return Ok(SearchOutcome::Superseded { generation: ticket.id() });
        }

        info!(hits = hits.len(), skipped, compounds_matched = memo.len(), "Substructure search complete");
        Ok(SearchOutcome::Completed(Arc::new(SearchResults {
            query: query.trim().to_string(),
            hits,
            searched: pairs.len(),
            skipped,
        })))
    }

    fn member(&self, memo: &mut HashMap<usize, MemberMatch>, compound: &Compound, pattern: &E::Pattern) -> MemberMatch {
        memo.entry(compound.id)
            .or_insert_with(|| match self.oracle.match_structure(&compound.structure, pattern) {
                Ok(Some(found)) => {
                    let depiction = self.oracle.highlighted_depiction(&compound.structure, &found);
                    MemberMatch::Hit { found, depiction }
                }
                Ok(None) => MemberMatch::Miss,
                Err(e) => {
                    warn!(compound = compound.id, error = %e, "Substructure match failed, skipping");
                    MemberMatch::Failed
                }
            })
            .clone()
    }
}

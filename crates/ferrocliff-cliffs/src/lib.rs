//! ferrocliff-cliffs: Matched-pair activity cliff engine.
//!
//! Flow for one upload:
//! 1. Deduplicate raw rows into unique compounds (`dedup`)
//! 2. Scan every compound pair through the Similarity Oracle in bounded,
//!    yielding chunks (`scanner`)
//! 3. Rank and filter the matched pairs (`ranking`)
//! 4. Optionally narrow them with a substructure query (`search`)
//!
//! `session` owns the derived collections and the generation counters that
//! let a newer scan or search supersede an in-flight one.

pub mod models;
pub mod dedup;
pub mod batch;
pub mod scanner;
pub mod ranking;
pub mod search;
pub mod session;

pub use dedup::{deduplicate, DedupSummary};
pub use models::{Compound, CompoundRecord, MatchedPair};
pub use ranking::{rank_pairs, top, RankOptions};
pub use scanner::{CliffScanner, Generation, ScanOptions, ScanOutcome, ScanProgress, Ticket};
pub use search::{SearchHit, SearchOutcome, SearchResults, SearchState, SubstructureSearch};
pub use session::{CliffSession, DisplaySet, LoadReport, Recompute};

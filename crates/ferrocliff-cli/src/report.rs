//! Rendering of the displayed set as a text table or JSON.

use std::fmt::Write as _;
use std::sync::Arc;

use ferrocliff_cliffs::{top, DedupSummary, DisplaySet, MatchedPair, SearchResults};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub session: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub unique_compounds: usize,
    pub duplicates_removed: usize,
    pub skipped_rows: usize,
    pub threshold: f64,
    pub matched_pairs: usize,
    /// Pairs eligible for display: all matched pairs, or the search hits.
    pub available: usize,
    pub shown: usize,
    pub display: DisplaySet,
}

impl Report {
    pub fn new(
        session: String,
        summary: &DedupSummary,
        threshold: f64,
        matched_pairs: usize,
        display: DisplaySet,
        limit: usize,
    ) -> Self {
        let available = match &display {
            DisplaySet::Ranked(_) => matched_pairs,
            DisplaySet::Search(results) => results.hits.len(),
        };
        let display = truncate(display, limit);
        Self {
            session,
            total_rows: summary.total_rows,
            valid_rows: summary.valid_rows,
            unique_compounds: summary.unique_compounds,
            duplicates_removed: summary.duplicates_removed,
            skipped_rows: summary.skipped_rows,
            threshold,
            matched_pairs,
            available,
            shown: display.len(),
            display,
        }
    }
}

/// Cap the displayed set; the full list stays with the session.
pub fn truncate(display: DisplaySet, limit: usize) -> DisplaySet {
    match display {
        DisplaySet::Ranked(pairs) => DisplaySet::Ranked(top(&pairs, limit).to_vec()),
        DisplaySet::Search(results) if results.hits.len() > limit => {
            let mut capped = SearchResults::clone(&results);
            capped.hits.truncate(limit);
            DisplaySet::Search(Arc::new(capped))
        }
        search => search,
    }
}

fn fmt_fold(fold: Option<f64>) -> String {
    fold.map(|f| format!("{f:.2}")).unwrap_or_else(|| "-".to_string())
}

fn pair_row(out: &mut String, rank: usize, pair: &MatchedPair, marks: (&str, &str)) {
    let _ = writeln!(
        out,
        "{:>4}  {:<16}{:1} {:<16}{:1} {:>6.3} {:>8.2} {:>8.2} {:>7.2} {:>7} {:>8.3}",
        rank,
        pair.a.external_id,
        marks.0,
        pair.b.external_id,
        marks.1,
        pair.similarity,
        pair.a.activity,
        pair.b.activity,
        pair.activity_delta,
        fmt_fold(pair.fold_change),
        pair.cliff_score,
    );
}

/// Plain-text summary followed by the pair table. Members containing the
/// query are marked with `*`.
pub fn render_table(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Rows: {}  valid: {}  unique compounds: {}  duplicates removed: {}  skipped: {}",
        report.total_rows, report.valid_rows, report.unique_compounds, report.duplicates_removed, report.skipped_rows
    );
    let _ = writeln!(out, "Matched pairs at similarity >= {:.2}: {}", report.threshold, report.matched_pairs);

    if let DisplaySet::Search(results) = &report.display {
        let _ = writeln!(
            out,
            "Query {:?}: {} matching pairs ({} skipped)",
            results.query,
            results.hits.len(),
            results.skipped
        );
    }
    if report.display.is_empty() {
        let _ = writeln!(out, "No pairs to show.");
        return out;
    }

    let _ = writeln!(
        out,
        "\n{:>4}  {:<17} {:<17} {:>6} {:>8} {:>8} {:>7} {:>7} {:>8}",
        "#", "compound A", "compound B", "sim", "act A", "act B", "delta", "fold", "score"
    );
    match &report.display {
        DisplaySet::Ranked(pairs) => {
            for (i, pair) in pairs.iter().enumerate() {
                pair_row(&mut out, i + 1, pair, ("", ""));
            }
        }
        DisplaySet::Search(results) => {
            for (i, hit) in results.hits.iter().enumerate() {
                let mark = |m: bool| if m { "*" } else { "" };
                pair_row(&mut out, i + 1, &hit.pair, (mark(hit.a_match.is_some()), mark(hit.b_match.is_some())));
            }
        }
    }
    if report.shown < report.available {
        let _ = writeln!(out, "\nShowing {} of {} pairs.", report.shown, report.available);
    }
    out
}

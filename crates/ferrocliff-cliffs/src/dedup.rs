//! Deduplication of raw rows into unique compounds.
//!
//! Rows are grouped by exact structure-string equality after trimming. Two
//! strings that encode the same molecule differently stay separate.

use std::collections::HashMap;
use std::sync::Arc;

use ferrocliff_common::{CliffError, ColumnSelection, RawRow, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Compound, CompoundRecord};

/// Result of deduplicating one upload.
#[derive(Debug, Clone, Serialize)]
pub struct DedupSummary {
    /// Unique compounds in first-appearance order.
    pub compounds: Vec<Arc<Compound>>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub unique_compounds: usize,
    /// `valid_rows - unique_compounds`
    pub duplicates_removed: usize,
    /// Rows with a missing structure or a non-finite activity.
    pub skipped_rows: usize,
}

/// Project raw rows onto the selected columns, dropping rows with an empty
/// structure or an activity that is not a finite number.
pub fn project_rows(rows: &[RawRow], columns: &ColumnSelection) -> Vec<CompoundRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(row_index, row)| {
            let structure = row.get(&columns.structure)?.as_text()?;
            let activity = row.get(&columns.activity)?.as_number()?;
            let external_id = columns
                .id
                .as_ref()
                .and_then(|col| row.get(col))
                .and_then(|cell| cell.as_text());
            Some(CompoundRecord { structure, activity, external_id, row_index })
        })
        .collect()
}

struct Group {
    structure: String,
    /// Running mean; stays finite for any finite inputs.
    mean: f64,
    count: usize,
    external_id: Option<String>,
}

/// Collapse rows sharing a structure string into one compound whose activity
/// is the arithmetic mean of the group.
pub fn deduplicate(rows: &[RawRow], columns: &ColumnSelection) -> Result<DedupSummary> {
    if rows.is_empty() {
        return Err(CliffError::EmptyDataset("no rows to process".to_string()));
    }

    let records = project_rows(rows, columns);
    let valid_rows = records.len();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for record in records {
        match index.get(&record.structure) {
            Some(&g) => {
                let group = &mut groups[g];
                group.count += 1;
                group.mean += (record.activity - group.mean) / group.count as f64;
                if group.external_id.is_none() {
                    group.external_id = record.external_id;
                }
            }
            None => {
                index.insert(record.structure.clone(), groups.len());
                groups.push(Group {
                    structure: record.structure,
                    mean: record.activity,
                    count: 1,
                    external_id: record.external_id,
                });
            }
        }
    }

    if groups.is_empty() {
        return Err(CliffError::NoValidCompounds);
    }

    let compounds: Vec<Arc<Compound>> = groups
        .into_iter()
        .enumerate()
        .map(|(ordinal, group)| {
            let id = ordinal + 1;
            if group.count > 1 {
                debug!(structure = %group.structure, rows = group.count, "Merged duplicate structure");
            }
            Arc::new(Compound {
                id,
                activity: group.mean,
                external_id: group.external_id.unwrap_or_else(|| format!("compound_{id}")),
                structure: group.structure,
                observations: group.count,
            })
        })
        .collect();

    let unique_compounds = compounds.len();
    let summary = DedupSummary {
        total_rows: rows.len(),
        valid_rows,
        unique_compounds,
        duplicates_removed: valid_rows - unique_compounds,
        skipped_rows: rows.len() - valid_rows,
        compounds,
    };

    info!(
        total = summary.total_rows,
        valid = summary.valid_rows,
        unique = summary.unique_compounds,
        duplicates = summary.duplicates_removed,
        skipped = summary.skipped_rows,
        "Deduplicated compounds"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrocliff_common::CellValue;
    use ferrocliff_test_utils::{columns, row, row_with_id, rows};

    #[test]
    fn test_repeated_structure_averages_activity() {
        let input = rows(&[("CCO", 6.0), ("CCN", 5.0), ("CCO", 7.5), ("CCO", 8.25)]);
        let summary = deduplicate(&input, &columns()).unwrap();

        assert_eq!(summary.unique_compounds, 2);
        let ethanol = &summary.compounds[0];
        assert_eq!(ethanol.structure, "CCO");
        assert_eq!(ethanol.activity, 7.25);
        assert_eq!(ethanol.observations, 3);
        assert_eq!(summary.duplicates_removed, summary.valid_rows - summary.unique_compounds);
        assert_eq!(summary.duplicates_removed, 2);
    }

    #[test]
    fn test_mean_of_huge_activities_stays_finite() {
        let input = rows(&[("CCO", 1.5e308), ("CCO", 1.5e308), ("CCO", 1.7e308), ("CCN", -1.6e308)]);
        let summary = deduplicate(&input, &columns()).unwrap();
        let ethanol = summary.compounds[0].activity;
        assert!(ethanol.is_finite());
        assert!((ethanol - 1.5666666666666667e308).abs() < 1e294);
        assert_eq!(summary.compounds[1].activity, -1.6e308);
    }

    #[test]
    fn test_first_appearance_order_and_sequential_ids() {
        let input = rows(&[("c1ccccc1", 1.0), ("CCO", 2.0), ("c1ccccc1", 3.0), ("CCC", 4.0)]);
        let summary = deduplicate(&input, &columns()).unwrap();
        let order: Vec<(&str, usize)> = summary
            .compounds
            .iter()
            .map(|c| (c.structure.as_str(), c.id))
            .collect();
        assert_eq!(order, vec![("c1ccccc1", 1), ("CCO", 2), ("CCC", 3)]);
    }

    #[test]
    fn test_whitespace_trimmed_before_grouping() {
        let input = vec![row("  CCO", 4.0), row("CCO  ", 6.0)];
        let summary = deduplicate(&input, &columns()).unwrap();
        assert_eq!(summary.unique_compounds, 1);
        assert_eq!(summary.compounds[0].activity, 5.0);
    }

    #[test]
    fn test_equivalent_but_distinct_strings_not_merged() {
        let input = rows(&[("OCC", 4.0), ("CCO", 6.0)]);
        let summary = deduplicate(&input, &columns()).unwrap();
        assert_eq!(summary.unique_compounds, 2);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let input = vec![
            row("CCO", 5.0),
            row("", 5.0),
            row("CCN", CellValue::Null),
            row("CCC", "not a number"),
            row("CCCl", f64::NAN),
            row("CCBr", " 7.25 "),
        ];
        let summary = deduplicate(&input, &columns()).unwrap();
        assert_eq!(summary.total_rows, 6);
        assert_eq!(summary.valid_rows, 2);
        assert_eq!(summary.skipped_rows, 4);
        assert_eq!(summary.compounds[1].activity, 7.25);
    }

    #[test]
    fn test_external_id_from_group_or_synthetic() {
        let input = vec![
            row("CCO", 1.0),
            row_with_id("CCO", 2.0, "CHEMBL545"),
            row("CCN", 3.0),
        ];
        let summary = deduplicate(&input, &columns()).unwrap();
        assert_eq!(summary.compounds[0].external_id, "CHEMBL545");
        assert_eq!(summary.compounds[1].external_id, "compound_2");
    }

    #[test]
    fn test_unit_suffixed_activity_and_numeric_labels() {
        let input = vec![
            row_with_id("CCO", "12 nM", "007"),
            row_with_id("CCN", "340 nM", "1e3"),
            row_with_id("CCC", "nM", "42"),
        ];
        let summary = deduplicate(&input, &columns()).unwrap();
        let got: Vec<(&str, f64)> = summary
            .compounds
            .iter()
            .map(|c| (c.external_id.as_str(), c.activity))
            .collect();
        assert_eq!(got, vec![("007", 12.0), ("1e3", 340.0)]);
        assert_eq!(summary.skipped_rows, 1);
    }

    #[test]
    fn test_no_surviving_rows_is_error() {
        let input = vec![row("", 1.0), row("CCO", CellValue::Null)];
        assert!(matches!(deduplicate(&input, &columns()), Err(CliffError::NoValidCompounds)));
        assert!(matches!(deduplicate(&[], &columns()), Err(CliffError::EmptyDataset(_))));
    }
}

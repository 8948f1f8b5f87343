//! Column detection: which columns hold the structure, the activity and the
//! compound label.

use std::sync::OnceLock;

use ferrocliff_common::{CellValue, CliffError, ColumnConfig, ColumnSelection, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::table::Table;

/// Rows inspected when deciding whether a column is numeric.
const NUMERIC_SAMPLE_ROWS: usize = 10;

/// Minimum length of a first-row value for content-based structure detection.
const MIN_STRUCTURE_LEN: usize = 5;

/// Activity-like headers, most specific first (compared after normalising).
const ACTIVITY_NAMES: &[&str] = &[
    "pic50", "pec50", "pki", "pkd", "pchemblvalue", "ic50", "ec50", "ki", "kd", "activity", "potency",
];

const ID_NAMES: &[&str] = &[
    "id", "compoundid", "cmpdid", "molid", "moleculeid", "chemblid", "moleculechemblid", "name", "compound",
];

fn structure_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[CNOcn()\[\]=]").expect("structure character pattern"))
}

/// Lowercase with everything but letters and digits removed:
/// `"Compound ID"` and `"compound_id"` both become `"compoundid"`.
pub fn normalise_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// A cell counts as numeric when it reads as one for deduplication too.
fn looks_numeric(cell: &CellValue) -> bool {
    cell.as_number().is_some()
}

/// Header-based detection first, then the content of the first row.
pub fn detect_structure_column(table: &Table) -> Option<String> {
    let by_header = table.columns.iter().find(|h| {
        let lower = h.to_lowercase();
        lower.contains("smile") || lower == "structure"
    });
    if let Some(col) = by_header {
        return Some(col.clone());
    }

    let first = table.rows.first()?;
    table
        .columns
        .iter()
        .find(|h| match first.get(h.as_str()) {
            Some(CellValue::Text(value)) => {
                value.chars().count() > MIN_STRUCTURE_LEN && structure_chars().is_match(value)
            }
            _ => false,
        })
        .cloned()
}

/// Columns with at least one numeric value among the first rows, in header order.
pub fn numeric_columns(table: &Table) -> Vec<String> {
    let sample = &table.rows[..table.rows.len().min(NUMERIC_SAMPLE_ROWS)];
    table
        .columns
        .iter()
        .filter(|col| sample.iter().any(|row| row.get(col.as_str()).is_some_and(looks_numeric)))
        .cloned()
        .collect()
}

/// Prefer an activity-looking header among the numeric columns, else the
/// first numeric column not excluded.
pub fn detect_activity_column(table: &Table, exclude: &[&str]) -> Option<String> {
    let candidates: Vec<String> = numeric_columns(table)
        .into_iter()
        .filter(|c| !exclude.contains(&c.as_str()))
        .collect();

    for name in ACTIVITY_NAMES {
        let preferred = candidates.iter().find(|c| {
            let norm = normalise_header(c);
            norm == *name || (name.len() > 2 && norm.starts_with(name))
        });
        if let Some(col) = preferred {
            return Some(col.clone());
        }
    }
    candidates.into_iter().next()
}

pub fn detect_id_column(table: &Table, exclude: &[&str]) -> Option<String> {
    ID_NAMES.iter().find_map(|name| {
        table
            .columns
            .iter()
            .find(|c| !exclude.contains(&c.as_str()) && normalise_header(c) == *name)
            .cloned()
    })
}

fn require(table: &Table, name: &str) -> Result<String> {
    if table.has_column(name) {
        Ok(name.to_string())
    } else {
        Err(CliffError::ColumnNotFound(format!("{name} (available: {})", table.columns.join(", "))))
    }
}

/// Resolve the column selection: configured names win, the rest is detected.
pub fn resolve_columns(table: &Table, config: &ColumnConfig) -> Result<ColumnSelection> {
    let structure = match &config.structure {
        Some(name) => require(table, name)?,
        None => detect_structure_column(table).ok_or_else(|| {
            CliffError::ColumnNotFound(
                "could not auto-detect a structure column; name it explicitly".to_string(),
            )
        })?,
    };

    let id = match &config.id {
        Some(name) => Some(require(table, name)?),
        None => detect_id_column(table, &[structure.as_str()]),
    };

    let activity = match &config.activity {
        Some(name) => require(table, name)?,
        None => {
            let mut exclude = vec![structure.as_str()];
            if let Some(id) = &id {
                exclude.push(id.as_str());
            }
            detect_activity_column(table, &exclude)
                .ok_or_else(|| CliffError::ColumnNotFound("no numeric activity column found".to_string()))?
        }
    };

    debug!(numeric = ?numeric_columns(table), "Numeric columns");
    info!(structure = %structure, activity = %activity, id = ?id, "Columns resolved");

    let selection = ColumnSelection::new(structure, activity);
    Ok(match id {
        Some(id) => selection.with_id(id),
        None => selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::from_reader;
    use pretty_assertions::assert_eq;

    fn table(csv: &str) -> Table {
        from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_structure_column_by_header() {
        let t = table("Canonical_SMILES,pIC50\nCCO,5\n");
        assert_eq!(detect_structure_column(&t).as_deref(), Some("Canonical_SMILES"));
        let t = table("Structure,value\nCCO,5\n");
        assert_eq!(detect_structure_column(&t).as_deref(), Some("Structure"));
    }

    #[test]
    fn test_structure_column_by_content() {
        let t = table("label,mol,act\nxyz-123,c1ccccc1O,5\n");
        assert_eq!(detect_structure_column(&t).as_deref(), Some("mol"));
        let t = table("label,act\nshort,5\n");
        assert_eq!(detect_structure_column(&t), None);
    }

    #[test]
    fn test_numeric_columns_from_leading_rows() {
        let t = table("smiles,pIC50,note,mixed\nCCO,5.5,x,n/a\nCCN,6.0,y,7 nM\n");
        assert_eq!(numeric_columns(&t), vec!["pIC50", "mixed"]);
    }

    #[test]
    fn test_activity_prefers_named_column() {
        let t = table("smiles,MW,pIC50,compound_id\nCCO,46.07,5.5,1\n");
        assert_eq!(detect_activity_column(&t, &["smiles", "compound_id"]).as_deref(), Some("pIC50"));
        let t = table("smiles,MW,score\nCCO,46.07,5.5\n");
        assert_eq!(detect_activity_column(&t, &["smiles"]).as_deref(), Some("MW"));
    }

    #[test]
    fn test_resolve_detects_all_three() {
        let t = table("Compound ID,SMILES,Ki (nM)\nC-1,CCO,12\n");
        let cols = resolve_columns(&t, &ColumnConfig::default()).unwrap();
        assert_eq!(cols.structure, "SMILES");
        assert_eq!(cols.activity, "Ki (nM)");
        assert_eq!(cols.id.as_deref(), Some("Compound ID"));
    }

    #[test]
    fn test_configured_column_must_exist() {
        let t = table("smiles,pIC50\nCCO,5\n");
        let config = ColumnConfig { activity: Some("IC50".to_string()), ..ColumnConfig::default() };
        assert!(matches!(resolve_columns(&t, &config), Err(CliffError::ColumnNotFound(_))));
    }

    #[test]
    fn test_missing_structure_column_is_error() {
        let t = table("a,b\n1,2\n");
        let err = resolve_columns(&t, &ColumnConfig::default()).unwrap_err();
        assert!(err.is_input_error());
    }
}

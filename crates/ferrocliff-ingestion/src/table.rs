//! Delimited-file reading into dynamically typed rows.

use std::io::Read;
use std::path::Path;

use ferrocliff_common::{CellValue, CliffError, RawRow, Result};
use serde::Serialize;
use tracing::{debug, info};

/// An ingested table: header order plus one map per data row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cells of one column, in row order; missing cells read as `Null`.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows.iter().map(move |row| row.get(name).unwrap_or(&CellValue::Null))
    }
}

/// Empty → `Null`, anything else stays `Text` exactly as written. Numbers
/// are read per use through [`CellValue::as_number`], so labels like `007`
/// and structure strings keep their spelling.
pub fn type_cell(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(raw.to_string())
    }
}

fn csv_error(e: csv::Error) -> CliffError {
    CliffError::Ingestion(format!("CSV parse error: {e}"))
}

/// Read a CSV file with a header row.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading CSV");
    let file = std::fs::File::open(path)?;
    let table = from_reader(file)?;
    info!(path = %path.display(), rows = table.len(), columns = table.columns.len(), "CSV loaded");
    Ok(table)
}

/// Parse CSV from any reader. Blank lines are skipped and short rows are
/// padded with `Null`. A table without data rows is an empty dataset.
pub fn from_reader<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(CliffError::EmptyDataset("CSV file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: RawRow = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), record.get(i).map(type_cell).unwrap_or(CellValue::Null)))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CliffError::EmptyDataset("CSV file is empty".to_string()));
    }
    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_typing() {
        assert_eq!(type_cell(""), CellValue::Null);
        assert_eq!(type_cell("   "), CellValue::Null);
        assert_eq!(type_cell("CCO"), CellValue::Text("CCO".to_string()));
        assert_eq!(type_cell(" -1e2 ").as_number(), Some(-100.0));
        assert_eq!(type_cell("007").as_text().as_deref(), Some("007"));
        assert_eq!(type_cell("NaN").as_number(), None);
    }

    #[test]
    fn test_reads_header_and_rows() {
        let data = "smiles,pIC50,name\nCCO,6.1,ethanol\nc1ccccc1,,benzene\n";
        let table = from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["smiles", "pIC50", "name"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["pIC50"].as_number(), Some(6.1));
        assert!(table.rows[1]["pIC50"].is_null());
    }

    #[test]
    fn test_blank_lines_skipped_and_short_rows_padded() {
        let data = "smiles,pIC50,name\nCCO,6.1\n\n,,\nCCN,5.0,amine\n";
        let table = from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows[0]["name"].is_null());
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let err = from_reader("smiles,pIC50\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CliffError::EmptyDataset(_)));
        let err = from_reader("".as_bytes()).unwrap_err();
        assert!(matches!(err, CliffError::EmptyDataset(_)));
    }
}

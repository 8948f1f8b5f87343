//! CSV files on disk through to a column selection.

use std::io::Write;

use ferrocliff_common::{CellValue, CliffError, ColumnConfig};
use ferrocliff_ingestion::{read_csv, resolve_columns};
use pretty_assertions::assert_eq;

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_chembl_style_export() {
    let file = write_csv(
        "Molecule ChEMBL ID,Smiles,Standard Type,pChEMBL Value\n\
         CHEMBL25,CC(=O)Oc1ccccc1C(=O)O,IC50,5.2\n\
         CHEMBL112,CC(=O)Nc1ccc(O)cc1,IC50,\n\
         CHEMBL521,CC(C)Cc1ccc(cc1)C(C)C(=O)O,IC50,6.8\n",
    );

    let table = read_csv(file.path()).unwrap();
    let cols = resolve_columns(&table, &ColumnConfig::default()).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(cols.structure, "Smiles");
    assert_eq!(cols.activity, "pChEMBL Value");
    assert_eq!(cols.id.as_deref(), Some("Molecule ChEMBL ID"));
    assert_eq!(table.rows[1]["pChEMBL Value"], CellValue::Null);
}

#[test]
fn test_configured_columns_override_detection() {
    let file = write_csv("smiles,pIC50,Ki,label\nCCO,5.5,120,a\nCCN,6.1,80,b\n");
    let table = read_csv(file.path()).unwrap();
    let config = ColumnConfig {
        activity: Some("Ki".to_string()),
        id: Some("label".to_string()),
        ..ColumnConfig::default()
    };

    let cols = resolve_columns(&table, &config).unwrap();

    assert_eq!(cols.activity, "Ki");
    assert_eq!(cols.id.as_deref(), Some("label"));
}

#[test]
fn test_header_only_file_is_empty_dataset() {
    let file = write_csv("smiles,pIC50\n");
    assert!(matches!(read_csv(file.path()), Err(CliffError::EmptyDataset(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");
    assert!(matches!(read_csv(&missing), Err(CliffError::Io(_))));
}

#[test]
fn test_structure_detected_from_content() {
    let file = write_csv("entry,mol,potency\nrow-1,Cc1ccccc1N,7.5\nrow-2,Cc1ccccc1O,7.0\n");
    let table = read_csv(file.path()).unwrap();
    let cols = resolve_columns(&table, &ColumnConfig::default()).unwrap();
    assert_eq!(cols.structure, "mol");
    assert_eq!(cols.activity, "potency");
    assert_eq!(cols.id, None);
}

#[test]
fn test_unit_suffixed_activity_column_is_usable() {
    let file = write_csv("smiles,Ki (nM),id\nCCO,12 nM,007\nCCN,340 nM,1e3\nCCC,7 nM,010\n");
    let table = read_csv(file.path()).unwrap();
    let cols = resolve_columns(&table, &ColumnConfig::default()).unwrap();

    assert_eq!(cols.activity, "Ki (nM)");
    let activities: Vec<Option<f64>> = table.column(&cols.activity).map(CellValue::as_number).collect();
    assert_eq!(activities, vec![Some(12.0), Some(340.0), Some(7.0)]);
    let labels: Vec<Option<String>> = table.column("id").map(CellValue::as_text).collect();
    assert_eq!(labels, vec![Some("007".to_string()), Some("1e3".to_string()), Some("010".to_string())]);
}

//! Row fixtures in the shape the ingestion layer hands to the deduplicator.

use ferrocliff_common::{CellValue, ColumnSelection, RawRow};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;

pub const STRUCTURE_COL: &str = "smiles";
pub const ACTIVITY_COL: &str = "pIC50";
pub const ID_COL: &str = "compound_id";

/// Structure, activity and id columns used by every fixture row.
pub fn columns() -> ColumnSelection {
    ColumnSelection::new(STRUCTURE_COL, ACTIVITY_COL).with_id(ID_COL)
}

pub fn row(structure: &str, activity: impl Into<CellValue>) -> RawRow {
    let mut r = RawRow::new();
    r.insert(STRUCTURE_COL.to_string(), CellValue::from(structure));
    r.insert(ACTIVITY_COL.to_string(), activity.into());
    r
}

pub fn row_with_id(structure: &str, activity: impl Into<CellValue>, id: &str) -> RawRow {
    let mut r = row(structure, activity);
    r.insert(ID_COL.to_string(), CellValue::from(id));
    r
}

pub fn rows(entries: &[(&str, f64)]) -> Vec<RawRow> {
    entries.iter().map(|(s, a)| row(s, *a)).collect()
}

/// Deterministic library of small aromatic analogues: a benzene core with
/// substituents drawn from a fixed list, activities in [4, 9).
pub fn synthetic_library(n: usize, seed: u64) -> Vec<RawRow> {
    const SUBSTITUENTS: &[&str] = &["C", "O", "N", "F", "Cl", "Br", "CC", "OC", "C(=O)O", "C#N", "N(C)C"];
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let first = SUBSTITUENTS.choose(&mut rng).copied().unwrap_or("C");
            let second = SUBSTITUENTS.choose(&mut rng).copied().unwrap_or("O");
            let structure = format!("{first}c1ccc({second})cc1");
            let activity: f64 = rng.gen_range(4.0..9.0);
            row_with_id(&structure, activity, &format!("LIB-{i:04}"))
        })
        .collect()
}

/// Everything currently queued on a broadcast receiver.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

//! Raw table cells as handed over by the ingestion layer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

fn numeric_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("numeric prefix pattern")
    })
}

/// Value of the number a string starts with, ignoring any trailing unit
/// (`"12 nM"` reads as 12). `None` when the text does not start with a
/// number or the number is not finite.
pub fn leading_number(text: &str) -> Option<f64> {
    let found = numeric_prefix().find(text)?;
    let value = found.as_str().trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// A single cell of an ingested row: string, number, or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Trimmed textual form of the cell; `None` for missing or blank cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Null => None,
        }
    }

    /// Numeric value of the cell. Text is read up to the end of its leading
    /// number, so unit suffixes are tolerated.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => n.is_finite().then_some(*n),
            CellValue::Text(s) => leading_number(s),
            CellValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One ingested record keyed by column name.
pub type RawRow = HashMap<String, CellValue>;

/// The three columns the deduplicator projects rows onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub structure: String,
    pub activity: String,
    pub id: Option<String>,
}

impl ColumnSelection {
    pub fn new(structure: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            structure: structure.into(),
            activity: activity.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_number_accepts_numeric_text() {
        assert_eq!(CellValue::from(" 6.5 ").as_number(), Some(6.5));
        assert_eq!(CellValue::from(7.0).as_number(), Some(7.0));
    }

    #[test]
    fn test_as_number_reads_leading_number() {
        assert_eq!(CellValue::from("12 nM").as_number(), Some(12.0));
        assert_eq!(CellValue::from(" 3.5e1uM").as_number(), Some(35.0));
        assert_eq!(CellValue::from("-.5 (approx)").as_number(), Some(-0.5));
        assert_eq!(CellValue::from("7.").as_number(), Some(7.0));
    }

    #[test]
    fn test_as_number_rejects_text_without_leading_number() {
        assert_eq!(CellValue::from("nM 12").as_number(), None);
        assert_eq!(CellValue::from(">100").as_number(), None);
        assert_eq!(CellValue::from("inactive").as_number(), None);
        assert_eq!(CellValue::from("1e400").as_number(), None);
    }

    #[test]
    fn test_as_text_keeps_numeric_looking_text() {
        assert_eq!(CellValue::from("007").as_text().as_deref(), Some("007"));
        assert_eq!(CellValue::from(" 1e3 ").as_text().as_deref(), Some("1e3"));
    }

    #[test]
    fn test_as_number_rejects_non_finite() {
        assert_eq!(CellValue::from("NaN").as_number(), None);
        assert_eq!(CellValue::from(f64::INFINITY).as_number(), None);
        assert_eq!(CellValue::from("n/a").as_number(), None);
        assert_eq!(CellValue::Null.as_number(), None);
    }

    #[test]
    fn test_as_text_trims_and_drops_blank() {
        assert_eq!(CellValue::from("  CCO ").as_text().as_deref(), Some("CCO"));
        assert_eq!(CellValue::from("   ").as_text(), None);
        assert_eq!(CellValue::Null.as_text(), None);
    }
}

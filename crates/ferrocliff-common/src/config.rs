//! Configuration loading for Ferrocliff.
//! Reads ferrocliff.toml from the current directory or the path in FERROCLIFF_CONFIG.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{CliffError, Result};

/// Complete analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliffConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    #[serde(default)]
    pub depiction: DepictionConfig,

    /// Column overrides; unset columns are auto-detected.
    #[serde(default)]
    pub columns: ColumnConfig,
}

// ── Analysis ──────────────────────────────────────────────────────────────────

/// Numeric field the ranked pair list is sorted by (descending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Score,
    #[serde(alias = "delta")]
    ActivityDelta,
    #[serde(alias = "fold")]
    FoldChange,
    Similarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum fingerprint similarity for a pair to be kept (inclusive).
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,

    /// Comparisons per chunk between yield points.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Rows shown by the presentation layer.
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    #[serde(default)]
    pub hide_zero_activity: bool,

    #[serde(default)]
    pub sort_key: SortKey,
}

fn default_threshold() -> f64 { 0.7 }
fn default_chunk_size() -> usize { 200 }
fn default_display_limit() -> usize { 50 }

pub const MAX_CHUNK_SIZE: usize = 10_000;

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            chunk_size: default_chunk_size(),
            display_limit: default_display_limit(),
            hide_zero_activity: false,
            sort_key: SortKey::default(),
        }
    }
}

// ── Chemistry engine ─────────────────────────────────────────────────────────

/// Circular fingerprint parameters for the built-in engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default = "default_radius")]
    pub radius: usize,

    #[serde(default = "default_nbits")]
    pub nbits: usize,
}

fn default_radius() -> usize { 2 }
fn default_nbits() -> usize { 2048 }

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self { radius: default_radius(), nbits: default_nbits() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepictionConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 { 120 }
fn default_height() -> u32 { 80 }

impl Default for DepictionConfig {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

// ── Columns ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub structure: Option<String>,
    pub activity: Option<String>,
    pub id: Option<String>,
}

impl CliffConfig {
    /// Load configuration.
    /// Checks FERROCLIFF_CONFIG env var first, then ferrocliff.toml in the
    /// current directory. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("FERROCLIFF_CONFIG")
            .unwrap_or_else(|_| "ferrocliff.toml".to_string());

        if !Path::new(&path).exists() {
            debug!(path = %path, "No config file found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from an explicit path. The format follows the file
    /// extension: `.yaml`/`.yml`, `.json`, anything else is TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: CliffConfig = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| CliffError::Config(format!("{}: {e}", path.display())))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CliffError::Config(format!("{}: {e}", path.display())))?,
            _ => toml::from_str(&content)
                .map_err(|e| CliffError::Config(format!("{}: {e}", path.display())))?,
        };

        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if !(0.0..=1.0).contains(&a.similarity_threshold) {
            return Err(CliffError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                a.similarity_threshold
            )));
        }
        if a.chunk_size == 0 || a.chunk_size > MAX_CHUNK_SIZE {
            return Err(CliffError::Config(format!(
                "chunk_size must be within 1..={MAX_CHUNK_SIZE}, got {}",
                a.chunk_size
            )));
        }
        if self.fingerprint.nbits == 0 {
            return Err(CliffError::Config("fingerprint.nbits must be positive".to_string()));
        }
        if self.depiction.width == 0 || self.depiction.height == 0 {
            return Err(CliffError::Config("depiction size must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_analysis_design() {
        let config = CliffConfig::default();
        assert_eq!(config.analysis.similarity_threshold, 0.7);
        assert_eq!(config.analysis.display_limit, 50);
        assert_eq!(config.analysis.sort_key, SortKey::Score);
        assert_eq!(config.fingerprint.radius, 2);
        assert_eq!(config.fingerprint.nbits, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CliffConfig = toml::from_str(
            "[analysis]\nsimilarity_threshold = 0.85\nsort_key = \"fold\"\n",
        )
        .unwrap();
        assert_eq!(config.analysis.similarity_threshold, 0.85);
        assert_eq!(config.analysis.sort_key, SortKey::FoldChange);
        assert_eq!(config.analysis.chunk_size, 200);
        assert_eq!(config.depiction.width, 120);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = CliffConfig::default();
        config.analysis.similarity_threshold = 1.5;
        assert!(matches!(config.validate(), Err(CliffError::Config(_))));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = CliffConfig::default();
        config.analysis.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_yaml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "analysis:\n  hide_zero_activity: true\ncolumns:\n  structure: smiles").unwrap();
        let config = CliffConfig::load_from(file.path()).unwrap();
        assert!(config.analysis.hide_zero_activity);
        assert_eq!(config.columns.structure.as_deref(), Some("smiles"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[analysis\nchunk_size = ").unwrap();
        assert!(matches!(CliffConfig::load_from(file.path()), Err(CliffError::Config(_))));
    }
}

//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use ferrocliff_common::{CliffConfig, SortKey};

#[derive(Debug, Parser)]
#[command(name = "ferrocliff")]
#[command(about = "Find activity cliffs: structurally similar compounds with large potency differences", long_about = None)]
#[command(version)]
pub struct Cli {
    /// CSV file with a header row
    pub input: PathBuf,

    /// Config file (TOML, YAML or JSON); defaults to FERROCLIFF_CONFIG or ./ferrocliff.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Column holding the structure notation (auto-detected if omitted)
    #[arg(long, value_name = "COLUMN")]
    pub structure_col: Option<String>,

    /// Column holding the activity value (auto-detected if omitted)
    #[arg(long, value_name = "COLUMN")]
    pub activity_col: Option<String>,

    /// Column holding the compound label
    #[arg(long, value_name = "COLUMN")]
    pub id_col: Option<String>,

    /// Minimum similarity for a pair (0.0 - 1.0)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Ranking key
    #[arg(short, long, value_enum)]
    pub sort: Option<SortArg>,

    /// Hide pairs where either compound has zero activity
    #[arg(long, action = ArgAction::SetTrue)]
    pub hide_zero: bool,

    /// Substructure query; only pairs containing it are shown
    #[arg(short, long)]
    pub query: Option<String>,

    /// Rows to display
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Emit JSON instead of a table
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Score,
    Delta,
    Fold,
    Similarity,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Score => SortKey::Score,
            SortArg::Delta => SortKey::ActivityDelta,
            SortArg::Fold => SortKey::FoldChange,
            SortArg::Similarity => SortKey::Similarity,
        }
    }
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut CliffConfig) {
        if let Some(t) = self.threshold {
            config.analysis.similarity_threshold = t;
        }
        if let Some(sort) = self.sort {
            config.analysis.sort_key = sort.into();
        }
        if self.hide_zero {
            config.analysis.hide_zero_activity = true;
        }
        if let Some(limit) = self.limit {
            config.analysis.display_limit = limit;
        }
        if self.structure_col.is_some() {
            config.columns.structure = self.structure_col.clone();
        }
        if self.activity_col.is_some() {
            config.columns.activity = self.activity_col.clone();
        }
        if self.id_col.is_some() {
            config.columns.id = self.id_col.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "ferrocliff", "data.csv", "--threshold", "0.85", "--sort", "fold", "--hide-zero", "--activity-col", "Ki",
            "-n", "10",
        ]);
        let mut config = CliffConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.analysis.similarity_threshold, 0.85);
        assert_eq!(config.analysis.sort_key, SortKey::FoldChange);
        assert!(config.analysis.hide_zero_activity);
        assert_eq!(config.analysis.display_limit, 10);
        assert_eq!(config.columns.activity.as_deref(), Some("Ki"));
        assert_eq!(config.columns.structure, None);
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["ferrocliff", "data.csv"]);
        let mut config = CliffConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, CliffConfig::default());
    }
}

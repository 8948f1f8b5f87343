use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliffError {
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("No valid compounds found with both structure and activity values")]
    NoValidCompounds,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid query pattern: {0}")]
    InvalidQuery(String),

    #[error("Chemistry engine error: {0}")]
    Chemistry(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliffError {
    /// Input-data errors halt the batch and clear prior results.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CliffError::EmptyDataset(_) | CliffError::NoValidCompounds | CliffError::ColumnNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CliffError>;

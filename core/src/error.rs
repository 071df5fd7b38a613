use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Census tract '{tract_id}' not found")]
    TractNotFound { tract_id: String },

    #[error("Unknown intervention(s): {}", names.join(", "))]
    UnknownInterventions { names: Vec<String> },

    #[error("Source table for '{field}' not found at {path}")]
    MissingSource { field: String, path: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ScoreResult<T> = Result<T, ScoreError>;

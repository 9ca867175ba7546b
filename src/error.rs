use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Cannot read archive {}: {source}", path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Station {station_id}: malformed record file: {message}")]
    RecordParse { station_id: String, message: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Checkpoint {} is locked by another run (remove the lock file if no run is active)", .0.display())]
    CheckpointLocked(PathBuf),

    #[error("Invalid percentile levels: {0}")]
    InvalidPercentileLevels(String),

    #[error("Station {station_id} not found")]
    StationNotFound { station_id: String },

    #[error("Database schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i64, found: i64 },

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Processing cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    pub(crate) fn record_parse(station_id: &str, message: impl Into<String>) -> Self {
        ProcessingError::RecordParse {
            station_id: station_id.to_string(),
            message: message.into(),
        }
    }
}

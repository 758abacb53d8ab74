use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read from store: {0}")]
    StoreRead(String),

    #[error("Failed to write to store: {0}")]
    StoreWrite(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Lineage cycle detected at occurrence {0}")]
    ChainCycle(Uuid),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Occurrence not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, Title)
}

impl CoreError {
    /// Whether this error came from the store rather than from the series itself.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            CoreError::StoreRead(_) | CoreError::StoreWrite(_) | CoreError::Database(_)
        )
    }
}

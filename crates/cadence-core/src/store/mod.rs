use crate::error::CoreError;
use crate::models::Occurrence;
use crate::query::Query;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod query_builder;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Generic persistent store the series engines run against.
///
/// Writes are staged until [`save`](OccurrenceStore::save) commits them;
/// [`rollback`](OccurrenceStore::rollback) discards everything staged since
/// the last commit. Reads observe staged writes.
#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Occurrence>, CoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError>;
    async fn insert(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError>;
    async fn update(&self, occurrence: &Occurrence) -> Result<(), CoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), CoreError>;
    async fn save(&self) -> Result<(), CoreError>;
    async fn rollback(&self) -> Result<(), CoreError>;

    /// Occurrences whose id starts with `prefix`, for short-id lookups.
    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Occurrence>, CoreError> {
        let prefix = prefix.to_lowercase();
        let all = self.query(&Query::All).await?;
        Ok(all
            .into_iter()
            .filter(|o| o.id.to_string().starts_with(&prefix))
            .collect())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, Transaction};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::query_builder::SqlQueryBuilder;
use super::OccurrenceStore;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{CustomRule, Occurrence, Pattern};
use crate::query::Query;

/// Raw `occurrences` row; the rule is stored as JSON text.
#[derive(Debug, Clone, FromRow)]
struct OccurrenceRow {
    id: Uuid,
    title: String,
    notes: Option<String>,
    due_at: Option<DateTime<Utc>>,
    project_id: Option<Uuid>,
    section_id: Option<Uuid>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_recurring: bool,
    pattern: Pattern,
    custom_rule: Option<String>,
    series_end: Option<DateTime<Utc>>,
    remaining_count: Option<i64>,
    lineage_parent_id: Option<Uuid>,
}

impl TryFrom<OccurrenceRow> for Occurrence {
    type Error = CoreError;

    fn try_from(row: OccurrenceRow) -> Result<Self, Self::Error> {
        let custom_rule = row
            .custom_rule
            .as_deref()
            .map(CustomRule::from_json)
            .transpose()
            .map_err(|e| CoreError::StoreRead(format!("occurrence {}: {}", row.id, e)))?;
        let remaining_count = row
            .remaining_count
            .map(u32::try_from)
            .transpose()
            .map_err(|_| {
                CoreError::StoreRead(format!("occurrence {}: remaining count out of range", row.id))
            })?;

        Ok(Occurrence {
            id: row.id,
            title: row.title,
            notes: row.notes,
            due_at: row.due_at,
            project_id: row.project_id,
            section_id: row.section_id,
            completed: row.completed,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_recurring: row.is_recurring,
            pattern: row.pattern,
            custom_rule,
            series_end: row.series_end,
            remaining_count,
            lineage_parent_id: row.lineage_parent_id,
        })
    }
}

fn read_error(err: sqlx::Error) -> CoreError {
    CoreError::StoreRead(err.to_string())
}

fn write_error(err: sqlx::Error) -> CoreError {
    CoreError::StoreWrite(err.to_string())
}

type TxSlot = Option<Transaction<'static, Sqlite>>;

/// SQLite-backed store. The first write opens a transaction that stays open
/// until `save` or `rollback`; reads go through it while it is open.
pub struct SqliteStore {
    pool: DbPool,
    tx: Mutex<TxSlot>,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            tx: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn begin(&self) -> Result<MutexGuard<'_, TxSlot>, CoreError> {
        let mut guard = self.tx.lock().await;
        if guard.is_none() {
            *guard = Some(self.pool.begin().await.map_err(write_error)?);
            debug!("opened store transaction");
        }
        Ok(guard)
    }
}

fn open(slot: &mut TxSlot) -> Result<&mut Transaction<'static, Sqlite>, CoreError> {
    slot.as_mut()
        .ok_or_else(|| CoreError::StoreWrite("no open transaction".to_string()))
}

#[async_trait]
impl OccurrenceStore for SqliteStore {
    async fn query(&self, query: &Query) -> Result<Vec<Occurrence>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM occurrences o WHERE ");
        SqlQueryBuilder::build_sql_where_clause(query, &mut qb);
        qb.push(" ORDER BY o.due_at IS NULL, o.due_at, o.id");

        let mut guard = self.tx.lock().await;
        let rows: Vec<OccurrenceRow> = match guard.as_mut() {
            Some(tx) => qb.build_query_as().fetch_all(&mut **tx).await,
            None => qb.build_query_as().fetch_all(&self.pool).await,
        }
        .map_err(read_error)?;

        rows.into_iter().map(Occurrence::try_from).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let sql = "SELECT * FROM occurrences WHERE id = $1";
        let mut guard = self.tx.lock().await;
        let row: Option<OccurrenceRow> = match guard.as_mut() {
            Some(tx) => sqlx::query_as(sql).bind(id).fetch_optional(&mut **tx).await,
            None => sqlx::query_as(sql).bind(id).fetch_optional(&self.pool).await,
        }
        .map_err(read_error)?;

        row.map(Occurrence::try_from).transpose()
    }

    async fn insert(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        let custom_rule = occurrence.custom_rule.as_ref().map(CustomRule::to_json).transpose()?;
        let mut guard = self.begin().await?;
        let tx = open(&mut guard)?;

        sqlx::query(
            r#"INSERT INTO occurrences (id, title, notes, due_at, project_id, section_id, completed, completed_at, created_at, updated_at, is_recurring, pattern, custom_rule, series_end, remaining_count, lineage_parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(occurrence.id)
        .bind(&occurrence.title)
        .bind(&occurrence.notes)
        .bind(occurrence.due_at)
        .bind(occurrence.project_id)
        .bind(occurrence.section_id)
        .bind(occurrence.completed)
        .bind(occurrence.completed_at)
        .bind(occurrence.created_at)
        .bind(occurrence.updated_at)
        .bind(occurrence.is_recurring)
        .bind(occurrence.pattern)
        .bind(custom_rule)
        .bind(occurrence.series_end)
        .bind(occurrence.remaining_count.map(i64::from))
        .bind(occurrence.lineage_parent_id)
        .execute(&mut **tx)
        .await
        .map_err(write_error)?;

        Ok(occurrence.id)
    }

    async fn update(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        let custom_rule = occurrence.custom_rule.as_ref().map(CustomRule::to_json).transpose()?;
        let mut guard = self.begin().await?;
        let tx = open(&mut guard)?;

        let result = sqlx::query(
            r#"UPDATE occurrences SET
                title = $1, notes = $2, due_at = $3, project_id = $4, section_id = $5,
                completed = $6, completed_at = $7, updated_at = $8, is_recurring = $9,
                pattern = $10, custom_rule = $11, series_end = $12, remaining_count = $13,
                lineage_parent_id = $14
            WHERE id = $15"#,
        )
        .bind(&occurrence.title)
        .bind(&occurrence.notes)
        .bind(occurrence.due_at)
        .bind(occurrence.project_id)
        .bind(occurrence.section_id)
        .bind(occurrence.completed)
        .bind(occurrence.completed_at)
        .bind(occurrence.updated_at)
        .bind(occurrence.is_recurring)
        .bind(occurrence.pattern)
        .bind(custom_rule)
        .bind(occurrence.series_end)
        .bind(occurrence.remaining_count.map(i64::from))
        .bind(occurrence.lineage_parent_id)
        .bind(occurrence.id)
        .execute(&mut **tx)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(occurrence.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let mut guard = self.begin().await?;
        let tx = open(&mut guard)?;

        let result = sqlx::query("DELETE FROM occurrences WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn save(&self) -> Result<(), CoreError> {
        if let Some(tx) = self.tx.lock().await.take() {
            tx.commit().await.map_err(write_error)?;
            debug!("committed store transaction");
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), CoreError> {
        if let Some(tx) = self.tx.lock().await.take() {
            warn!("rolling back store transaction");
            tx.rollback().await.map_err(write_error)?;
        }
        Ok(())
    }

    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Occurrence>, CoreError> {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        pattern.push_str(&prefix.to_lowercase());
        pattern.push('%');

        // Ids are stored as blobs; compare against their hyphenated text form.
        let sql = r#"SELECT * FROM occurrences WHERE lower(
                substr(hex(id), 1, 8) || '-' || substr(hex(id), 9, 4) || '-' ||
                substr(hex(id), 13, 4) || '-' || substr(hex(id), 17, 4) || '-' ||
                substr(hex(id), 21)
            ) LIKE $1"#;
        let mut guard = self.tx.lock().await;
        let rows: Vec<OccurrenceRow> = match guard.as_mut() {
            Some(tx) => sqlx::query_as(sql).bind(&pattern).fetch_all(&mut **tx).await,
            None => sqlx::query_as(sql).bind(&pattern).fetch_all(&self.pool).await,
        }
        .map_err(read_error)?;

        rows.into_iter().map(Occurrence::try_from).collect()
    }
}

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{commit, PropagationSummary, SeriesManager};
use crate::error::CoreError;
use crate::models::{CompletionResult, EditScope, NewOccurrenceData, Occurrence, UpdateOccurrenceData};
use crate::query::Query;
use crate::recurrence::{next_due, OccurrenceFactory};
use crate::store::OccurrenceStore;

/// Result of an edit.
#[derive(Debug)]
pub struct EditOutcome {
    pub occurrence: Occurrence,
    /// Present for [`EditScope::ThisAndFuture`] edits.
    pub propagation: Option<PropagationSummary>,
}

impl SeriesManager {
    /// Validates and stores a new occurrence.
    pub async fn create_occurrence(
        &self,
        data: NewOccurrenceData,
        store: &dyn OccurrenceStore,
    ) -> Result<Occurrence, CoreError> {
        let occurrence = data.into_occurrence(Utc::now())?;
        let staged = store.insert(&occurrence).await;
        commit(store, staged).await?;
        debug!(occurrence = %occurrence.id, "occurrence created");
        Ok(occurrence)
    }

    pub async fn complete_occurrence(&self, id: Uuid, store: &dyn OccurrenceStore) -> Result<CompletionResult, CoreError> {
        self.complete_occurrence_at(id, store, Utc::now()).await
    }

    /// Marks an occurrence completed. Completing the leading occurrence of a
    /// recurring chain also materializes its successor.
    #[instrument(skip(self, store))]
    pub async fn complete_occurrence_at(
        &self,
        id: Uuid,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<CompletionResult, CoreError> {
        let staged = self.complete_staged(id, store, now).await;
        let result = commit(store, staged).await?;
        if let CompletionResult::Recurring { next, .. } = &result {
            info!(next = %next.id, due = ?next.due_at, "next occurrence created");
        }
        Ok(result)
    }

    async fn complete_staged(
        &self,
        id: Uuid,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<CompletionResult, CoreError> {
        let mut occurrence = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        if occurrence.completed {
            return Err(CoreError::InvalidInput(format!(
                "Occurrence '{}' is already completed",
                occurrence.title
            )));
        }

        let next = if occurrence.has_active_rule() && occurrence.due_at.is_some() {
            let has_successor = !store.query(&Query::children_of(id)).await?.is_empty();
            if has_successor {
                None
            } else {
                Some(next_due(&occurrence, &self.calendar)?)
            }
        } else {
            None
        };

        occurrence.mark_completed(now);
        store.update(&occurrence).await?;

        match next {
            Some(Some(due)) => {
                let successor = OccurrenceFactory::materialize(&occurrence, due, now);
                store.insert(&successor).await?;
                Ok(CompletionResult::Recurring {
                    completed: occurrence,
                    next: successor,
                })
            }
            Some(None) => Ok(CompletionResult::SeriesEnded(occurrence)),
            None => Ok(CompletionResult::Single(occurrence)),
        }
    }

    pub async fn update_occurrence(
        &self,
        id: Uuid,
        data: UpdateOccurrenceData,
        scope: EditScope,
        store: &dyn OccurrenceStore,
    ) -> Result<EditOutcome, CoreError> {
        self.update_occurrence_at(id, data, scope, store, Utc::now()).await
    }

    /// Applies an edit to one occurrence, or to it and its pending future
    /// descendants. Everything commits together.
    #[instrument(skip(self, data, store))]
    pub async fn update_occurrence_at(
        &self,
        id: Uuid,
        data: UpdateOccurrenceData,
        scope: EditScope,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<EditOutcome, CoreError> {
        let staged = self.update_staged(id, data, scope, store, now).await;
        commit(store, staged).await
    }

    async fn update_staged(
        &self,
        id: Uuid,
        data: UpdateOccurrenceData,
        scope: EditScope,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<EditOutcome, CoreError> {
        let mut occurrence = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let touches_template = data.touches_template();
        data.apply_to(&mut occurrence, now)?;
        store.update(&occurrence).await?;

        let propagation = match scope {
            EditScope::ThisAndFuture if touches_template => {
                Some(self.propagate_staged(&occurrence, store, now).await?)
            }
            EditScope::ThisAndFuture => Some(PropagationSummary::default()),
            EditScope::ThisOccurrence => None,
        };

        Ok(EditOutcome {
            occurrence,
            propagation,
        })
    }
}

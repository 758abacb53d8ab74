use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Occurrence;

/// Builds successor occurrences. Never touches the store.
pub struct OccurrenceFactory;

impl OccurrenceFactory {
    /// Creates the occurrence that follows `source` on `due_at`.
    ///
    /// Template and recurrence fields are inherited; completion state is
    /// reset, the lineage points back at `source`, and the remaining budget
    /// drops by one (never below zero).
    pub fn materialize(source: &Occurrence, due_at: DateTime<Utc>, now: DateTime<Utc>) -> Occurrence {
        Occurrence {
            id: Uuid::now_v7(),
            title: source.title.clone(),
            notes: source.notes.clone(),
            due_at: Some(due_at),
            project_id: source.project_id,
            section_id: source.section_id,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
            is_recurring: source.is_recurring,
            pattern: source.pattern,
            custom_rule: source.custom_rule.clone(),
            series_end: source.series_end,
            remaining_count: source.remaining_count.map(|count| count.saturating_sub(1)),
            lineage_parent_id: Some(source.id),
        }
    }
}

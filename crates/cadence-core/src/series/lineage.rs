//! Traversal and deletion over the `lineage_parent_id` back-pointers.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{commit, DeletionSummary, SeriesManager};
use crate::error::CoreError;
use crate::models::{DeleteMode, Occurrence};
use crate::query::Query;
use crate::store::OccurrenceStore;

/// Walks parent pointers up to the first occurrence without a parent.
///
/// A parent id that no longer resolves ends the walk; the last occurrence
/// found is treated as the root.
pub async fn resolve_root(store: &dyn OccurrenceStore, occurrence: &Occurrence) -> Result<Occurrence, CoreError> {
    let mut visited = HashSet::from([occurrence.id]);
    let mut current = occurrence.clone();

    while let Some(parent_id) = current.lineage_parent_id {
        let Some(parent) = store.find_by_id(parent_id).await? else {
            debug!(occurrence = %current.id, parent = %parent_id, "dangling lineage parent");
            break;
        };
        if !visited.insert(parent.id) {
            return Err(CoreError::ChainCycle(parent.id));
        }
        current = parent;
    }

    Ok(current)
}

/// Every transitive descendant of `root`, in chain order.
///
/// Breadth-first by lineage depth; within one depth by due date (undated
/// last), then id.
pub async fn resolve_descendants(store: &dyn OccurrenceStore, root: &Occurrence) -> Result<Vec<Occurrence>, CoreError> {
    let mut visited = HashSet::from([root.id]);
    let mut frontier = vec![root.id];
    let mut descendants = Vec::new();

    while !frontier.is_empty() {
        let mut level = Vec::new();
        for id in frontier {
            for child in store.query(&Query::children_of(id)).await? {
                if !visited.insert(child.id) {
                    return Err(CoreError::ChainCycle(child.id));
                }
                level.push(child);
            }
        }
        level.sort_by_key(|o| (o.due_at.is_none(), o.due_at, o.id));
        frontier = level.iter().map(|o| o.id).collect();
        descendants.extend(level);
    }

    Ok(descendants)
}

/// The root of `occurrence`'s series followed by all of its descendants.
pub async fn resolve_series(store: &dyn OccurrenceStore, occurrence: &Occurrence) -> Result<Vec<Occurrence>, CoreError> {
    let root = resolve_root(store, occurrence).await?;
    let descendants = resolve_descendants(store, &root).await?;
    let mut series = Vec::with_capacity(descendants.len() + 1);
    series.push(root);
    series.extend(descendants);
    Ok(series)
}

impl SeriesManager {
    pub async fn resolve_root(&self, occurrence: &Occurrence, store: &dyn OccurrenceStore) -> Result<Occurrence, CoreError> {
        resolve_root(store, occurrence).await
    }

    pub async fn resolve_descendants(
        &self,
        root: &Occurrence,
        store: &dyn OccurrenceStore,
    ) -> Result<Vec<Occurrence>, CoreError> {
        resolve_descendants(store, root).await
    }

    pub async fn resolve_series(&self, occurrence: &Occurrence, store: &dyn OccurrenceStore) -> Result<Vec<Occurrence>, CoreError> {
        resolve_series(store, occurrence).await
    }

    /// Deletes the members of `occurrence`'s series due at or after `cutoff`,
    /// sparing `occurrence` itself, and takes one off the root's budget.
    ///
    /// All writes are committed together or not at all.
    #[instrument(skip_all, fields(occurrence = %occurrence.id))]
    pub async fn delete_future(
        &self,
        occurrence: &Occurrence,
        store: &dyn OccurrenceStore,
        cutoff: DateTime<Utc>,
    ) -> Result<DeletionSummary, CoreError> {
        let staged = delete_future_staged(occurrence, store, cutoff, Utc::now()).await;
        finish(store, staged).await
    }

    /// Deletes one occurrence, or it and its future series.
    #[instrument(skip(self, store))]
    pub async fn delete_occurrence(
        &self,
        id: Uuid,
        mode: DeleteMode,
        store: &dyn OccurrenceStore,
    ) -> Result<DeletionSummary, CoreError> {
        let occurrence = store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let staged = delete_occurrence_staged(&occurrence, mode, store, Utc::now()).await;
        finish(store, staged).await
    }
}

async fn finish(
    store: &dyn OccurrenceStore,
    staged: Result<DeletionSummary, CoreError>,
) -> Result<DeletionSummary, CoreError> {
    let summary = commit(store, staged).await?;
    info!(deleted = summary.deleted.len(), root = %summary.root_id, "deletion committed");
    Ok(summary)
}

/// Takes one occurrence off the root's count budget.
///
/// The budget lives on the root alone. A root without a count is unbounded,
/// so nothing is taken even when the deleted member carries a count of its
/// own; that count only describes the member's position in the chain.
async fn take_from_budget(
    root: &mut Occurrence,
    summary: &mut DeletionSummary,
    store: &dyn OccurrenceStore,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    if let Some(count) = root.remaining_count {
        root.remaining_count = Some(count.saturating_sub(1));
        root.updated_at = now;
        store.update(root).await?;
        summary.root_remaining_count = root.remaining_count;
    }
    Ok(())
}

async fn delete_future_staged(
    occurrence: &Occurrence,
    store: &dyn OccurrenceStore,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DeletionSummary, CoreError> {
    let series = resolve_series(store, occurrence).await?;
    let mut root = series[0].clone();

    let doomed: Vec<Uuid> = series
        .iter()
        .filter(|member| member.id != occurrence.id)
        .filter(|member| matches!(member.due_at, Some(due) if due >= cutoff))
        .map(|member| member.id)
        .collect();

    for id in &doomed {
        store.delete(*id).await?;
    }

    let mut summary = DeletionSummary {
        root_id: root.id,
        deleted: doomed,
        ..Default::default()
    };

    if !summary.deleted.contains(&root.id) {
        take_from_budget(&mut root, &mut summary, store, now).await?;
    }

    Ok(summary)
}

async fn delete_occurrence_staged(
    occurrence: &Occurrence,
    mode: DeleteMode,
    store: &dyn OccurrenceStore,
    now: DateTime<Utc>,
) -> Result<DeletionSummary, CoreError> {
    let mut summary = match mode {
        DeleteMode::ThisAndFuture => {
            let cutoff = occurrence.due_at.unwrap_or(now);
            delete_future_staged(occurrence, store, cutoff, now).await?
        }
        DeleteMode::ThisOccurrence => {
            let mut root = resolve_root(store, occurrence).await?;
            let mut summary = DeletionSummary {
                root_id: root.id,
                ..Default::default()
            };
            if root.id != occurrence.id {
                take_from_budget(&mut root, &mut summary, store, now).await?;
            }
            summary
        }
    };

    for mut child in store.query(&Query::children_of(occurrence.id)).await? {
        child.lineage_parent_id = occurrence.lineage_parent_id;
        child.updated_at = now;
        store.update(&child).await?;
        summary.relinked += 1;
    }

    store.delete(occurrence.id).await?;
    summary.deleted.push(occurrence.id);
    if summary.root_id == occurrence.id {
        summary.root_remaining_count = None;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pattern;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
    }

    /// Root plus `len - 1` weekly successors, each pointing at the previous one.
    fn chain(len: usize, remaining: Option<u32>) -> Vec<Occurrence> {
        let mut members: Vec<Occurrence> = Vec::with_capacity(len);
        for i in 0..len {
            members.push(Occurrence {
                title: format!("Week {}", i),
                due_at: Some(base() + Duration::weeks(i as i64)),
                is_recurring: true,
                pattern: Pattern::Weekly,
                remaining_count: remaining,
                lineage_parent_id: members.last().map(|m| m.id),
                ..Default::default()
            });
        }
        members
    }

    mod traversal_tests {
        use super::*;

        #[tokio::test]
        async fn test_resolve_root_and_descendants() {
            let members = chain(4, None);
            let store = MemoryStore::with_occurrences(members.clone());

            let root = resolve_root(&store, &members[3]).await.unwrap();
            assert_eq!(root.id, members[0].id);

            let descendants = resolve_descendants(&store, &root).await.unwrap();
            let ids: Vec<_> = descendants.iter().map(|o| o.id).collect();
            assert_eq!(ids, members[1..].iter().map(|o| o.id).collect::<Vec<_>>());

            let series = resolve_series(&store, &members[2]).await.unwrap();
            assert_eq!(series.len(), 4);
        }

        #[tokio::test]
        async fn test_siblings_ordered_by_due_date() {
            let root = chain(1, None).remove(0);
            let mk = |days: i64| Occurrence {
                title: "Sibling".to_string(),
                due_at: Some(base() + Duration::days(days)),
                lineage_parent_id: Some(root.id),
                ..Default::default()
            };
            let (late, early) = (mk(9), mk(2));
            let store = MemoryStore::with_occurrences([root.clone(), late.clone(), early.clone()]);

            let descendants = resolve_descendants(&store, &root).await.unwrap();
            assert_eq!(descendants[0].id, early.id);
            assert_eq!(descendants[1].id, late.id);
        }

        #[tokio::test]
        async fn test_cycle_is_reported() {
            let mut members = chain(3, None);
            members[0].lineage_parent_id = Some(members[2].id);
            let store = MemoryStore::with_occurrences(members.clone());

            assert!(matches!(
                resolve_root(&store, &members[1]).await,
                Err(CoreError::ChainCycle(_))
            ));
            assert!(matches!(
                resolve_descendants(&store, &members[0]).await,
                Err(CoreError::ChainCycle(_))
            ));
        }

        #[tokio::test]
        async fn test_dangling_parent_ends_walk() {
            let mut orphan = chain(1, None).remove(0);
            orphan.lineage_parent_id = Some(Uuid::now_v7());
            let store = MemoryStore::with_occurrences([orphan.clone()]);

            let root = resolve_root(&store, &orphan).await.unwrap();
            assert_eq!(root.id, orphan.id);
        }
    }

    mod deletion_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_future_keeps_history_and_decrements_once() {
            let members = chain(5, Some(6));
            let store = MemoryStore::with_occurrences(members.clone());
            let manager = SeriesManager::with_defaults();
            let target = &members[2];

            let summary = manager
                .delete_future(target, &store, target.due_at.unwrap())
                .await
                .unwrap();

            assert_eq!(summary.deleted, vec![members[3].id, members[4].id]);
            assert_eq!(summary.root_remaining_count, Some(5));
            assert_eq!(store.len().await, 3);
            let root = store.find_by_id(members[0].id).await.unwrap().unwrap();
            assert_eq!(root.remaining_count, Some(5));
            assert!(store.find_by_id(target.id).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn test_delete_future_floors_budget_at_zero() {
            let members = chain(2, Some(0));
            let store = MemoryStore::with_occurrences(members.clone());
            let summary = SeriesManager::with_defaults()
                .delete_future(&members[1], &store, members[1].due_at.unwrap())
                .await
                .unwrap();

            assert!(summary.deleted.is_empty());
            assert_eq!(summary.root_remaining_count, Some(0));
        }

        #[tokio::test]
        async fn test_delete_single_relinks_children() {
            let members = chain(3, Some(4));
            let store = MemoryStore::with_occurrences(members.clone());

            let summary = SeriesManager::with_defaults()
                .delete_occurrence(members[1].id, DeleteMode::ThisOccurrence, &store)
                .await
                .unwrap();

            assert_eq!(summary.deleted, vec![members[1].id]);
            assert_eq!(summary.relinked, 1);
            let last = store.find_by_id(members[2].id).await.unwrap().unwrap();
            assert_eq!(last.lineage_parent_id, Some(members[0].id));
            let root = store.find_by_id(members[0].id).await.unwrap().unwrap();
            assert_eq!(root.remaining_count, Some(3));
        }

        #[tokio::test]
        async fn test_unbounded_root_ignores_member_count() {
            let mut members = chain(3, None);
            members[1].remaining_count = Some(2);
            members[2].remaining_count = Some(1);
            let store = MemoryStore::with_occurrences(members.clone());

            let summary = SeriesManager::with_defaults()
                .delete_occurrence(members[1].id, DeleteMode::ThisOccurrence, &store)
                .await
                .unwrap();

            assert_eq!(summary.root_remaining_count, None);
            let root = store.find_by_id(members[0].id).await.unwrap().unwrap();
            assert_eq!(root, members[0]);
            let last = store.find_by_id(members[2].id).await.unwrap().unwrap();
            assert_eq!(last.remaining_count, Some(1));
        }

        #[tokio::test]
        async fn test_delete_this_and_future_removes_tail() {
            let members = chain(4, None);
            let store = MemoryStore::with_occurrences(members.clone());

            let summary = SeriesManager::with_defaults()
                .delete_occurrence(members[1].id, DeleteMode::ThisAndFuture, &store)
                .await
                .unwrap();

            assert_eq!(summary.deleted.len(), 3);
            assert_eq!(store.len().await, 1);
            assert!(store.find_by_id(members[0].id).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn test_delete_missing_occurrence() {
            let store = MemoryStore::new();
            let result = SeriesManager::with_defaults()
                .delete_occurrence(Uuid::now_v7(), DeleteMode::ThisOccurrence, &store)
                .await;
            assert!(matches!(result, Err(CoreError::NotFound(_))));
        }
    }
}

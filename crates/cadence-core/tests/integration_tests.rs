use async_trait::async_trait;
use cadence_core::db::establish_connection;
use cadence_core::error::CoreError;
use cadence_core::models::*;
use cadence_core::query::Query;
use cadence_core::series::{SeriesConfig, SeriesManager};
use cadence_core::store::{MemoryStore, OccurrenceStore, SqliteStore};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rstest::rstest;
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteStore, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    (SqliteStore::new(pool), temp_dir)
}

fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap()
}

fn recurring(title: &str, pattern: Pattern, due: DateTime<Utc>) -> Occurrence {
    Occurrence {
        title: title.to_string(),
        due_at: Some(due),
        is_recurring: true,
        pattern,
        ..Default::default()
    }
}

/// Pending members of the chain, oldest first.
async fn pending(store: &dyn OccurrenceStore) -> Vec<Occurrence> {
    let mut occurrences = store.query(&Query::pending_recurring()).await.unwrap();
    occurrences.sort_by_key(|o| o.due_at);
    occurrences
}

/// Wraps a store and fails writes touching selected occurrences.
struct FailingStore {
    inner: MemoryStore,
    poisoned_title: Option<String>,
    poisoned_update: Option<Uuid>,
}

impl FailingStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            poisoned_title: None,
            poisoned_update: None,
        }
    }
}

#[async_trait]
impl OccurrenceStore for FailingStore {
    async fn query(&self, query: &Query) -> Result<Vec<Occurrence>, CoreError> {
        self.inner.query(query).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        if self.poisoned_title.as_deref() == Some(occurrence.title.as_str()) {
            return Err(CoreError::StoreWrite("disk full".to_string()));
        }
        self.inner.insert(occurrence).await
    }

    async fn update(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        if self.poisoned_update == Some(occurrence.id) {
            return Err(CoreError::StoreWrite("row locked".to_string()));
        }
        self.inner.update(occurrence).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.inner.delete(id).await
    }

    async fn save(&self) -> Result<(), CoreError> {
        self.inner.save().await
    }

    async fn rollback(&self) -> Result<(), CoreError> {
        self.inner.rollback().await
    }
}

mod catch_up_tests {
    use super::*;

    async fn weekly_budget_scenario(store: &dyn OccurrenceStore) {
        let mut root = recurring("Team sync", Pattern::Weekly, clock() - Duration::days(14));
        root.remaining_count = Some(5);
        store.insert(&root).await.unwrap();
        store.save().await.unwrap();

        let summary = SeriesManager::with_defaults()
            .run_catch_up_at(store, clock())
            .await
            .unwrap();

        assert_eq!(summary.occurrences_created, 2);
        assert_eq!(summary.occurrences_completed, 2);
        assert!(summary.failures.is_empty());

        let all = store.query(&Query::All).await.unwrap();
        assert_eq!(all.len(), 3);

        let stored_root = store.find_by_id(root.id).await.unwrap().unwrap();
        assert!(stored_root.completed);
        assert_eq!(stored_root.completed_at, Some(clock()));

        let first = all
            .iter()
            .find(|o| o.lineage_parent_id == Some(root.id))
            .expect("first successor");
        assert!(first.completed);
        assert_eq!(first.remaining_count, Some(4));

        let leading = pending(store).await;
        assert_eq!(leading.len(), 1);
        assert_eq!(leading[0].due_at, Some(clock()));
        assert_eq!(leading[0].remaining_count, Some(3));
        assert_eq!(leading[0].lineage_parent_id, Some(first.id));
    }

    #[tokio::test]
    async fn test_weekly_chain_with_budget_in_memory() {
        weekly_budget_scenario(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_weekly_chain_with_budget_in_sqlite() {
        let (store, _temp_dir) = setup_test_db().await;
        weekly_budget_scenario(&store).await;
    }

    #[tokio::test]
    async fn test_custom_month_end_rule_clamps_and_recovers() {
        let mut root = recurring(
            "Pay rent",
            Pattern::Custom,
            Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap(),
        );
        root.custom_rule = Some(CustomRule::new(1, RecurrenceUnit::Month).on_day_of_month(31));
        let store = MemoryStore::with_occurrences([root]);
        let now = Utc.with_ymd_and_hms(2024, 4, 30, 12, 0, 0).unwrap();

        SeriesManager::with_defaults().run_catch_up_at(&store, now).await.unwrap();

        let mut all = store.query(&Query::All).await.unwrap();
        all.sort_by_key(|o| o.due_at);
        let dates: Vec<(u32, u32)> = all
            .iter()
            .filter_map(|o| o.due_at)
            .map(|d| (d.month(), d.day()))
            .collect();
        assert_eq!(dates, vec![(1, 31), (2, 29), (3, 31), (4, 30), (5, 31)]);
    }

    #[rstest]
    #[case::daily(Pattern::Daily)]
    #[case::weekdays(Pattern::Weekdays)]
    #[case::biweekly(Pattern::Biweekly)]
    #[case::yearly(Pattern::Yearly)]
    #[tokio::test]
    async fn test_second_run_is_idempotent(#[case] pattern: Pattern) {
        let root = recurring("Routine", pattern, clock() - Duration::days(400));
        let store = MemoryStore::with_occurrences([root]);
        let manager = SeriesManager::with_defaults();

        let first = manager.run_catch_up_at(&store, clock()).await.unwrap();
        assert!(first.occurrences_created > 0);
        let writes = store.write_count().await;
        let count = store.len().await;

        let second = manager.run_catch_up_at(&store, clock()).await.unwrap();
        assert_eq!(second.occurrences_created, 0);
        assert_eq!(store.write_count().await, writes);
        assert_eq!(store.len().await, count);
        assert_eq!(pending(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_chain_is_rolled_back_and_others_advance() {
        let poisoned = recurring("Poison", Pattern::Daily, clock() - Duration::days(3));
        let healthy = recurring("Healthy", Pattern::Daily, clock() - Duration::days(3));
        let mut store = FailingStore::new(MemoryStore::with_occurrences([poisoned.clone(), healthy.clone()]));
        store.poisoned_title = Some("Poison".to_string());

        let summary = SeriesManager::with_defaults()
            .run_catch_up_at(&store, clock())
            .await
            .unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].occurrence_id, poisoned.id);
        assert!(summary.failures[0].error.is_store_failure());
        assert_eq!(summary.store_failures(), 1);
        assert_eq!(summary.chains_advanced, 1);

        let untouched = store.find_by_id(poisoned.id).await.unwrap().unwrap();
        assert_eq!(untouched, poisoned);
        assert!(store.find_by_id(healthy.id).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_catch_up_in_local_timezone_keeps_wall_clock() {
        let manager = SeriesManager::new(SeriesConfig {
            timezone: "Europe/Berlin".to_string(),
        })
        .unwrap();
        // 08:00 CET on Saturday 29 March; DST starts the next day.
        let due = Utc.with_ymd_and_hms(2025, 3, 29, 7, 0, 0).unwrap();
        let store = MemoryStore::with_occurrences([recurring("Run", Pattern::Daily, due)]);
        let now = Utc.with_ymd_and_hms(2025, 3, 30, 12, 0, 0).unwrap();

        manager.run_catch_up_at(&store, now).await.unwrap();

        let leading = pending(&store).await;
        // 08:00 CEST on Monday 31 March.
        assert_eq!(leading[0].due_at, Some(Utc.with_ymd_and_hms(2025, 3, 31, 6, 0, 0).unwrap()));
    }
}

mod propagation_tests {
    use super::*;

    /// Root due yesterday plus three weekly descendants in the future.
    fn future_series() -> Vec<Occurrence> {
        let mut members: Vec<Occurrence> = Vec::new();
        for week in 0..4 {
            let mut occurrence = recurring(
                "Plan week",
                Pattern::Weekly,
                clock() - Duration::days(1) + Duration::weeks(week),
            );
            occurrence.lineage_parent_id = members.last().map(|m| m.id);
            members.push(occurrence);
        }
        members
    }

    #[tokio::test]
    async fn test_title_edit_keeps_due_dates() {
        let members = future_series();
        let store = MemoryStore::with_occurrences(members.clone());
        let mut root = members[0].clone();
        root.title = "Plan the week ahead".to_string();
        root.notes = Some("Check calendar first".to_string());

        let summary = SeriesManager::with_defaults()
            .propagate_at(&root, &store, clock())
            .await
            .unwrap();

        assert_eq!(summary.updated, 3);
        assert_eq!(summary.rescheduled, 0);
        for member in &members[1..] {
            let stored = store.find_by_id(member.id).await.unwrap().unwrap();
            assert_eq!(stored.title, "Plan the week ahead");
            assert_eq!(stored.notes.as_deref(), Some("Check calendar first"));
            assert_eq!(stored.due_at, member.due_at);
        }
    }

    #[tokio::test]
    async fn test_descendant_write_failure_is_isolated() {
        let members = future_series();
        let mut store = FailingStore::new(MemoryStore::with_occurrences(members.clone()));
        store.poisoned_update = Some(members[2].id);
        let mut root = members[0].clone();
        root.title = "Renamed".to_string();

        let summary = SeriesManager::with_defaults()
            .propagate_at(&root, &store, clock())
            .await
            .unwrap();

        assert_eq!(summary.updated, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].occurrence_id, members[2].id);
        let stored = store.find_by_id(members[3].id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
    }

    #[tokio::test]
    async fn test_cycle_aborts_propagation() {
        let mut members = future_series();
        members[0].lineage_parent_id = Some(members[3].id);
        let store = MemoryStore::with_occurrences(members.clone());

        let result = SeriesManager::with_defaults()
            .propagate_at(&members[0], &store, clock())
            .await;

        assert!(matches!(result, Err(CoreError::ChainCycle(_))));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_scoped_edit_reschedules_in_sqlite() {
        let (store, _temp_dir) = setup_test_db().await;
        let members = future_series();
        for member in &members {
            store.insert(member).await.unwrap();
        }
        store.save().await.unwrap();

        let data = UpdateOccurrenceData {
            pattern: Some(Pattern::Biweekly),
            ..Default::default()
        };
        let outcome = SeriesManager::with_defaults()
            .update_occurrence_at(members[0].id, data, EditScope::ThisAndFuture, &store, clock())
            .await
            .unwrap();

        assert_eq!(outcome.propagation.map(|p| p.rescheduled), Some(3));
        let start = members[0].due_at.unwrap();
        for (i, member) in members.iter().enumerate().skip(1) {
            let stored = store.find_by_id(member.id).await.unwrap().unwrap();
            assert_eq!(stored.pattern, Pattern::Biweekly);
            assert_eq!(stored.due_at, Some(start + Duration::weeks(2 * i as i64)));
        }
    }

    #[tokio::test]
    async fn test_scoped_end_date_edit_reports_unreachable_members() {
        let (store, _temp_dir) = setup_test_db().await;
        let members = future_series();
        for member in &members {
            store.insert(member).await.unwrap();
        }
        store.save().await.unwrap();

        let start = members[0].due_at.unwrap();
        let data = UpdateOccurrenceData {
            series_end: Some(Some(start + Duration::days(8))),
            ..Default::default()
        };
        let outcome = SeriesManager::with_defaults()
            .update_occurrence_at(members[0].id, data, EditScope::ThisAndFuture, &store, clock())
            .await
            .unwrap();

        let propagation = outcome.propagation.unwrap();
        assert_eq!(propagation.beyond_end, vec![members[2].id, members[3].id]);
        assert_eq!(propagation.rescheduled, 0);
        let trailing = store.find_by_id(members[3].id).await.unwrap().unwrap();
        assert_eq!(trailing.due_at, members[3].due_at);
        assert_eq!(trailing.series_end, Some(start + Duration::days(8)));
        assert_eq!(store.query(&Query::All).await.unwrap().len(), 4);
    }
}

mod lineage_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_future_at_own_due_date() {
        let start = clock() - Duration::weeks(2);
        let mut members: Vec<Occurrence> = Vec::new();
        for week in 0..5 {
            let mut occurrence = recurring("Gym", Pattern::Weekly, start + Duration::weeks(week));
            occurrence.completed = week < 2;
            occurrence.remaining_count = Some(8 - week as u32);
            occurrence.lineage_parent_id = members.last().map(|m| m.id);
            members.push(occurrence);
        }
        let (store, _temp_dir) = setup_test_db().await;
        for member in &members {
            store.insert(member).await.unwrap();
        }
        store.save().await.unwrap();

        let target = &members[2];
        let summary = SeriesManager::with_defaults()
            .delete_future(target, &store, target.due_at.unwrap())
            .await
            .unwrap();

        assert_eq!(summary.deleted, vec![members[3].id, members[4].id]);
        let remaining = store.query(&Query::All).await.unwrap();
        let ids: Vec<Uuid> = remaining.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![members[0].id, members[1].id, members[2].id]);

        let root = store.find_by_id(members[0].id).await.unwrap().unwrap();
        assert_eq!(root.remaining_count, Some(7));
        assert!(root.completed);
    }

    #[tokio::test]
    async fn test_resolve_series_from_any_member() {
        let root = recurring("Read", Pattern::Daily, clock());
        let mut child = recurring("Read", Pattern::Daily, clock() + Duration::days(1));
        child.lineage_parent_id = Some(root.id);
        let mut grandchild = recurring("Read", Pattern::Daily, clock() + Duration::days(2));
        grandchild.lineage_parent_id = Some(child.id);
        let store = MemoryStore::with_occurrences([grandchild.clone(), root.clone(), child.clone()]);
        let manager = SeriesManager::with_defaults();

        let series = manager.resolve_series(&grandchild, &store).await.unwrap();
        let ids: Vec<Uuid> = series.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![root.id, child.id, grandchild.id]);

        let found_root = manager.resolve_root(&child, &store).await.unwrap();
        assert_eq!(found_root.id, root.id);
    }
}

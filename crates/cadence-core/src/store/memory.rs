use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::OccurrenceStore;
use crate::error::CoreError;
use crate::models::Occurrence;
use crate::query::Query;

#[derive(Default)]
struct State {
    committed: BTreeMap<Uuid, Occurrence>,
    /// Copy-on-write view holding uncommitted changes.
    working: Option<BTreeMap<Uuid, Occurrence>>,
    writes: usize,
    commits: usize,
}

impl State {
    fn view(&self) -> &BTreeMap<Uuid, Occurrence> {
        self.working.as_ref().unwrap_or(&self.committed)
    }

    fn staged(&mut self) -> &mut BTreeMap<Uuid, Occurrence> {
        let committed = &self.committed;
        self.working.get_or_insert_with(|| committed.clone())
    }
}

/// In-process store, mainly for tests and previews.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose committed state already holds `occurrences`.
    pub fn with_occurrences(occurrences: impl IntoIterator<Item = Occurrence>) -> Self {
        let committed = occurrences.into_iter().map(|o| (o.id, o)).collect();
        Self {
            state: Mutex::new(State {
                committed,
                ..Default::default()
            }),
        }
    }

    /// Inserts, updates and deletes performed so far.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// Successful `save` calls that committed staged changes.
    pub async fn commit_count(&self) -> usize {
        self.state.lock().await.commits
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.view().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OccurrenceStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Occurrence>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .view()
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let state = self.state.lock().await;
        Ok(state.view().get(&id).cloned())
    }

    async fn insert(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        let mut state = self.state.lock().await;
        if state.view().contains_key(&occurrence.id) {
            return Err(CoreError::StoreWrite(format!(
                "occurrence {} already exists",
                occurrence.id
            )));
        }
        state.staged().insert(occurrence.id, occurrence.clone());
        state.writes += 1;
        Ok(occurrence.id)
    }

    async fn update(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if !state.view().contains_key(&occurrence.id) {
            return Err(CoreError::NotFound(occurrence.id.to_string()));
        }
        state.staged().insert(occurrence.id, occurrence.clone());
        state.writes += 1;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if !state.view().contains_key(&id) {
            return Err(CoreError::NotFound(id.to_string()));
        }
        state.staged().remove(&id);
        state.writes += 1;
        Ok(())
    }

    async fn save(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if let Some(working) = state.working.take() {
            state.committed = working;
            state.commits += 1;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), CoreError> {
        self.state.lock().await.working = None;
        Ok(())
    }
}

use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::Occurrence;
use cadence_core::store::OccurrenceStore;

/// Resolves a full id or an id prefix to exactly one occurrence.
pub async fn resolve_occurrence(store: &dyn OccurrenceStore, short_id: &str) -> Result<Occurrence> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let mut occurrences = store.find_by_id_prefix(short_id).await?;
    if occurrences.len() == 1 {
        Ok(occurrences.remove(0))
    } else if occurrences.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No occurrence found with ID prefix '{}'",
            short_id
        ))))
    } else {
        let candidates: Vec<(String, String)> = occurrences
            .into_iter()
            .map(|o| (o.id.to_string(), o.title))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(candidates)))
    }
}

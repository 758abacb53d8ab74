use anyhow::Result;
use cadence_core::query::{Filter, Query};
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;

use crate::cli::ListCommand;
use crate::views::table::display_occurrences;

/// Builds the store query for the list flags; pending occurrences by default.
pub fn build_query(command: &ListCommand) -> Query {
    let mut query = Query::All;
    if !command.all {
        query = query.and(Query::filter(Filter::Completed(false)));
    }
    if command.recurring {
        query = query.and(Query::filter(Filter::Recurring(true)));
    }
    if let Some(text) = &command.search {
        query = query.and(Query::filter(Filter::TitleContains(text.clone())));
    }
    query
}

pub async fn list_occurrences(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: ListCommand,
) -> Result<()> {
    let occurrences = store.query(&build_query(&command)).await?;
    display_occurrences(&occurrences, manager.calendar());
    Ok(())
}

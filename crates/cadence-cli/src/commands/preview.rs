use anyhow::Result;
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;

use crate::cli::PreviewCommand;
use crate::util::resolve_occurrence;
use crate::views::table::display_preview;

pub async fn preview_series(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: PreviewCommand,
    default_count: usize,
) -> Result<()> {
    let occurrence = resolve_occurrence(store, &command.id).await?;
    let dates = manager.preview(&occurrence, command.count.unwrap_or(default_count))?;
    display_preview(&occurrence, &dates, manager.calendar());
    Ok(())
}

use anyhow::Result;
use cadence_core::series::{CatchUpSummary, SeriesManager};
use cadence_core::store::OccurrenceStore;
use owo_colors::OwoColorize;
use tracing::info;

pub async fn catch_up(manager: &SeriesManager, store: &dyn OccurrenceStore) -> Result<()> {
    let summary = manager.run_catch_up(store).await?;

    if summary.occurrences_created == 0 {
        println!("All recurring series are up to date.");
    } else {
        println!(
            "Caught up {} series: {} occurrence(s) created, {} completed.",
            summary.chains_advanced, summary.occurrences_created, summary.occurrences_completed
        );
    }
    if summary.exhausted > 0 {
        println!("{} overdue series have ended.", summary.exhausted);
    }
    report_failures(&summary);

    Ok(())
}

/// Catch-up before a command: silent unless something went wrong.
pub async fn catch_up_quietly(manager: &SeriesManager, store: &dyn OccurrenceStore) -> Result<()> {
    let summary = manager.run_catch_up(store).await?;
    info!(
        created = summary.occurrences_created,
        exhausted = summary.exhausted,
        duration_ms = summary.duration_ms,
        "startup catch-up finished"
    );
    report_failures(&summary);
    Ok(())
}

fn report_failures(summary: &CatchUpSummary) {
    for failure in &summary.failures {
        eprintln!(
            "{} series at {} could not be caught up: {}",
            "Warning:".yellow().bold(),
            failure.occurrence_id,
            failure.error
        );
    }
    let store_failures = summary.store_failures();
    if store_failures > 0 {
        eprintln!(
            "{} series hit a storage error and will be retried on the next run.",
            store_failures
        );
    }
}

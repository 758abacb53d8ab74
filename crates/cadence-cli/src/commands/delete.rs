use anyhow::Result;
use cadence_core::models::DeleteMode;
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;
use crate::util::resolve_occurrence;

pub async fn delete_occurrence(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: DeleteCommand,
) -> Result<()> {
    let occurrence = resolve_occurrence(store, &command.id).await?;
    let mode = if command.future {
        DeleteMode::ThisAndFuture
    } else {
        DeleteMode::ThisOccurrence
    };

    if !command.force {
        let prompt = match mode {
            DeleteMode::ThisOccurrence => format!("Are you sure you want to delete '{}'?", occurrence.title),
            DeleteMode::ThisAndFuture => format!(
                "Are you sure you want to delete '{}' and every later occurrence of its series?",
                occurrence.title
            ),
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let summary = manager.delete_occurrence(occurrence.id, mode, store).await?;
    println!("Deleted {} occurrence(s).", summary.deleted.len());
    if let Some(remaining) = summary.root_remaining_count {
        println!("The series can produce {} more occurrence(s).", remaining);
    }

    Ok(())
}

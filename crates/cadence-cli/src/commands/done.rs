use anyhow::Result;
use cadence_core::models::CompletionResult;
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;
use cadence_core::timezone::format_with_timezone;

use crate::cli::DoneCommand;
use crate::util::resolve_occurrence;

pub async fn complete_occurrence(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: DoneCommand,
) -> Result<()> {
    let occurrence = resolve_occurrence(store, &command.id).await?;

    match manager.complete_occurrence(occurrence.id, store).await? {
        CompletionResult::Single(completed) => {
            println!("Completed: '{}'", completed.title);
        }
        CompletionResult::Recurring { completed, next } => {
            println!("Completed: '{}'", completed.title);
            match next.due_at {
                Some(due_at) => println!(
                    "Next occurrence '{}' due {} ({})",
                    next.title,
                    format_with_timezone(due_at, manager.calendar(), "%Y-%m-%d %H:%M %Z"),
                    next.id
                ),
                None => println!("Next occurrence '{}' ({})", next.title, next.id),
            }
        }
        CompletionResult::SeriesEnded(completed) => {
            println!("Completed: '{}'", completed.title);
            println!("The series has ended; no further occurrences.");
        }
    }

    Ok(())
}

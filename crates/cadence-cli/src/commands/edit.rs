use std::io::IsTerminal;

use anyhow::Result;
use cadence_core::models::{EditScope, Occurrence, Pattern, UpdateOccurrenceData};
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;
use dialoguer::Select;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::parser::{parse_due_date, parse_rule};
use crate::util::resolve_occurrence;

pub async fn edit_occurrence(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: EditCommand,
) -> Result<()> {
    let occurrence = resolve_occurrence(store, &command.id).await?;
    let scope: EditScope = match command.scope {
        Some(scope) => scope.into(),
        None if occurrence.is_recurring && std::io::stdin().is_terminal() => prompt_scope(&occurrence)?,
        None => EditScope::ThisOccurrence,
    };
    let data = build_update(&command, manager)?;

    let outcome = manager.update_occurrence(occurrence.id, data, scope, store).await?;

    println!("Updated '{}' ({})", outcome.occurrence.title, outcome.occurrence.id);
    if let Some(summary) = outcome.propagation {
        println!(
            "  {} future occurrence(s) updated, {} rescheduled",
            summary.updated, summary.rescheduled
        );
        if !summary.beyond_end.is_empty() {
            println!(
                "  {}",
                format!(
                    "{} occurrence(s) now fall past the end of the series and were kept",
                    summary.beyond_end.len()
                )
                .yellow()
            );
        }
        for failure in &summary.failures {
            eprintln!(
                "  {} {}: {}",
                "Warning:".yellow().bold(),
                failure.occurrence_id,
                failure.error
            );
        }
    }

    Ok(())
}

fn prompt_scope(occurrence: &Occurrence) -> Result<EditScope> {
    let options = vec![
        format!(
            "This occurrence only ({})",
            occurrence
                .due_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "No due date".to_string())
        ),
        "This and future occurrences".to_string(),
    ];

    println!("{}", "This occurrence is part of a recurring series.".yellow());
    let selection = Select::new()
        .with_prompt("How would you like to apply your changes?")
        .items(&options)
        .default(0)
        .interact()?;

    Ok(match selection {
        1 => EditScope::ThisAndFuture,
        _ => EditScope::ThisOccurrence,
    })
}

/// Translates the edit flags into field edits.
pub fn build_update(command: &EditCommand, manager: &SeriesManager) -> Result<UpdateOccurrenceData> {
    let calendar = manager.calendar();

    let notes = if command.notes_clear {
        Some(None)
    } else {
        command.notes.clone().map(Some)
    };

    let due_at = if command.due_clear {
        Some(None)
    } else if let Some(due) = &command.due {
        Some(Some(parse_due_date(due, calendar)?))
    } else {
        None
    };

    let (pattern, custom_rule) = if command.no_recurrence {
        (Some(Pattern::None), Some(None))
    } else {
        match parse_rule(&command.rule)? {
            Some((pattern, rule)) => (Some(pattern), Some(rule)),
            None => (None, None),
        }
    };

    let series_end = if command.until_clear {
        Some(None)
    } else if let Some(until) = &command.until {
        Some(Some(parse_due_date(until, calendar)?))
    } else {
        None
    };

    let remaining_count = if command.count_clear {
        Some(None)
    } else {
        command.count.map(Some)
    };

    Ok(UpdateOccurrenceData {
        title: command.title.clone(),
        notes,
        due_at,
        pattern,
        custom_rule,
        series_end,
        remaining_count,
        ..Default::default()
    })
}

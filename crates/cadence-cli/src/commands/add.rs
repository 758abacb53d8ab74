use anyhow::Result;
use cadence_core::models::NewOccurrenceData;
use cadence_core::series::SeriesManager;
use cadence_core::store::OccurrenceStore;
use cadence_core::timezone::format_with_timezone;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::{parse_due_date, parse_rule};
use crate::views::table::describe_rule;

pub async fn add_occurrence(
    manager: &SeriesManager,
    store: &dyn OccurrenceStore,
    command: AddCommand,
) -> Result<()> {
    let calendar = manager.calendar();
    let due_at = command.due.as_deref().map(|d| parse_due_date(d, calendar)).transpose()?;
    let series_end = command.until.as_deref().map(|d| parse_due_date(d, calendar)).transpose()?;
    let (pattern, custom_rule) = match parse_rule(&command.rule)? {
        Some((pattern, rule)) => (Some(pattern), rule),
        None => (None, None),
    };

    let data = NewOccurrenceData {
        title: command.title,
        notes: command.notes,
        due_at,
        pattern,
        custom_rule,
        series_end,
        remaining_count: command.count,
        ..Default::default()
    };
    let occurrence = manager.create_occurrence(data, store).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    if occurrence.is_recurring {
        println!(
            "{} Created recurring occurrence: {}",
            "✓".style(success_style),
            occurrence.title.bright_white().bold()
        );
        println!("  {} Repeats: {}", "→".style(info_style), describe_rule(&occurrence).cyan());
    } else {
        println!(
            "{} Created occurrence: {}",
            "✓".style(success_style),
            occurrence.title.bright_white().bold()
        );
    }
    println!("  {} ID: {}", "→".style(info_style), occurrence.id.to_string().yellow());
    if let Some(due_at) = occurrence.due_at {
        println!(
            "  {} Due: {}",
            "→".style(info_style),
            format_with_timezone(due_at, calendar, "%Y-%m-%d %H:%M %Z").cyan()
        );
    }

    Ok(())
}

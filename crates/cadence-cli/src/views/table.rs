use cadence_core::models::{Occurrence, Pattern};
use cadence_core::timezone::{format_with_timezone, Calendar};
use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};

const DATE_FORMAT: &str = "%a %Y-%m-%d %H:%M";

/// Human readable summary of an occurrence's repetition.
pub fn describe_rule(occurrence: &Occurrence) -> String {
    if !occurrence.is_recurring || occurrence.pattern == Pattern::None {
        return String::new();
    }
    let mut text = match (&occurrence.pattern, &occurrence.custom_rule) {
        (Pattern::Custom, Some(rule)) => {
            let mut text = if rule.frequency == 1 {
                format!("every {}", rule.unit)
            } else {
                format!("every {} {}s", rule.frequency, rule.unit)
            };
            if let Some(days) = rule.days_of_week.filter(|d| !d.is_empty()) {
                let names: Vec<&str> = days.day_numbers().into_iter().map(day_name).collect();
                text.push_str(&format!(" on {}", names.join(", ")));
            }
            if let Some(day) = rule.day_of_month {
                text.push_str(&format!(" on day {}", day));
            }
            text
        }
        (pattern, _) => pattern.to_string(),
    };
    if let Some(count) = occurrence.remaining_count {
        text.push_str(&format!(", {} left", count));
    }
    if let Some(end) = occurrence.series_end {
        text.push_str(&format!(", until {}", end.format("%Y-%m-%d")));
    }
    text
}

fn day_name(number: u8) -> &'static str {
    match number {
        1 => "Sun",
        2 => "Mon",
        3 => "Tue",
        4 => "Wed",
        5 => "Thu",
        6 => "Fri",
        _ => "Sat",
    }
}

pub fn display_occurrences(occurrences: &[Occurrence], calendar: &Calendar) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Due", "Repeats", "Status"]);

    let now = Utc::now();
    let today = calendar.local_date(now);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(occurrence.id));

        let mut display_title = String::new();
        if occurrence.is_recurring {
            display_title.push('↻');
            display_title.push(' ');
        }
        display_title.push_str(&occurrence.title);
        let mut title_cell = Cell::new(display_title);
        if occurrence.completed {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);

        let due_cell = match occurrence.due_at {
            Some(due_at) => {
                let due_text = format!(
                    "{} ({})",
                    format_with_timezone(due_at, calendar, DATE_FORMAT),
                    due_at.humanize()
                );
                if occurrence.completed {
                    Cell::new(due_text)
                } else if due_at < now {
                    Cell::new(due_text).fg(Color::Red) // Overdue
                } else if calendar.local_date(due_at) == today {
                    Cell::new(due_text).fg(Color::Yellow) // Due today
                } else {
                    Cell::new(due_text)
                }
            }
            None => Cell::new("None"),
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(describe_rule(occurrence)));

        let status_cell = if occurrence.completed {
            Cell::new("Completed").fg(Color::Green)
        } else {
            Cell::new("Pending")
        };
        row.add_cell(status_cell);
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_preview(occurrence: &Occurrence, dates: &[DateTime<Utc>], calendar: &Calendar) {
    if dates.is_empty() {
        println!("'{}' has no upcoming dates.", occurrence.title);
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Due", "In"]);
    for (index, due_at) in dates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(format_with_timezone(*due_at, calendar, DATE_FORMAT)),
            Cell::new(due_at.humanize()),
        ]);
    }

    println!("Upcoming for '{}' ({}):", occurrence.title, describe_rule(occurrence));
    println!("{table}");
}

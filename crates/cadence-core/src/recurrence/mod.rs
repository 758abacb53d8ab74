//! Date resolution for recurring occurrences.
//!
//! - [`pattern`]: built-in patterns (`Pattern::next_date`)
//! - [`custom`]: user-defined rules (`CustomRule::next_date`)
//! - [`factory`]: successor construction
//!
//! The free functions here lift calendar-date resolution to due instants and
//! apply a series' end conditions.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::Occurrence;
use crate::timezone::Calendar;

pub mod custom;
pub mod factory;
pub mod pattern;

pub use factory::OccurrenceFactory;

/// Due instant of the occurrence that would follow `occurrence`.
///
/// Returns `None` when the occurrence has no due date, no active rule, an
/// exhausted budget, or when the next date falls after the series end.
pub fn next_due(occurrence: &Occurrence, calendar: &Calendar) -> Result<Option<DateTime<Utc>>, CoreError> {
    match occurrence.due_at {
        Some(anchor) => next_due_after(occurrence, anchor, calendar),
        None => Ok(None),
    }
}

/// Like [`next_due`], stepping from an explicit anchor with `rules`' settings.
pub fn next_due_after(
    rules: &Occurrence,
    anchor: DateTime<Utc>,
    calendar: &Calendar,
) -> Result<Option<DateTime<Utc>>, CoreError> {
    if !rules.has_active_rule() || rules.remaining_count == Some(0) {
        return Ok(None);
    }

    let from = calendar.local_date(anchor);
    let Some(next_date) = rules.pattern.next_date(rules.custom_rule.as_ref(), from)? else {
        return Ok(None);
    };
    let next = calendar.with_date(anchor, next_date);

    if next <= anchor {
        return Err(CoreError::InvalidRule(format!(
            "rule '{}' did not advance past {}",
            rules.pattern, anchor
        )));
    }
    if matches!(rules.series_end, Some(end) if next > end) {
        return Ok(None);
    }
    Ok(Some(next))
}

/// Upcoming due instants the chain starting at `occurrence` would produce.
pub fn preview(occurrence: &Occurrence, count: usize, calendar: &Calendar) -> Result<Vec<DateTime<Utc>>, CoreError> {
    let mut dates = Vec::with_capacity(count.min(64));
    let mut current = occurrence.clone();

    while dates.len() < count {
        let Some(next) = next_due(&current, calendar)? else {
            break;
        };
        dates.push(next);
        current.due_at = Some(next);
        current.remaining_count = current.remaining_count.map(|c| c.saturating_sub(1));
    }

    Ok(dates)
}

use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::{CustomRule, Pattern, RecurrenceUnit};
use cadence_core::timezone::Calendar;
use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};

use crate::cli::RuleArgs;

/// Parses a due date, reading wall-clock times in the calendar's timezone.
///
/// `YYYY-MM-DD HH:MM` and RFC 3339 are read exactly; anything else goes
/// through the English date parser relative to now.
pub fn parse_due_date(date_str: &str, calendar: &Calendar) -> Result<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(local) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M") {
        return Ok(calendar.resolve_local(local.date(), local.time()));
    }

    let now = Utc::now().with_timezone(&calendar.timezone());
    parse_date_string(date_str, now, Dialect::Us)
        .map(|local| local.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", date_str, e))
}

/// Parses a comma separated weekday list such as `mon,wed,fri`.
pub fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|day| {
            day.parse::<Weekday>()
                .map_err(|_| anyhow!(CoreError::InvalidInput(format!("Unknown weekday '{}'", day))))
        })
        .collect()
}

/// Turns the repetition flags into a pattern and, for custom rules, the rule.
/// Returns `None` when no repetition flag was given.
pub fn parse_rule(args: &RuleArgs) -> Result<Option<(Pattern, Option<CustomRule>)>> {
    if let Some(every) = args.every {
        return Ok(Some((every.into(), None)));
    }
    let Some(interval) = args.interval else {
        return Ok(None);
    };
    if interval == 0 {
        return Err(anyhow!(CoreError::InvalidRule(
            "Interval must be at least 1".to_string()
        )));
    }
    let unit: RecurrenceUnit = args
        .unit
        .ok_or_else(|| anyhow!(CoreError::InvalidInput("--interval needs --unit".to_string())))?
        .into();

    let mut rule = CustomRule::new(interval, unit);
    if let Some(days) = &args.on {
        let days = parse_weekdays(days)?;
        if days.is_empty() {
            return Err(anyhow!(CoreError::InvalidRule("Empty weekday list".to_string())));
        }
        rule = rule.on_days(days);
    }
    if let Some(day) = args.day_of_month {
        if !(1..=31).contains(&day) {
            return Err(anyhow!(CoreError::InvalidRule(format!(
                "Day of month must be between 1 and 31, got {}",
                day
            ))));
        }
        rule = rule.on_day_of_month(day);
    }
    Ok(Some((Pattern::Custom, Some(rule))))
}

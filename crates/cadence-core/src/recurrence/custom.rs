use chrono::{Datelike, Days, Months, NaiveDate};

use crate::error::CoreError;
use crate::models::{CustomRule, RecurrenceUnit};

impl CustomRule {
    /// Rejects rules that cannot advance a date or name impossible days.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.frequency == 0 {
            return Err(CoreError::InvalidRule(
                "frequency must be at least 1".to_string(),
            ));
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(CoreError::InvalidRule(format!(
                    "day of month {} is outside 1-31",
                    day
                )));
            }
        }
        if let Some(week) = self.week_of_month {
            if !(1..=5).contains(&week) {
                return Err(CoreError::InvalidRule(format!(
                    "week of month {} is outside 1-5",
                    week
                )));
            }
        }
        if let Some(month) = self.month_of_year {
            if !(1..=12).contains(&month) {
                return Err(CoreError::InvalidRule(format!(
                    "month of year {} is outside 1-12",
                    month
                )));
            }
        }
        Ok(())
    }

    /// Next calendar date after `from` under this rule.
    pub fn next_date(&self, from: NaiveDate) -> Result<Option<NaiveDate>, CoreError> {
        self.validate()?;
        let frequency = self.frequency;

        let next = match self.unit {
            RecurrenceUnit::Day => from.checked_add_days(Days::new(u64::from(frequency))),
            RecurrenceUnit::Week => match self.days_of_week {
                Some(days) if !days.is_empty() => {
                    let window = 7 * u64::from(frequency);
                    (1..=window)
                        .filter_map(|offset| from.checked_add_days(Days::new(offset)))
                        .find(|candidate| days.contains(candidate.weekday()))
                        .or_else(|| from.checked_add_days(Days::new(window)))
                }
                _ => from.checked_add_days(Days::new(7 * u64::from(frequency))),
            },
            RecurrenceUnit::Month => match self.day_of_month {
                Some(day) => pinned_day(from, frequency, day),
                None => from.checked_add_months(Months::new(frequency)),
            },
            RecurrenceUnit::Year => frequency
                .checked_mul(12)
                .and_then(|months| from.checked_add_months(Months::new(months))),
        };
        Ok(next)
    }
}

/// `day` of the month `months` after `from`, clamped to that month's length.
fn pinned_day(from: NaiveDate, months: u32, day: u32) -> Option<NaiveDate> {
    let target_first = from.with_day(1)?.checked_add_months(Months::new(months))?;
    let last_day = days_in_month(target_first)?;
    target_first.with_day(day.min(last_day))
}

fn days_in_month(first_of_month: NaiveDate) -> Option<u32> {
    first_of_month
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|last| last.day())
}

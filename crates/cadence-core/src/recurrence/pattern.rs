use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::error::CoreError;
use crate::models::{CustomRule, Pattern};

impl Pattern {
    /// Next calendar date after `from` for this pattern.
    ///
    /// `Custom` delegates to `rule`; a missing rule disables recurrence and
    /// yields `None`, as does stepping outside chrono's date range.
    pub fn next_date(
        &self,
        rule: Option<&CustomRule>,
        from: NaiveDate,
    ) -> Result<Option<NaiveDate>, CoreError> {
        let next = match self {
            Pattern::None => None,
            Pattern::Daily => from.checked_add_days(Days::new(1)),
            Pattern::Weekdays => next_weekday(from),
            Pattern::Weekly => from.checked_add_days(Days::new(7)),
            Pattern::Biweekly => from.checked_add_days(Days::new(14)),
            // chrono clamps to the last day of the target month
            Pattern::Monthly => from.checked_add_months(Months::new(1)),
            Pattern::Yearly => from.checked_add_months(Months::new(12)),
            Pattern::Custom => match rule {
                Some(rule) => return rule.next_date(from),
                None => None,
            },
        };
        Ok(next)
    }
}

fn next_weekday(from: NaiveDate) -> Option<NaiveDate> {
    let next = from.checked_add_days(Days::new(1))?;
    match next.weekday() {
        Weekday::Sat => next.checked_add_days(Days::new(2)),
        Weekday::Sun => next.checked_add_days(Days::new(1)),
        _ => Some(next),
    }
}

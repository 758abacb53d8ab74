use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;

/// Built-in repetition patterns.
///
/// Serialized with the names the task records have always carried
/// (`"Bi-Weekly"` included); the SQLite column stores the lowercase identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Pattern {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekly,
    #[serde(rename = "Bi-Weekly")]
    Biweekly,
    Monthly,
    Yearly,
    Custom,
}

impl Pattern {
    pub const ALL: [Pattern; 8] = [
        Pattern::None,
        Pattern::Daily,
        Pattern::Weekdays,
        Pattern::Weekly,
        Pattern::Biweekly,
        Pattern::Monthly,
        Pattern::Yearly,
        Pattern::Custom,
    ];
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pattern::None => "none",
            Pattern::Daily => "daily",
            Pattern::Weekdays => "weekdays",
            Pattern::Weekly => "weekly",
            Pattern::Biweekly => "biweekly",
            Pattern::Monthly => "monthly",
            Pattern::Yearly => "yearly",
            Pattern::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence pattern: {0}")]
pub struct ParsePatternError(String);

impl FromStr for Pattern {
    type Err = ParsePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Pattern::None),
            "daily" => Ok(Pattern::Daily),
            "weekdays" => Ok(Pattern::Weekdays),
            "weekly" => Ok(Pattern::Weekly),
            "biweekly" | "bi-weekly" => Ok(Pattern::Biweekly),
            "monthly" => Ok(Pattern::Monthly),
            "yearly" => Ok(Pattern::Yearly),
            "custom" => Ok(Pattern::Custom),
            _ => Err(ParsePatternError(s.to_string())),
        }
    }
}

/// Unit of a user-defined rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for RecurrenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceUnit::Day => write!(f, "day"),
            RecurrenceUnit::Week => write!(f, "week"),
            RecurrenceUnit::Month => write!(f, "month"),
            RecurrenceUnit::Year => write!(f, "year"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence unit: {0}")]
pub struct ParseRecurrenceUnitError(String);

impl FromStr for RecurrenceUnit {
    type Err = ParseRecurrenceUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "day" => Ok(RecurrenceUnit::Day),
            "week" => Ok(RecurrenceUnit::Week),
            "month" => Ok(RecurrenceUnit::Month),
            "year" => Ok(RecurrenceUnit::Year),
            _ => Err(ParseRecurrenceUnitError(s.to_string())),
        }
    }
}

/// Set of weekdays, persisted as a list of day numbers 1-7 where 1 is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Day numbers in ascending order, 1 = Sunday.
    pub fn day_numbers(&self) -> Vec<u8> {
        (1..=7u8).filter(|n| self.0 & (1 << (n - 1)) != 0).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = String;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        let mut bits = 0u8;
        for n in numbers {
            if !(1..=7).contains(&n) {
                return Err(format!("weekday number {} is outside 1-7", n));
            }
            bits |= 1 << (n - 1);
        }
        Ok(Self(bits))
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.day_numbers()
    }
}

/// User-defined repetition rule, stored as a JSON record next to the task.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub frequency: u32,
    pub unit: RecurrenceUnit,
    /// Only consulted for weekly rules.
    pub days_of_week: Option<WeekdaySet>,
    /// Only consulted for monthly rules.
    pub day_of_month: Option<u32>,
    /// Carried for round-tripping, not used for resolution.
    pub week_of_month: Option<u32>,
    /// Carried for round-tripping, not used for resolution.
    pub month_of_year: Option<u32>,
}

impl CustomRule {
    pub fn new(frequency: u32, unit: RecurrenceUnit) -> Self {
        Self {
            frequency,
            unit,
            days_of_week: None,
            day_of_month: None,
            week_of_month: None,
            month_of_year: None,
        }
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn on_day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Occurrence {
    pub id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_recurring: bool,
    pub pattern: Pattern,
    /// Present iff `pattern == Custom`; a Custom pattern without it never generates.
    pub custom_rule: Option<CustomRule>,
    /// No occurrence is generated past this instant.
    pub series_end: Option<DateTime<Utc>>,
    /// Occurrences still owed by the series. Generation stops at zero.
    pub remaining_count: Option<u32>,
    /// The occurrence this one was generated from. `None` on a series root.
    pub lineage_parent_id: Option<Uuid>,
}

impl Default for Occurrence {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            title: "".to_string(),
            notes: None,
            due_at: None,
            project_id: None,
            section_id: None,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_recurring: false,
            pattern: Pattern::None,
            custom_rule: None,
            series_end: None,
            remaining_count: None,
            lineage_parent_id: None,
        }
    }
}

impl Occurrence {
    pub fn is_root(&self) -> bool {
        self.lineage_parent_id.is_none()
    }

    /// Whether this occurrence can produce a successor at all.
    ///
    /// `pattern == None` and a Custom pattern without its rule are both
    /// treated as non-recurring regardless of `is_recurring`.
    pub fn has_active_rule(&self) -> bool {
        if !self.is_recurring {
            return false;
        }
        match self.pattern {
            Pattern::None => false,
            Pattern::Custom => self.custom_rule.is_some(),
            _ => true,
        }
    }

    /// Whether the series has used up its budget or passed its end date.
    pub fn is_exhausted_at(&self, now: DateTime<Utc>) -> bool {
        if self.remaining_count == Some(0) {
            return true;
        }
        matches!(self.series_end, Some(end) if end < now)
    }

    pub fn same_rule_as(&self, other: &Occurrence) -> bool {
        self.pattern == other.pattern && self.custom_rule == other.custom_rule
    }

    /// Copies the template fields shared by every member of a series.
    pub fn apply_template_from(&mut self, template: &Occurrence) {
        self.title = template.title.clone();
        self.notes = template.notes.clone();
        self.is_recurring = template.is_recurring;
        self.pattern = template.pattern;
        self.custom_rule = template.custom_rule.clone();
        self.series_end = template.series_end;
        self.project_id = template.project_id;
        self.section_id = template.section_id;
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Checks the recurrence settings a caller is about to persist.
    pub fn validate_recurrence(&self) -> Result<(), CoreError> {
        if self.series_end.is_some() && self.remaining_count.is_some() {
            return Err(CoreError::InvalidInput(
                "A series ends either on a date or after a count, not both".to_string(),
            ));
        }
        match (self.pattern, &self.custom_rule) {
            (Pattern::Custom, Some(rule)) => rule.validate(),
            (Pattern::Custom, None) => Ok(()),
            (_, Some(_)) => Err(CoreError::InvalidInput(format!(
                "A custom rule requires the custom pattern, found '{}'",
                self.pattern
            ))),
            (_, None) => Ok(()),
        }
    }

    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewOccurrenceData {
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    /// When set, the occurrence becomes the root of a recurring series.
    pub pattern: Option<Pattern>,
    pub custom_rule: Option<CustomRule>,
    pub series_end: Option<DateTime<Utc>>,
    pub remaining_count: Option<u32>,
}

impl NewOccurrenceData {
    pub fn into_occurrence(self, now: DateTime<Utc>) -> Result<Occurrence, CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
        }
        let pattern = self.pattern.unwrap_or(Pattern::None);
        let occurrence = Occurrence {
            id: Uuid::now_v7(),
            title: self.title,
            notes: self.notes,
            due_at: self.due_at,
            project_id: self.project_id,
            section_id: self.section_id,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
            is_recurring: pattern != Pattern::None,
            pattern,
            custom_rule: self.custom_rule,
            series_end: self.series_end,
            remaining_count: self.remaining_count,
            lineage_parent_id: None,
        };
        occurrence.validate_recurrence()?;
        Ok(occurrence)
    }
}

/// Field edits; the outer `Option` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct UpdateOccurrenceData {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub project_id: Option<Option<Uuid>>,
    pub section_id: Option<Option<Uuid>>,
    pub pattern: Option<Pattern>,
    pub custom_rule: Option<Option<CustomRule>>,
    pub series_end: Option<Option<DateTime<Utc>>>,
    pub remaining_count: Option<Option<u32>>,
}

impl UpdateOccurrenceData {
    pub fn apply_to(self, occurrence: &mut Occurrence, now: DateTime<Utc>) -> Result<(), CoreError> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
            }
            occurrence.title = title;
        }
        if let Some(notes) = self.notes {
            occurrence.notes = notes;
        }
        if let Some(due_at) = self.due_at {
            occurrence.due_at = due_at;
        }
        if let Some(project_id) = self.project_id {
            occurrence.project_id = project_id;
        }
        if let Some(section_id) = self.section_id {
            occurrence.section_id = section_id;
        }
        if let Some(pattern) = self.pattern {
            occurrence.pattern = pattern;
            occurrence.is_recurring = pattern != Pattern::None;
            if pattern != Pattern::Custom {
                occurrence.custom_rule = None;
            }
        }
        if let Some(custom_rule) = self.custom_rule {
            occurrence.custom_rule = custom_rule;
        }
        if let Some(series_end) = self.series_end {
            occurrence.series_end = series_end;
        }
        if let Some(remaining_count) = self.remaining_count {
            occurrence.remaining_count = remaining_count;
        }
        if !occurrence.is_recurring {
            occurrence.series_end = None;
            occurrence.remaining_count = None;
        }
        occurrence.updated_at = now;
        occurrence.validate_recurrence()
    }

    pub fn touches_template(&self) -> bool {
        self.title.is_some()
            || self.notes.is_some()
            || self.project_id.is_some()
            || self.section_id.is_some()
            || self.pattern.is_some()
            || self.custom_rule.is_some()
            || self.series_end.is_some()
            || self.remaining_count.is_some()
    }
}

/// Scope for edits made to a member of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    /// Affect only the selected occurrence
    ThisOccurrence,
    /// Update the occurrence and carry the template fields to its pending descendants
    ThisAndFuture,
}

impl fmt::Display for EditScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditScope::ThisOccurrence => write!(f, "occurrence"),
            EditScope::ThisAndFuture => write!(f, "future"),
        }
    }
}

impl FromStr for EditScope {
    type Err = ParseEditScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "occurrence" | "this" => Ok(EditScope::ThisOccurrence),
            "future" | "this_and_future" => Ok(EditScope::ThisAndFuture),
            _ => Err(ParseEditScopeError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid edit scope: {0}")]
pub struct ParseEditScopeError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove only this occurrence; its children are re-linked to its parent.
    ThisOccurrence,
    /// Remove this occurrence and every series member due at or after it.
    ThisAndFuture,
}

#[derive(Debug)]
pub enum CompletionResult {
    Single(Occurrence),
    Recurring { completed: Occurrence, next: Occurrence },
    /// The series had nothing left to generate.
    SeriesEnded(Occurrence),
}

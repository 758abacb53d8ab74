use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Occurrence;

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    And,
    Or,
}

/// Predicate over occurrences, evaluated in memory or compiled to SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every occurrence.
    All,
    Filter(Filter),
    Not(Box<Query>),
    Binary {
        op: Operator,
        left: Box<Query>,
        right: Box<Query>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Recurring(bool),
    Completed(bool),
    LineageParent(Uuid),
    IsRoot,
    HasDueDate,
    Due(DueDate),
    TitleContains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DueDate {
    Before(DateTime<Utc>),
    OnOrAfter(DateTime<Utc>),
    After(DateTime<Utc>),
}

impl Query {
    pub fn filter(filter: Filter) -> Self {
        Query::Filter(filter)
    }

    pub fn and(self, other: Query) -> Self {
        Query::Binary {
            op: Operator::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Query) -> Self {
        Query::Binary {
            op: Operator::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn negate(self) -> Self {
        Query::Not(Box::new(self))
    }

    /// Incomplete recurring occurrences: the catch-up candidates.
    pub fn pending_recurring() -> Self {
        Query::filter(Filter::Recurring(true)).and(Query::filter(Filter::Completed(false)))
    }

    pub fn children_of(id: Uuid) -> Self {
        Query::filter(Filter::LineageParent(id))
    }

    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        match self {
            Query::All => true,
            Query::Filter(filter) => filter.matches(occurrence),
            Query::Not(query) => !query.matches(occurrence),
            Query::Binary { op, left, right } => match op {
                Operator::And => left.matches(occurrence) && right.matches(occurrence),
                Operator::Or => left.matches(occurrence) || right.matches(occurrence),
            },
        }
    }
}

impl Filter {
    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        match self {
            Filter::Recurring(flag) => occurrence.is_recurring == *flag,
            Filter::Completed(flag) => occurrence.completed == *flag,
            Filter::LineageParent(id) => occurrence.lineage_parent_id == Some(*id),
            Filter::IsRoot => occurrence.lineage_parent_id.is_none(),
            Filter::HasDueDate => occurrence.due_at.is_some(),
            Filter::Due(due) => match (due, occurrence.due_at) {
                (_, None) => false,
                (DueDate::Before(at), Some(due_at)) => due_at < *at,
                (DueDate::OnOrAfter(at), Some(due_at)) => due_at >= *at,
                (DueDate::After(at), Some(due_at)) => due_at > *at,
            },
            Filter::TitleContains(text) => occurrence
                .title
                .to_lowercase()
                .contains(&text.to_lowercase()),
        }
    }
}

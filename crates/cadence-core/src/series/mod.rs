//! Series maintenance: catch-up, propagation, lineage and completion.
//!
//! [`SeriesManager`] owns the calendar the resolvers run in and exposes every
//! pass as an async method over an [`OccurrenceStore`](crate::store::OccurrenceStore).
//! Batch passes never stop at the first bad series; failures are collected in
//! their summaries instead.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::Occurrence;
use crate::recurrence;
use crate::store::OccurrenceStore;
use crate::timezone::{validate_timezone, Calendar};

mod catch_up;
mod completion;
pub mod lineage;
mod propagation;

pub use completion::EditOutcome;

/// Configuration for series maintenance
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesConfig {
    /// IANA timezone used to decide which calendar day an instant falls on
    pub timezone: String,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// A failure isolated to one chain or one occurrence during a batch pass.
#[derive(Debug)]
pub struct SeriesFailure {
    pub occurrence_id: Uuid,
    pub error: CoreError,
}

impl SeriesFailure {
    pub fn new(occurrence_id: Uuid, error: CoreError) -> Self {
        Self {
            occurrence_id,
            error,
        }
    }
}

/// Summary of a catch-up pass
#[derive(Debug, Default)]
pub struct CatchUpSummary {
    /// Incomplete recurring occurrences examined
    pub scanned: usize,
    /// Chains that gained at least one occurrence
    pub chains_advanced: usize,
    pub occurrences_created: usize,
    pub occurrences_completed: usize,
    /// Overdue leading occurrences whose series can no longer produce dates
    pub exhausted: usize,
    pub failures: Vec<SeriesFailure>,
    pub duration_ms: u64,
}

impl CatchUpSummary {
    /// Failures caused by the store; the next pass retries those chains.
    pub fn store_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.error.is_store_failure()).count()
    }
}

/// Summary of a propagation pass
#[derive(Debug, Default)]
pub struct PropagationSummary {
    pub descendants: usize,
    /// Incomplete descendants due after the pass clock
    pub eligible: usize,
    pub updated: usize,
    pub rescheduled: usize,
    /// Eligible descendants left past the end of a shortened series
    pub beyond_end: Vec<Uuid>,
    pub failures: Vec<SeriesFailure>,
    pub duration_ms: u64,
}

/// Summary of a deletion
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeletionSummary {
    pub root_id: Uuid,
    pub deleted: Vec<Uuid>,
    /// Children re-linked to the deleted occurrence's parent
    pub relinked: usize,
    /// The root's budget after the deletion, if the root survived with one
    pub root_remaining_count: Option<u32>,
}

/// Runs series passes against a store in one configured timezone.
#[derive(Debug, Clone)]
pub struct SeriesManager {
    config: SeriesConfig,
    calendar: Calendar,
}

impl SeriesManager {
    /// Creates a manager, rejecting unknown timezones.
    pub fn new(config: SeriesConfig) -> Result<Self, CoreError> {
        let tz = validate_timezone(&config.timezone)?;
        Ok(Self {
            config,
            calendar: Calendar::new(tz),
        })
    }

    /// Creates a manager that works in UTC.
    pub fn with_defaults() -> Self {
        Self {
            config: SeriesConfig::default(),
            calendar: Calendar::default(),
        }
    }

    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Next `count` due instants the chain at `occurrence` would produce.
    pub fn preview(&self, occurrence: &Occurrence, count: usize) -> Result<Vec<DateTime<Utc>>, CoreError> {
        recurrence::preview(occurrence, count, &self.calendar)
    }
}

/// Commits staged writes on success and discards them on failure.
async fn commit<T>(store: &dyn OccurrenceStore, staged: Result<T, CoreError>) -> Result<T, CoreError> {
    match staged {
        Ok(value) => {
            store.save().await?;
            Ok(value)
        }
        Err(err) => {
            store.rollback().await?;
            Err(err)
        }
    }
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

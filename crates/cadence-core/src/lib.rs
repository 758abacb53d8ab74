//! # Cadence Core Library
//!
//! Recurring task occurrences kept as linked chains: each occurrence points
//! back at the one it was generated from, and the series engines keep those
//! chains current.
//!
//! ## Features
//!
//! - **Built-in and custom patterns**: daily, weekdays, weekly, bi-weekly,
//!   monthly, yearly, and frequency/unit rules with weekday or day-of-month
//!   constraints, with month-end clamping
//! - **Catch-up**: overdue chains are walked forward to the present, one
//!   transaction per chain
//! - **Propagation**: template edits flow to pending future occurrences, with
//!   due dates re-walked when the rule changes
//! - **Lineage**: root/descendant traversal with cycle detection and cascade
//!   deletion of a series' future
//! - **Timezone Awareness**: dates are resolved on the local calendar of an
//!   IANA timezone while keeping the time of day
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`recurrence`]: Next-date resolution and successor construction
//! - [`series`]: Catch-up, propagation, lineage and completion passes
//! - [`store`]: The store trait with in-memory and SQLite implementations
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//! - [`query`]: Occurrence filters
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     models::{NewOccurrenceData, Pattern},
//!     series::{SeriesConfig, SeriesManager},
//!     store::SqliteStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence_core::error::CoreError> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let store = SqliteStore::new(pool);
//!     let manager = SeriesManager::new(SeriesConfig {
//!         timezone: "Europe/Berlin".to_string(),
//!     })?;
//!
//!     let occurrence = manager
//!         .create_occurrence(
//!             NewOccurrenceData {
//!                 title: "Water the plants".to_string(),
//!                 due_at: Some(chrono::Utc::now()),
//!                 pattern: Some(Pattern::Weekly),
//!                 ..Default::default()
//!             },
//!             &store,
//!         )
//!         .await?;
//!
//!     let summary = manager.run_catch_up(&store).await?;
//!     println!("{} created, next: {:?}", summary.occurrences_created, manager.preview(&occurrence, 3)?);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod series;
pub mod store;
pub mod timezone;

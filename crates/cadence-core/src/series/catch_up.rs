use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::{elapsed_ms, CatchUpSummary, SeriesFailure, SeriesManager};
use crate::error::CoreError;
use crate::models::Occurrence;
use crate::query::Query;
use crate::recurrence::{next_due_after, OccurrenceFactory};
use crate::store::OccurrenceStore;

/// Result of walking one chain forward.
#[derive(Debug, Default)]
struct ChainWalk {
    created: usize,
    completed: usize,
    /// The walk stopped because the series ran out of dates.
    exhausted: bool,
}

impl SeriesManager {
    /// Brings every overdue recurring chain up to the present.
    pub async fn run_catch_up(&self, store: &dyn OccurrenceStore) -> Result<CatchUpSummary, CoreError> {
        self.run_catch_up_at(store, Utc::now()).await
    }

    /// [`run_catch_up`](Self::run_catch_up) with an explicit clock.
    ///
    /// Only the leading occurrence of each chain (the one nothing points back
    /// to) is advanced. Each chain is committed on its own; a failing chain is
    /// rolled back and recorded without stopping the scan.
    #[instrument(skip(self, store), fields(timezone = %self.config.timezone))]
    pub async fn run_catch_up_at(
        &self,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<CatchUpSummary, CoreError> {
        let started = Instant::now();
        let candidates = store.query(&Query::pending_recurring()).await?;
        let mut summary = CatchUpSummary {
            scanned: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            if !matches!(candidate.due_at, Some(due) if due < now) {
                continue;
            }

            match store.query(&Query::children_of(candidate.id)).await {
                Ok(children) if !children.is_empty() => continue,
                Ok(_) => {}
                Err(err) => {
                    warn!(occurrence = %candidate.id, error = %err, "could not inspect chain");
                    summary.failures.push(SeriesFailure::new(candidate.id, err));
                    continue;
                }
            }

            if !candidate.has_active_rule() || candidate.is_exhausted_at(now) {
                debug!(occurrence = %candidate.id, "series exhausted, nothing to generate");
                summary.exhausted += 1;
                continue;
            }

            let id = candidate.id;
            let walked = match self.advance_chain(candidate, store, now).await {
                Ok(walk) => store.save().await.map(|_| walk),
                Err(err) => Err(err),
            };

            match walked {
                Ok(walk) => {
                    if walk.created > 0 {
                        summary.chains_advanced += 1;
                        debug!(occurrence = %id, created = walk.created, "chain advanced");
                    }
                    if walk.exhausted {
                        summary.exhausted += 1;
                    }
                    summary.occurrences_created += walk.created;
                    summary.occurrences_completed += walk.completed;
                }
                Err(err) => {
                    warn!(occurrence = %id, error = %err, "catch-up failed for chain");
                    if let Err(rollback_err) = store.rollback().await {
                        warn!(occurrence = %id, error = %rollback_err, "rollback failed");
                    }
                    if matches!(err, CoreError::InvalidRule(_)) {
                        summary.exhausted += 1;
                    }
                    summary.failures.push(SeriesFailure::new(id, err));
                }
            }
        }

        summary.duration_ms = elapsed_ms(started);
        info!(
            scanned = summary.scanned,
            advanced = summary.chains_advanced,
            created = summary.occurrences_created,
            failures = summary.failures.len(),
            "catch-up finished"
        );
        Ok(summary)
    }

    /// Completes overdue occurrences and materializes successors until the
    /// leading occurrence is no longer before `now`. Writes are staged only.
    async fn advance_chain(
        &self,
        leading: Occurrence,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<ChainWalk, CoreError> {
        let mut walk = ChainWalk::default();
        let mut current = leading;

        while let Some(anchor) = current.due_at.filter(|due| *due < now) {
            let Some(next) = next_due_after(&current, anchor, &self.calendar)? else {
                walk.exhausted = true;
                break;
            };

            let successor = OccurrenceFactory::materialize(&current, next, now);
            current.mark_completed(now);
            store.update(&current).await?;
            store.insert(&successor).await?;
            walk.completed += 1;
            walk.created += 1;
            current = successor;
        }

        Ok(walk)
    }
}

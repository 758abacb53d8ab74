use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::lineage::resolve_descendants;
use super::{commit, elapsed_ms, PropagationSummary, SeriesFailure, SeriesManager};
use crate::error::CoreError;
use crate::models::Occurrence;
use crate::recurrence::next_due_after;
use crate::store::OccurrenceStore;

impl SeriesManager {
    /// Carries `root`'s template fields to its pending future descendants.
    pub async fn propagate(&self, root: &Occurrence, store: &dyn OccurrenceStore) -> Result<PropagationSummary, CoreError> {
        self.propagate_at(root, store, Utc::now()).await
    }

    /// [`propagate`](Self::propagate) with an explicit clock.
    ///
    /// Descendants due after `now` and not yet completed receive the shared
    /// fields. When their schedule no longer follows the root's (rule, end
    /// date or count budget) the chain is re-walked from `root.due_at` and
    /// the i-th descendant takes the i-th date. Nothing is ever deleted;
    /// descendants past a shortened end keep their dates and are listed in
    /// [`PropagationSummary::beyond_end`].
    #[instrument(skip_all, fields(root = %root.id))]
    pub async fn propagate_at(
        &self,
        root: &Occurrence,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<PropagationSummary, CoreError> {
        let staged = self.propagate_staged(root, store, now).await;
        let summary = commit(store, staged).await?;
        info!(
            updated = summary.updated,
            rescheduled = summary.rescheduled,
            failures = summary.failures.len(),
            "propagation finished"
        );
        Ok(summary)
    }

    /// Propagation without committing; shared with scoped edits.
    pub(super) async fn propagate_staged(
        &self,
        root: &Occurrence,
        store: &dyn OccurrenceStore,
        now: DateTime<Utc>,
    ) -> Result<PropagationSummary, CoreError> {
        let started = Instant::now();
        let descendants = resolve_descendants(store, root).await?;
        let eligible = |o: &Occurrence| !o.completed && matches!(o.due_at, Some(due) if due > now);

        let mut summary = PropagationSummary {
            descendants: descendants.len(),
            eligible: descendants.iter().filter(|o| eligible(o)).count(),
            ..Default::default()
        };

        let schedule_changed = descendants
            .iter()
            .enumerate()
            .filter(|(_, o)| eligible(o))
            .any(|(index, o)| !follows_schedule(o, root, index + 1));
        let schedule = if schedule_changed {
            self.reschedule(root, descendants.len(), &mut summary)
        } else {
            None
        };

        for (index, descendant) in descendants.iter().enumerate() {
            if !eligible(descendant) {
                continue;
            }

            let mut updated = descendant.clone();
            updated.apply_template_from(root);
            updated.remaining_count = budget_at(root, index + 1);
            match schedule.as_ref().map(|dates| dates[index]) {
                Some(Some(due)) if updated.due_at != Some(due) => {
                    updated.due_at = Some(due);
                    summary.rescheduled += 1;
                }
                Some(None) => summary.beyond_end.push(descendant.id),
                _ => {}
            }
            if updated == *descendant {
                continue;
            }

            updated.updated_at = now;
            match store.update(&updated).await {
                Ok(()) => summary.updated += 1,
                Err(err) => {
                    warn!(occurrence = %descendant.id, error = %err, "could not update descendant");
                    summary.failures.push(SeriesFailure::new(descendant.id, err));
                }
            }
        }

        summary.duration_ms = elapsed_ms(started);
        Ok(summary)
    }

    /// Due dates for the first `len` chain positions under `root`'s rule.
    ///
    /// Positions past the end of the series stay `None`. Returns `None` when
    /// the root has no due date or its rule cannot advance; the latter is
    /// recorded against the root.
    fn reschedule(
        &self,
        root: &Occurrence,
        len: usize,
        summary: &mut PropagationSummary,
    ) -> Option<Vec<Option<DateTime<Utc>>>> {
        let Some(mut anchor) = root.due_at else {
            debug!("root has no due date, keeping descendant dates");
            return None;
        };

        let mut schedule = vec![None; len];

        let mut cursor = root.clone();
        for slot in schedule.iter_mut() {
            match next_due_after(&cursor, anchor, &self.calendar) {
                Ok(Some(next)) => {
                    *slot = Some(next);
                    anchor = next;
                    cursor.remaining_count = cursor.remaining_count.map(|c| c.saturating_sub(1));
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "rule cannot be re-walked");
                    summary.failures.push(SeriesFailure::new(root.id, err));
                    return None;
                }
            }
        }
        Some(schedule)
    }
}

/// The count budget a descendant `position` steps below `root` should carry.
fn budget_at(root: &Occurrence, position: usize) -> Option<u32> {
    let steps = u32::try_from(position).unwrap_or(u32::MAX);
    root.remaining_count.map(|count| count.saturating_sub(steps))
}

/// Whether `descendant` already carries the rule and end conditions `root`
/// would hand down to its position in the chain.
fn follows_schedule(descendant: &Occurrence, root: &Occurrence, position: usize) -> bool {
    descendant.same_rule_as(root)
        && descendant.series_end == root.series_end
        && descendant.remaining_count == budget_at(root, position)
}

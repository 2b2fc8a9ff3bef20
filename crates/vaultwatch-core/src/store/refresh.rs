// ── Cycle result application ──
//
// Overlapping cycles (manual refresh racing the ticker) each produce an
// independent result. A result is applied only when it is at least as
// new as what is already published; partial results never exist here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::dashboard_store::{DashboardStore, DashboardView, RefreshStatus};
use super::Snapshot;
use crate::error::CoreError;

impl DashboardStore {
    /// Publish a successful cycle's snapshot.
    ///
    /// Discarded (returns `false`) when it carries older log data than the
    /// published snapshot, or equal log data from an earlier cycle.
    pub(crate) fn apply_snapshot(&self, snapshot: Arc<Snapshot>) -> bool {
        self.view.send_if_modified(|view| {
            if let Some(current) = &view.snapshot {
                let incoming = (snapshot.newest_log(), snapshot.cycle);
                let published = (current.newest_log(), current.cycle);
                if incoming <= published {
                    debug!(
                        cycle = snapshot.cycle,
                        published = current.cycle,
                        "discarding stale snapshot"
                    );
                    return false;
                }
            }

            *view = Arc::new(DashboardView {
                status: RefreshStatus::Fresh {
                    at: snapshot.fetched_at,
                },
                snapshot: Some(snapshot.clone()),
            });
            true
        })
    }

    /// Mark the published snapshot stale after a failed cycle.
    ///
    /// Ignored when a later cycle has already published. The snapshot
    /// itself is kept; `since` tracks the first failure of the streak.
    pub(crate) fn record_failure(&self, cycle: u64, error: &CoreError, at: DateTime<Utc>) -> bool {
        self.view.send_if_modified(|view| {
            if view.snapshot.as_ref().is_some_and(|s| s.cycle > cycle) {
                debug!(cycle, "ignoring failure from superseded cycle");
                return false;
            }

            let since = match &view.status {
                RefreshStatus::Stale { since, .. } => *since,
                _ => at,
            };
            *view = Arc::new(DashboardView {
                snapshot: view.snapshot.clone(),
                status: RefreshStatus::Stale {
                    since,
                    error: error.clone(),
                },
            });
            true
        })
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::Snapshot;
use crate::error::CoreError;

/// Freshness of the published snapshot.
#[derive(Debug, Clone)]
pub enum RefreshStatus {
    /// No cycle has completed yet.
    Never,
    /// The latest completed cycle succeeded.
    Fresh { at: DateTime<Utc> },
    /// Cycles have been failing since `since`; the snapshot (if any) is
    /// the last good one.
    Stale {
        since: DateTime<Utc>,
        error: CoreError,
    },
}

impl RefreshStatus {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Stale { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// What subscribers see: the last good snapshot plus its freshness.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub snapshot: Option<Arc<Snapshot>>,
    pub status: RefreshStatus,
}

impl DashboardView {
    fn empty() -> Self {
        Self {
            snapshot: None,
            status: RefreshStatus::Never,
        }
    }
}

/// Single-slot store for the dashboard view.
///
/// Writers replace the whole view atomically through
/// `watch::Sender::send_if_modified`, so a reader never observes a
/// snapshot from one cycle paired with the status of another.
pub struct DashboardStore {
    pub(super) view: watch::Sender<Arc<DashboardView>>,
}

impl DashboardStore {
    pub fn new() -> Self {
        let (view, _) = watch::channel(Arc::new(DashboardView::empty()));
        Self { view }
    }

    /// Current view.
    pub fn view(&self) -> Arc<DashboardView> {
        self.view.borrow().clone()
    }

    /// Last good snapshot, if any cycle has ever succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.view.borrow().snapshot.clone()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view.subscribe()
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view.borrow();
        f.debug_struct("DashboardStore")
            .field("cycle", &view.snapshot.as_ref().map(|s| s.cycle))
            .field("status", &view.status)
            .finish()
    }
}

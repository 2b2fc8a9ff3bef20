// ── Reactive dashboard store ──
//
// Holds the last published snapshot and the refresh status, and pushes
// every change to subscribers through a `watch` channel.

mod dashboard_store;
mod refresh;
mod snapshot;

pub use dashboard_store::{DashboardStore, DashboardView, RefreshStatus};
pub use snapshot::{EnvPanel, EnvUnavailable, Snapshot};

//! Data synchronization and command dispatch between `vaultwatch-api` and
//! dashboard consumers.
//!
//! - **[`Monitor`]**: lifecycle facade generic over a [`LogSource`], an
//!   [`EnvSource`] and a [`CommandSink`]. [`start()`](Monitor::start) spawns
//!   the refresh ticker and the command processor;
//!   [`refresh_now()`](Monitor::refresh_now) runs a single cycle on demand.
//!
//! - **[`DashboardStore`]**: single-slot reactive view (last good
//!   [`Snapshot`] plus [`RefreshStatus`]) pushed through a
//!   `tokio::sync::watch` channel. Stale cycle results are discarded.
//!
//! - **[`projector`]**: pure derivations of [`CurrentState`] and [`Stats`]
//!   from one access-log snapshot.
//!
//! - **Adapters** ([`backend`]): Firebase RTDB and REST gateway data
//!   sources, MQTT and REST command transports, selected by
//!   [`MonitorConfig`].

pub mod backend;
pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod monitor;
pub mod projector;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{Backend, CommandTransport, FirebaseBackend, GatewayBackend};
pub use command::Command;
pub use config::{BackendConfig, CommandConfig, MonitorConfig, RefreshConfig, TlsVerification};
pub use error::{CoreError, Stream};
pub use monitor::{ConfiguredMonitor, Monitor, fetch_snapshot};
pub use projector::{CurrentState, Projection, Stats};
pub use source::{CommandSink, EnvSource, LogSource};
pub use store::{DashboardStore, DashboardView, EnvPanel, EnvUnavailable, RefreshStatus, Snapshot};

pub use model::{
    AccessLogEntry, DoorState, EnvBatch, EnvMetric, EnvReading, LedState, LogBatch,
};

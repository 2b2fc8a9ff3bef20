// ── Capability interfaces ──
//
// The monitor is generic over where data comes from and where commands
// go. Concrete adapters live in `backend`; tests plug in fakes.

use std::future::Future;

use crate::command::Command;
use crate::error::CoreError;
use crate::model::{EnvBatch, LogBatch};

/// Retrieves the access-log stream.
///
/// An empty backend yields an empty batch, never an error; callers
/// distinguish "no data" from "request failed".
pub trait LogSource: Send + Sync + 'static {
    fn fetch_logs(&self) -> impl Future<Output = Result<LogBatch, CoreError>> + Send;
}

/// Retrieves the latest reading or a bounded history of environmental telemetry.
pub trait EnvSource: Send + Sync + 'static {
    fn fetch_env(&self) -> impl Future<Output = Result<EnvBatch, CoreError>> + Send;
}

/// Delivers a command token to the device side.
///
/// Fire-and-forget: success means the transport accepted the token, not
/// that the device acted on it. Implementations do not retry.
pub trait CommandSink: Send + Sync + 'static {
    fn dispatch(&self, command: Command) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Release transport resources. Called once when the monitor stops.
    fn shutdown(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

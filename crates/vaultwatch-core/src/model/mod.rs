// ── Domain model ──
//
// Canonical types produced by the adapters. Timestamps are always UTC
// instants; string vocabularies are closed enums.

pub mod access;
pub mod env;

pub use access::{AccessLogEntry, DoorState, LedState};
pub use env::{EnvMetric, EnvReading};

/// Result of one access-log fetch after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    pub entries: Vec<AccessLogEntry>,
    /// Records dropped at the adapter boundary (bad timestamp, unknown
    /// door/LED value, missing uid, undecodable payload).
    pub skipped: usize,
}

/// Result of one environment fetch after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvBatch {
    pub readings: Vec<EnvReading>,
    pub skipped: usize,
}

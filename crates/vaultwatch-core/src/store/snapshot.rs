// ── Published snapshot ──
//
// One complete fetch-and-recompute result. Snapshots are immutable once
// built and shared behind `Arc`; a new cycle builds a new one.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{AccessLogEntry, EnvBatch, EnvReading, LogBatch};
use crate::projector::{self, CurrentState, Stats};

/// Why the environmental panel has nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvUnavailable {
    /// The backend has never recorded a reading.
    NoData,
    /// The environment fetch failed this cycle.
    FetchFailed { reason: String },
}

/// Environmental panel contents. Never an error for the dashboard as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnvPanel {
    Available {
        latest: EnvReading,
        /// Bounded history, oldest first.
        history: Vec<EnvReading>,
    },
    Unavailable {
        reason: EnvUnavailable,
    },
}

impl EnvPanel {
    /// Build the panel from this cycle's environment fetch.
    pub fn from_fetch(result: Result<EnvBatch, CoreError>) -> Self {
        match result {
            Ok(batch) => {
                let mut history = batch.readings;
                projector::sort_readings(&mut history);
                match projector::latest_reading(&history).cloned() {
                    Some(latest) => Self::Available { latest, history },
                    None => Self::Unavailable {
                        reason: EnvUnavailable::NoData,
                    },
                }
            }
            Err(CoreError::NoData { .. }) => Self::Unavailable {
                reason: EnvUnavailable::NoData,
            },
            Err(e) => Self::Unavailable {
                reason: EnvUnavailable::FetchFailed {
                    reason: e.to_string(),
                },
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn latest(&self) -> Option<&EnvReading> {
        match self {
            Self::Available { latest, .. } => Some(latest),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn history(&self) -> &[EnvReading] {
        match self {
            Self::Available { history, .. } => history,
            Self::Unavailable { .. } => &[],
        }
    }
}

/// Everything the dashboard renders, as of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Monotonic cycle number assigned when the cycle started.
    pub cycle: u64,
    pub fetched_at: DateTime<Utc>,
    /// Access log, oldest first.
    pub logs: Vec<AccessLogEntry>,
    pub current: CurrentState,
    pub stats: Stats,
    pub env: EnvPanel,
    /// Records dropped at the adapter boundary across both streams.
    pub skipped_records: usize,
}

impl Snapshot {
    /// Project a cycle's fetch results into a snapshot.
    ///
    /// Fails with [`CoreError::NoData`] when the log batch is empty; the
    /// environment result only ever degrades the env panel.
    pub fn build(
        cycle: u64,
        fetched_at: DateTime<Utc>,
        logs: LogBatch,
        env: Result<EnvBatch, CoreError>,
    ) -> Result<Self, CoreError> {
        let mut entries = logs.entries;
        projector::sort_chronological(&mut entries);
        let projection = projector::project(&entries)?;

        let env_skipped = env.as_ref().map_or(0, |b| b.skipped);

        Ok(Self {
            cycle,
            fetched_at,
            logs: entries,
            current: projection.current,
            stats: projection.stats,
            env: EnvPanel::from_fetch(env),
            skipped_records: logs.skipped + env_skipped,
        })
    }

    /// Timestamp of the newest access-log entry.
    pub fn newest_log(&self) -> DateTime<Utc> {
        self.current.as_of
    }

    /// Access log newest first.
    pub fn logs_desc(&self) -> Vec<&AccessLogEntry> {
        projector::history_desc(&self.logs, |e| (e.timestamp, e.seq))
    }
}

// ── State projection ──
//
// Pure functions from one snapshot of the access log to the derived
// dashboard state. Nothing here is incremental: every refresh recomputes
// from the full collection.
//
// Ordering rule: entries are ordered by `(timestamp, seq)`. Among equal
// timestamps the record with the higher batch position is the later one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CoreError, Stream};
use crate::model::{AccessLogEntry, DoorState, EnvMetric, EnvReading, LedState};

/// Door and LED state as of the most recent access-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentState {
    pub door: DoorState,
    pub led: LedState,
    /// Timestamp of the entry the state was taken from.
    pub as_of: DateTime<Utc>,
    /// Badge that produced that entry.
    pub uid: String,
}

/// Aggregate opening statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Entries with the door OUVERTE.
    pub open_count: usize,
    /// OUVERTE entries grouped by badge uid.
    pub per_badge_open_count: BTreeMap<String, usize>,
}

impl Stats {
    /// `(uid, count)` pairs, most openings first, then by uid.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .per_badge_open_count
            .iter()
            .map(|(uid, count)| (uid.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Both projections of one log snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub current: CurrentState,
    pub stats: Stats,
}

// ── Projections ──────────────────────────────────────────────────────

/// State of the entry with the greatest `(timestamp, seq)`.
pub fn current_state(logs: &[AccessLogEntry]) -> Result<CurrentState, CoreError> {
    let latest = logs
        .iter()
        .max_by_key(|e| (e.timestamp, e.seq))
        .ok_or(CoreError::NoData {
            stream: Stream::AccessLogs,
        })?;

    Ok(CurrentState {
        door: latest.door,
        led: latest.led,
        as_of: latest.timestamp,
        uid: latest.uid.clone(),
    })
}

/// Opening counts over the whole collection.
pub fn stats(logs: &[AccessLogEntry]) -> Result<Stats, CoreError> {
    if logs.is_empty() {
        return Err(CoreError::NoData {
            stream: Stream::AccessLogs,
        });
    }

    let mut stats = Stats::default();
    for entry in logs.iter().filter(|e| e.door.is_open()) {
        stats.open_count += 1;
        *stats
            .per_badge_open_count
            .entry(entry.uid.clone())
            .or_insert(0) += 1;
    }
    Ok(stats)
}

/// Current state and statistics together.
pub fn project(logs: &[AccessLogEntry]) -> Result<Projection, CoreError> {
    Ok(Projection {
        current: current_state(logs)?,
        stats: stats(logs)?,
    })
}

// ── Ordering helpers ─────────────────────────────────────────────────

/// Sort access-log entries oldest first by `(timestamp, seq)`.
pub fn sort_chronological(logs: &mut [AccessLogEntry]) {
    logs.sort_by_key(|e| (e.timestamp, e.seq));
}

/// Sort environment readings oldest first by `(timestamp, seq)`.
pub fn sort_readings(readings: &mut [EnvReading]) {
    readings.sort_by_key(|r| (r.timestamp, r.seq));
}

/// Keep only the `limit` newest readings, oldest first. `0` keeps everything.
pub fn retain_newest(readings: &mut Vec<EnvReading>, limit: u32) {
    sort_readings(readings);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    if limit > 0 && readings.len() > limit {
        let excess = readings.len() - limit;
        readings.drain(..excess);
    }
}

/// The newest environment reading, if any.
pub fn latest_reading(readings: &[EnvReading]) -> Option<&EnvReading> {
    readings.iter().max_by_key(|r| (r.timestamp, r.seq))
}

/// Entries newest first, for the history table.
pub fn history_desc<T, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Vec<&T> {
    let mut refs: Vec<&T> = items.iter().collect();
    refs.sort_by(|a, b| key(b).cmp(&key(a)));
    refs
}

/// `(timestamp, value)` points for one metric, oldest first.
pub fn series(readings: &[EnvReading], metric: EnvMetric) -> Vec<(DateTime<Utc>, f64)> {
    let mut points: Vec<&EnvReading> = readings.iter().collect();
    points.sort_by_key(|r| (r.timestamp, r.seq));
    points
        .into_iter()
        .map(|r| (r.timestamp, r.metric(metric)))
        .collect()
}

// ── Backend-to-domain conversions ──
//
// Bridges raw `vaultwatch_api` records into canonical model types. Every
// timestamp format the firmware has used is normalized here into one
// `DateTime<Utc>`; records that cannot be normalized are dropped and
// counted, never turned into a whole-fetch failure.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use vaultwatch_api::{Keyed, RawAccessLog, RawEnvReading, RecordSet};

use crate::model::{AccessLogEntry, DoorState, EnvBatch, EnvReading, LedState, LogBatch};

/// Naive layouts written by the device clock (no offset: read as UTC).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
];

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a record timestamp into a UTC instant.
///
/// Accepted: RFC 3339 strings, naive ISO-like strings (UTC), bare dates,
/// and epoch milliseconds as a JSON number or a numeric string.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => {
            if let Some(ms) = n.as_i64() {
                DateTime::from_timestamp_millis(ms)
            } else {
                n.as_f64().and_then(float_millis)
            }
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn float_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() || ms.abs() > 8.64e15 {
        return None;
    }
    DateTime::from_timestamp_millis(ms.round() as i64)
}

/// Read a finite number from a JSON number or numeric string.
fn parse_number(raw: Option<&Value>) -> Option<f64> {
    let n = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Fire flag: boolean, 0/1 number, or the equivalent strings.
fn parse_flag(raw: Option<&Value>) -> Option<bool> {
    match raw? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_uid(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Access logs ────────────────────────────────────────────────────

fn access_entry(seq: usize, keyed: Keyed<RawAccessLog>) -> Result<AccessLogEntry, &'static str> {
    let raw = keyed.record;
    let timestamp = raw
        .timestamp
        .as_ref()
        .and_then(parse_timestamp)
        .ok_or("unparsable timestamp")?;
    let uid = parse_uid(raw.uid.as_ref()).ok_or("missing uid")?;
    let door = raw
        .porte
        .as_deref()
        .and_then(|p| DoorState::from_str(p.trim()).ok())
        .ok_or("unknown door state")?;
    let led = raw
        .led
        .as_deref()
        .and_then(|l| LedState::from_str(l.trim()).ok())
        .ok_or("unknown LED state")?;

    Ok(AccessLogEntry {
        timestamp,
        uid,
        door,
        led,
        record_id: keyed.key,
        seq,
    })
}

/// Normalize a fetched access-log record set.
pub fn access_logs(set: RecordSet<RawAccessLog>) -> LogBatch {
    let mut batch = LogBatch {
        entries: Vec::with_capacity(set.records.len()),
        skipped: set.malformed,
    };

    for (seq, keyed) in set.records.into_iter().enumerate() {
        let key = keyed.key.clone();
        match access_entry(seq, keyed) {
            Ok(entry) => batch.entries.push(entry),
            Err(reason) => {
                debug!(?key, reason, "dropping access-log record");
                batch.skipped += 1;
            }
        }
    }

    if batch.skipped > 0 {
        warn!(skipped = batch.skipped, kept = batch.entries.len(), "access-log records skipped");
    }
    batch
}

// ── Environment ────────────────────────────────────────────────────

fn env_reading(seq: usize, keyed: Keyed<RawEnvReading>) -> Result<EnvReading, &'static str> {
    let raw = keyed.record;
    let timestamp = raw
        .timestamp
        .as_ref()
        .and_then(parse_timestamp)
        .ok_or("unparsable timestamp")?;

    Ok(EnvReading {
        timestamp,
        temperature: parse_number(raw.temp.as_ref()).ok_or("invalid temp")?,
        humidity: parse_number(raw.hum.as_ref()).ok_or("invalid hum")?,
        light: parse_number(raw.lum.as_ref()).ok_or("invalid lum")?,
        air_quality: parse_number(raw.mq.as_ref()).ok_or("invalid mq")?,
        fire: parse_flag(raw.fire.as_ref()).ok_or("invalid fire flag")?,
        record_id: keyed.key,
        seq,
    })
}

/// Normalize a fetched environment record set.
pub fn env_readings(set: RecordSet<RawEnvReading>) -> EnvBatch {
    let mut batch = EnvBatch {
        readings: Vec::with_capacity(set.records.len()),
        skipped: set.malformed,
    };

    for (seq, keyed) in set.records.into_iter().enumerate() {
        let key = keyed.key.clone();
        match env_reading(seq, keyed) {
            Ok(reading) => batch.readings.push(reading),
            Err(reason) => {
                debug!(?key, reason, "dropping environment record");
                batch.skipped += 1;
            }
        }
    }

    if batch.skipped > 0 {
        warn!(skipped = batch.skipped, kept = batch.readings.len(), "environment records skipped");
    }
    batch
}

// ── Access-log domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Door position reported by the controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum DoorState {
    #[strum(to_string = "OUVERTE")]
    Ouverte,
    #[strum(to_string = "FERMEE", serialize = "FERMÉE")]
    Fermee,
}

impl DoorState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Ouverte)
    }
}

/// Indicator LED color on the door controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LedState {
    Verte,
    Rouge,
    Orange,
    Blanc,
}

/// One badge event, immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub uid: String,
    pub door: DoorState,
    pub led: LedState,

    /// Backend key (push id) when read from a keyed store.
    pub record_id: Option<String>,
    /// Position of the record within the fetched batch.
    pub seq: usize,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn door_state_parses_wire_values() {
        assert_eq!(DoorState::from_str("OUVERTE").ok(), Some(DoorState::Ouverte));
        assert_eq!(DoorState::from_str("FERMEE").ok(), Some(DoorState::Fermee));
        assert_eq!(DoorState::from_str("FERMÉE").ok(), Some(DoorState::Fermee));
        assert_eq!(DoorState::from_str("ouverte").ok(), Some(DoorState::Ouverte));
        assert!(DoorState::from_str("AJAR").is_err());
    }

    #[test]
    fn door_state_displays_wire_value() {
        assert_eq!(DoorState::Fermee.to_string(), "FERMEE");
    }

    #[test]
    fn led_state_round_trips_through_display() {
        for led in [LedState::Verte, LedState::Rouge, LedState::Orange, LedState::Blanc] {
            assert_eq!(LedState::from_str(&led.to_string()).ok(), Some(led));
        }
    }
}

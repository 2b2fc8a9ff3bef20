// ── Command vocabulary ──
//
// Operator actions are a closed set of plaintext tokens. The device side
// interprets them; this crate only forwards them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantArray};

use crate::error::CoreError;

/// A command token understood by the door controller.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    VariantArray,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    LedRouge,
    LedVerte,
    Open,
    Close,
    Reset,
}

impl Command {
    /// The wire token, e.g. `"LED_ROUGE"`.
    pub fn token(self) -> &'static str {
        self.into()
    }

    /// Parse a wire token, rejecting anything outside the vocabulary.
    pub fn parse_token(token: &str) -> Result<Self, CoreError> {
        token
            .trim()
            .parse()
            .map_err(|_| CoreError::ValidationFailed {
                message: format!(
                    "unknown command '{token}' (expected one of: {})",
                    Self::VARIANTS
                        .iter()
                        .map(|c| c.token())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<(), CoreError>>,
}

//! Context publication: the agent's externally visible playback state.

use std::sync::Weak;

use serde::Serialize;

use crate::error::{Result, SynthError};

/// Externally defined activity values. The four internal playback states
/// collapse to these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerActivity {
    Playing,
    Finished,
}

/// State payload published to the context aggregator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPayload {
    /// Token of the most recent utterance; empty before the first one.
    pub token: String,
    /// Playback offset in milliseconds.
    pub offset_in_milliseconds: i64,
    /// Collapsed playback activity.
    pub player_activity: PlayerActivity,
}

impl ContextPayload {
    /// Serialize the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SynthError::Context(format!("failed to serialize context payload: {e}")))
    }
}

/// Supplies state snapshots when the aggregator asks for them.
pub trait StateProvider: Send + Sync {
    /// Publish current state, echoing `request_token`.
    fn provide_state(&self, request_token: u32);
}

/// Central aggregator for capability state.
pub trait ContextManager: Send + Sync {
    /// Register (or with None, remove) the provider consulted for this
    /// agent's state.
    fn set_state_provider(&self, provider: Option<Weak<dyn StateProvider>>);

    /// Publish a state payload. `request_token` is Some when answering a
    /// `provide_state` request and None for unsolicited refreshes.
    ///
    /// # Errors
    ///
    /// Returns an error when the aggregator rejects the update.
    fn set_state(&self, payload_json: &str, request_token: Option<u32>) -> Result<()>;
}

//! Configuration types for the speech-synthesizer agent.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the synthesizer agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Audio channel acquired for speech playback.
    pub channel_name: String,
    /// Activity identifier reported to the focus manager when acquiring the
    /// channel.
    pub activity_id: String,
    /// Failure description delivered upstream for directives dropped by
    /// shutdown.
    pub shutdown_description: String,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            channel_name: "Dialog".to_owned(),
            activity_id: "SpeechSynthesizer.Speak".to_owned(),
            shutdown_description: "speech synthesizer shutting down".to_owned(),
        }
    }
}

//! Media player contract consumed by the agent.

use std::sync::Weak;

use crate::attachment::AttachmentReader;
use crate::error::Result;

/// Classification reported with a playback error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    /// Cause unknown to the player.
    Unknown,
    /// The source bytes could not be decoded or were rejected.
    InvalidSource,
    /// The player failed internally.
    Internal,
}

/// Playback lifecycle callbacks. May arrive on any thread.
pub trait PlaybackObserver: Send + Sync {
    /// The current source started producing audio.
    fn on_playback_started(&self);

    /// The current source finished, either naturally or after `stop`.
    fn on_playback_finished(&self);

    /// Playback failed; no finished callback follows.
    fn on_playback_error(&self, kind: MediaErrorKind, message: &str);
}

/// Contract of the audio player that renders speech attachments.
pub trait MediaPlayer: Send + Sync {
    /// Hand the player the byte source for the next utterance. The player
    /// owns the reader until the utterance ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be accepted.
    fn set_source(&self, reader: Box<dyn AttachmentReader>) -> Result<()>;

    /// Begin playing the current source. Completion is reported through the
    /// observer.
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot begin.
    fn play(&self) -> Result<()>;

    /// Stop playback. A finished (or error) callback is still delivered for
    /// the stopped source.
    ///
    /// # Errors
    ///
    /// Returns an error if there is nothing to stop or the player failed.
    fn stop(&self) -> Result<()>;

    /// Current playback offset in milliseconds.
    fn offset_ms(&self) -> i64;

    /// Register the observer notified of playback transitions.
    fn set_observer(&self, observer: Weak<dyn PlaybackObserver>);

    /// Remove the observer registration.
    fn clear_observer(&self);
}

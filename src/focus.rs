//! Audio-channel focus contract.

use std::sync::Weak;

/// Focus granted to an audio channel by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    /// The channel is not granted at all.
    None,
    /// Another channel holds the foreground.
    Background,
    /// The channel owns the audio output.
    Foreground,
}

/// Receives asynchronous focus grants. May be called on any thread.
pub trait FocusObserver: Send + Sync {
    /// A new focus state was granted to the observed channel.
    fn on_focus_changed(&self, focus: FocusState);
}

/// Arbitrates exclusive use of named audio channels.
pub trait FocusManager: Send + Sync {
    /// Request focus on `channel` for the given activity. Grants arrive
    /// later through `observer`. Returns false when the request cannot be
    /// accepted at all.
    fn acquire_channel(
        &self,
        channel: &str,
        observer: Weak<dyn FocusObserver>,
        activity_id: &str,
    ) -> bool;

    /// Release a previously acquired channel. Returns false when the channel
    /// was not held.
    fn release_channel(&self, channel: &str) -> bool;
}

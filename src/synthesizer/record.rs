//! Per-utterance bookkeeping.

use std::fmt;
use std::sync::Arc;

use crate::directive::{Directive, DirectiveResult};

/// Everything the agent tracks for one Speak utterance.
///
/// Created at pre-handle, retired after playback terminates and both owed
/// notifications have been delivered. Mutated only on the executor.
pub struct SpeakRecord {
    /// Envelope the record was created from.
    pub directive: Directive,
    /// Opaque token echoed in events and context.
    pub token: String,
    /// Attachment reference, resolved through the store at playback start.
    pub attachment_id: String,
    /// Completion handle toward the upstream sequencer; None for directives
    /// handled outside the sequencer.
    pub result: Option<Arc<dyn DirectiveResult>>,
    /// A `SpeechFinished` event is still owed to the cloud. Set when
    /// playback starts, cleared exactly once.
    pub send_finished: bool,
    /// A completion report is still owed to the sequencer. Set when handling
    /// begins, cleared exactly once.
    pub send_completed: bool,
}

impl SpeakRecord {
    pub fn new(
        directive: Directive,
        token: String,
        attachment_id: String,
        result: Option<Arc<dyn DirectiveResult>>,
    ) -> Self {
        Self {
            directive,
            token,
            attachment_id,
            result,
            send_finished: false,
            send_completed: false,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.directive.message_id
    }
}

impl fmt::Debug for SpeakRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeakRecord")
            .field("message_id", &self.directive.message_id)
            .field("token", &self.token)
            .field("attachment_id", &self.attachment_id)
            .field("has_result", &self.result.is_some())
            .field("send_finished", &self.send_finished)
            .field("send_completed", &self.send_completed)
            .finish()
    }
}

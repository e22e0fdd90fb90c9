//! Outbound event and exception construction.
//!
//! Events carry the standard envelope shape the cloud expects:
//! `{"event":{"header":{namespace,name,messageId},"payload":{...}}}`.
//! Exception reports use the same envelope with the failed directive and an
//! `error` object in the payload.

use serde_json::json;
use uuid::Uuid;

use crate::directive::{Directive, NAMESPACE, NAME_SPEAK};

/// Event emitted when an utterance starts playing.
pub const NAME_SPEECH_STARTED: &str = "SpeechStarted";

/// Event emitted when an utterance finishes playing.
pub const NAME_SPEECH_FINISHED: &str = "SpeechFinished";

/// Namespace carried on exception reports.
pub const NAMESPACE_SYSTEM: &str = "System";

/// Event name for exception reports.
pub const NAME_EXCEPTION_ENCOUNTERED: &str = "ExceptionEncountered";

/// Transport for events the agent emits toward the cloud.
pub trait EventSink: Send + Sync {
    /// Send a fully built event JSON document.
    fn send_event(&self, event_json: String);
}

/// Category carried on an exception report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// The directive lacked required information or carried unexpected
    /// fields.
    UnexpectedInformationReceived,
    /// The agent failed internally while processing the directive.
    InternalError,
}

impl ExceptionKind {
    /// Wire form of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnexpectedInformationReceived => "UNEXPECTED_INFORMATION_RECEIVED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Transport for exception reports toward the cloud.
pub trait ExceptionSink: Send + Sync {
    /// Send a fully built [`NAME_EXCEPTION_ENCOUNTERED`] event JSON
    /// document.
    fn send_exception(&self, exception_json: String);
}

/// Build a SpeechSynthesizer event document for the given name and token.
pub fn build_speech_event(name: &str, token: &str) -> String {
    json!({
        "event": {
            "header": {
                "namespace": NAMESPACE,
                "name": name,
                "messageId": Uuid::new_v4().to_string(),
            },
            "payload": {
                "token": token,
            }
        }
    })
    .to_string()
}

/// Build an ExceptionEncountered event reporting that `directive` could not
/// be processed.
pub fn build_exception_event(directive: &Directive, kind: ExceptionKind, message: &str) -> String {
    json!({
        "event": {
            "header": {
                "namespace": NAMESPACE_SYSTEM,
                "name": NAME_EXCEPTION_ENCOUNTERED,
                "messageId": Uuid::new_v4().to_string(),
            },
            "payload": {
                "unparsedDirective": {
                    "header": {
                        "namespace": NAMESPACE,
                        "name": NAME_SPEAK,
                        "messageId": directive.message_id,
                        "dialogRequestId": directive.dialog_request_id,
                    },
                    "payload": directive.payload,
                },
                "error": {
                    "type": kind.as_str(),
                    "message": message,
                }
            }
        }
    })
    .to_string()
}

//! Directive envelope, Speak payload, and the upstream sequencer contracts.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, SynthError};

/// Namespace this agent registers for.
pub const NAMESPACE: &str = "SpeechSynthesizer";

/// Directive name handled by this agent.
pub const NAME_SPEAK: &str = "Speak";

/// A structured command delivered by the cloud voice service.
#[derive(Debug, Clone)]
pub struct Directive {
    /// Unique envelope identifier; primary key for the agent's bookkeeping.
    pub message_id: String,
    /// Dialog grouping identifier from the envelope (may be empty).
    pub dialog_request_id: String,
    /// Raw JSON payload.
    pub payload: String,
}

impl Directive {
    /// Build a directive from its envelope parts.
    pub fn new(
        message_id: impl Into<String>,
        dialog_request_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            dialog_request_id: dialog_request_id.into(),
            payload: payload.into(),
        }
    }
}

/// Parsed payload of a `Speak` directive.
///
/// All fields are optional so callers can report exactly which required
/// property is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakPayload {
    /// Opaque token echoed in events and context.
    pub token: Option<String>,
    /// Audio format label; accepted but not interpreted.
    pub format: Option<String>,
    /// Attachment reference, usually `cid:`-prefixed.
    pub url: Option<String>,
}

impl SpeakPayload {
    /// Parse a raw Speak payload document.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not valid JSON of the expected
    /// shape. Missing properties are not an error here; they are reported
    /// individually by the caller.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| SynthError::Directive(format!("malformed Speak payload: {e}")))
    }
}

/// Strip the attachment scheme prefix from a Speak `url` reference.
pub fn attachment_id_from_url(url: &str) -> &str {
    url.strip_prefix("cid:").unwrap_or(url)
}

/// How the directive router may schedule directives for a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingPolicy {
    /// The router must wait for completion before handling the next
    /// directive on the same channel.
    Blocking,
    /// The router may hand over further directives immediately.
    NonBlocking,
}

/// One `(namespace, name)` routing entry a handler declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveRoute {
    pub namespace: &'static str,
    pub name: &'static str,
    pub policy: BlockingPolicy,
}

/// Per-directive completion handle provided by the upstream sequencer.
///
/// Exactly one terminal call is expected for a directive that is not
/// cancelled by the upstream itself.
pub trait DirectiveResult: Send + Sync {
    /// Report that the directive was handled to completion.
    fn set_completed(&self);

    /// Report that handling failed, with a description of why.
    fn set_failed(&self, description: &str);
}

/// Router-facing contract of a capability agent.
///
/// All methods may be called from arbitrary threads; implementations must
/// only validate arguments synchronously and defer real work.
pub trait DirectiveHandler: Send + Sync {
    /// Declare the routes this handler services.
    fn configuration(&self) -> Vec<DirectiveRoute>;

    /// Cache a directive ahead of handling.
    fn pre_handle(&self, directive: Directive, result: Arc<dyn DirectiveResult>);

    /// Begin handling a previously pre-handled directive. Returns false when
    /// the handler is shutting down and the request was dropped; an unknown
    /// message id is reported asynchronously.
    fn handle(&self, message_id: &str) -> bool;

    /// Discard a pre-handled directive.
    fn cancel(&self, message_id: &str);

    /// Handle a directive that bypassed the sequencer (no result handle).
    fn handle_immediately(&self, directive: Directive);

    /// Notification that the router no longer routes to this handler.
    fn on_deregistered(&self) {}
}

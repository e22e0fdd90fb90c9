//! Guth: speech-synthesizer capability agent for cloud voice directives.
//!
//! A cloud voice service delivers `Speak` directives — encoded speech audio
//! plus an opaque token — and expects the device to play them one at a time,
//! report lifecycle events, and keep a coherent externally visible state.
//! This crate implements the coordination core of that agent:
//!
//! - **Directive lifecycle**: pre-handle caches and validates, handle queues
//!   and activates, cancel discards; strict FIFO activation order.
//! - **Focus/playback state machine**: foreground focus is acquired per
//!   utterance, playback runs `FINISHED → GAINING_FOCUS → PLAYING →
//!   FINISHED`, and focus loss quiesces through `LOSING_FOCUS`.
//! - **Serialization discipline**: a single-threaded executor owns every
//!   mutation; public entry points enqueue. The one blocking entry point is
//!   the focus callback, which returns only once the agent has quiesced.
//! - **Observability**: observers see `PLAYING`/`FINISHED` transitions in
//!   order, and a `{token, offsetInMilliseconds, playerActivity}` context
//!   payload is published on transitions and on demand.
//!
//! The media player, focus arbiter, context aggregator, directive router,
//! attachment store, and event transport are traits implemented by the
//! embedding application; this crate contains no audio decoding and no I/O.

pub mod attachment;
pub mod config;
pub mod context;
pub mod directive;
pub mod error;
pub mod events;
pub mod executor;
pub mod focus;
pub mod media;
pub mod synthesizer;

pub use config::SynthesizerConfig;
pub use context::{ContextManager, ContextPayload, PlayerActivity, StateProvider};
pub use directive::{
    BlockingPolicy, Directive, DirectiveHandler, DirectiveResult, DirectiveRoute,
};
pub use error::{Result, SynthError};
pub use events::{EventSink, ExceptionKind, ExceptionSink};
pub use focus::{FocusManager, FocusObserver, FocusState};
pub use media::{MediaErrorKind, MediaPlayer, PlaybackObserver};
pub use synthesizer::observer::SynthesizerObserver;
pub use synthesizer::state::PlaybackState;
pub use synthesizer::SpeechSynthesizer;

//! The speech-synthesizer capability agent.
//!
//! Sequences `Speak` directives across four collaborators: the upstream
//! directive sequencer, the audio-channel focus arbiter, the media player,
//! and the context aggregator. All state mutation happens on one serial
//! executor; public entry points validate cheaply and enqueue. The only
//! blocking entry point is `on_focus_changed`, which returns once the agent
//! has quiesced into the state the focus grant drives it toward.

pub mod observer;
pub mod record;
pub mod state;
pub mod store;

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, info, warn};

use crate::attachment::AttachmentStore;
use crate::config::SynthesizerConfig;
use crate::context::{ContextManager, ContextPayload, StateProvider};
use crate::directive::{
    attachment_id_from_url, BlockingPolicy, Directive, DirectiveHandler, DirectiveResult,
    DirectiveRoute, SpeakPayload, NAMESPACE, NAME_SPEAK,
};
use crate::error::Result;
use crate::events::{
    build_exception_event, build_speech_event, EventSink, ExceptionKind, ExceptionSink,
    NAME_SPEECH_FINISHED, NAME_SPEECH_STARTED,
};
use crate::executor::SerialExecutor;
use crate::focus::{FocusManager, FocusObserver, FocusState};
use crate::media::{MediaErrorKind, MediaPlayer, PlaybackObserver};

use observer::{ObserverRegistry, SynthesizerObserver};
use record::SpeakRecord;
use state::{PlaybackState, StateCell};
use store::{lock_record, DirectiveStore, SharedRecord};

/// Speech-synthesizer capability agent.
///
/// Create with [`SpeechSynthesizer::new`], which also registers the agent as
/// the media player's observer and the context manager's state provider via
/// non-owning handles. Call [`SpeechSynthesizer::shutdown`] before dropping
/// the last reference.
pub struct SpeechSynthesizer {
    // Dropped first so queued tasks cannot outlive the state they touch.
    executor: SerialExecutor,
    self_ref: Weak<SpeechSynthesizer>,
    config: SynthesizerConfig,
    media: Arc<dyn MediaPlayer>,
    events: Arc<dyn EventSink>,
    exceptions: Arc<dyn ExceptionSink>,
    focus: Arc<dyn FocusManager>,
    context: Arc<dyn ContextManager>,
    attachments: Arc<dyn AttachmentStore>,
    observers: ObserverRegistry,
    store: DirectiveStore,
    state: StateCell,
    current: Mutex<Option<SharedRecord>>,
    last_token: Mutex<String>,
    last_offset_ms: AtomicI64,
    focus_held: AtomicBool,
    stopping: AtomicBool,
}

impl SpeechSynthesizer {
    /// Create the agent and subscribe it to playback and context callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the executor worker cannot be spawned.
    pub fn new(
        config: SynthesizerConfig,
        media: Arc<dyn MediaPlayer>,
        events: Arc<dyn EventSink>,
        focus: Arc<dyn FocusManager>,
        context: Arc<dyn ContextManager>,
        attachments: Arc<dyn AttachmentStore>,
        exceptions: Arc<dyn ExceptionSink>,
    ) -> Result<Arc<Self>> {
        let executor = SerialExecutor::new()?;
        let agent = Arc::new_cyclic(|weak: &Weak<SpeechSynthesizer>| Self {
            executor,
            self_ref: weak.clone(),
            config,
            media,
            events,
            exceptions,
            focus,
            context,
            attachments,
            observers: ObserverRegistry::new(),
            store: DirectiveStore::new(),
            state: StateCell::new(),
            current: Mutex::new(None),
            last_token: Mutex::new(String::new()),
            last_offset_ms: AtomicI64::new(0),
            focus_held: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
        });
        let playback_observer_strong: Arc<dyn PlaybackObserver> = agent.clone();
        let playback_observer: Weak<dyn PlaybackObserver> = Arc::downgrade(&playback_observer_strong);
        agent.media.set_observer(playback_observer);
        let provider_strong: Arc<dyn StateProvider> = agent.clone();
        let provider: Weak<dyn StateProvider> = Arc::downgrade(&provider_strong);
        agent.context.set_state_provider(Some(provider));
        info!("speech synthesizer ready on channel {}", agent.config.channel_name);
        Ok(agent)
    }

    /// Subscribe to playback state transitions. Takes effect on the
    /// executor, so it is eventually consistent with in-flight transitions.
    pub fn add_observer(&self, observer: Arc<dyn SynthesizerObserver>) {
        self.submit(move |agent| agent.observers.add(observer));
    }

    /// Unsubscribe an observer and wait until no further callbacks can reach
    /// it. Must not be called from inside an observer callback — such calls
    /// are rejected (returning false) since waiting there would deadlock the
    /// executor.
    pub fn remove_observer(&self, observer: Arc<dyn SynthesizerObserver>) -> bool {
        if self.executor.on_worker_thread() {
            error!("remove_observer called from an observer callback; rejected to avoid deadlock");
            return false;
        }
        let weak = self.self_ref.clone();
        self.executor.submit_and_wait(move || {
            if let Some(agent) = weak.upgrade() {
                agent.observers.remove(&observer);
            }
        })
    }

    /// Current playback state.
    pub fn playback_state(&self) -> PlaybackState {
        self.state.current()
    }

    /// Stop the agent: drain the executor, cancel active playback, fail
    /// everything still pending with the configured shutdown description,
    /// release focus, and unsubscribe from collaborator callbacks.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down speech synthesizer");
        self.executor.shutdown();
        self.media.clear_observer();
        self.context.set_state_provider(None);
        // The executor is stopped; this thread now owns all agent state.
        let active = self.lock_current().take();
        if let Some(record) = active {
            let message_id = {
                let mut rec = lock_record(&record);
                rec.send_finished = false;
                rec.message_id().to_owned()
            };
            let state = self.state.current();
            if matches!(state, PlaybackState::Playing | PlaybackState::LosingFocus) {
                if let Err(e) = self.media.stop() {
                    warn!("failed to stop playback during shutdown: {e}");
                }
            }
            deliver_failed(&record, &self.config.shutdown_description);
            self.store.remove(&message_id);
        }
        for record in self.store.drain_all() {
            let result = {
                let mut rec = lock_record(&record);
                rec.send_finished = false;
                rec.send_completed = false;
                rec.result.clone()
            };
            if let Some(result) = result {
                result.set_failed(&self.config.shutdown_description);
            }
        }
        self.release_focus();
        self.state.set_finished();
    }

    // ─── executor plumbing ───────────────────────────────────────────────

    /// Enqueue work against a weak self-handle; a task that outlives the
    /// agent is a no-op.
    fn submit(&self, task: impl FnOnce(&SpeechSynthesizer) + Send + 'static) -> bool {
        let weak = self.self_ref.clone();
        self.executor.submit(move || {
            if let Some(agent) = weak.upgrade() {
                task(&agent);
            }
        })
    }

    // ─── directive lifecycle (executor thread) ───────────────────────────

    /// Validate and register a Speak directive. Returns the fresh record, or
    /// None when the payload was rejected or the id is a duplicate.
    fn execute_pre_handle(
        &self,
        directive: Directive,
        result: Option<Arc<dyn DirectiveResult>>,
    ) -> Option<SharedRecord> {
        let payload = match SpeakPayload::parse(&directive.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("rejecting Speak {}: {e}", directive.message_id);
                let message = e.to_string();
                self.exceptions.send_exception(build_exception_event(
                    &directive,
                    ExceptionKind::UnexpectedInformationReceived,
                    &message,
                ));
                if let Some(result) = result {
                    result.set_failed(&message);
                }
                return None;
            }
        };
        let Some(token) = payload.token else {
            return self.reject_missing_property(&directive, result, "token");
        };
        let Some(url) = payload.url else {
            return self.reject_missing_property(&directive, result, "url");
        };
        let attachment_id = attachment_id_from_url(&url).to_owned();
        debug!(
            "pre-handled Speak {} (token {token}, attachment {attachment_id})",
            directive.message_id
        );
        let message_id = directive.message_id.clone();
        let record = Arc::new(Mutex::new(SpeakRecord::new(
            directive,
            token,
            attachment_id,
            result,
        )));
        if !self.store.register(Arc::clone(&record)) {
            warn!("duplicate Speak {message_id} dropped; existing entry stays authoritative");
            return None;
        }
        Some(record)
    }

    fn reject_missing_property(
        &self,
        directive: &Directive,
        result: Option<Arc<dyn DirectiveResult>>,
        property: &str,
    ) -> Option<SharedRecord> {
        let message = format!("Speak payload is missing required property \"{property}\"");
        warn!("rejecting Speak {}: {message}", directive.message_id);
        self.exceptions.send_exception(build_exception_event(
            directive,
            ExceptionKind::UnexpectedInformationReceived,
            &message,
        ));
        if let Some(result) = result {
            result.set_failed(&message);
        }
        None
    }

    fn execute_handle(&self, message_id: &str) {
        let Some(record) = self.store.lookup(message_id) else {
            warn!("handle for unknown messageId {message_id}");
            return;
        };
        {
            let mut rec = lock_record(&record);
            rec.send_completed = rec.result.is_some();
        }
        self.execute_enqueue(record);
    }

    /// Append to the pending queue; when nothing is active, activate at
    /// once.
    fn execute_enqueue(&self, record: SharedRecord) {
        let was_empty = self.store.enqueue(record);
        let idle = self.current_record().is_none();
        if was_empty && idle {
            self.execute_activate_next();
        }
    }

    /// Pop the queue head, make it the current speaker, and request
    /// foreground focus for it.
    fn execute_activate_next(&self) {
        let Some(record) = self.store.dequeue_head() else {
            return;
        };
        *self.lock_current() = Some(Arc::clone(&record));
        self.state.set_current(PlaybackState::GainingFocus);
        let Some(me) = self.self_ref.upgrade() else {
            return;
        };
        let observer_strong: Arc<dyn FocusObserver> = me.clone();
        let observer: Weak<dyn FocusObserver> = Arc::downgrade(&observer_strong);
        let acquired = self.focus.acquire_channel(
            &self.config.channel_name,
            observer,
            &self.config.activity_id,
        );
        if acquired {
            self.focus_held.store(true, Ordering::Release);
            debug!("requested foreground focus on {}", self.config.channel_name);
        } else {
            error!("could not acquire channel {}", self.config.channel_name);
            self.fail_active("CHANNEL_ACQUISITION_FAILED");
        }
    }

    fn execute_cancel(&self, message_id: &str) {
        let Some(record) = self.store.lookup(message_id) else {
            debug!("cancel for unknown messageId {message_id}");
            return;
        };
        let is_current = self
            .current_record()
            .is_some_and(|current| Arc::ptr_eq(&current, &record));
        if is_current {
            info!("canceling active utterance {message_id}");
            {
                let mut rec = lock_record(&record);
                rec.send_finished = false;
                rec.send_completed = false;
            }
            match self.state.current() {
                PlaybackState::Playing => self.stop_playing(),
                // Stop already in flight; the finished callback retires it.
                PlaybackState::LosingFocus => {}
                _ => {
                    // Focus not granted yet; retire without media interaction.
                    self.state.set_finished();
                    self.release_focus();
                    self.retire_current();
                    self.execute_activate_next();
                }
            }
        } else {
            info!("canceling queued utterance {message_id}");
            self.store.unqueue(message_id);
            self.store.remove(message_id);
            let result = {
                let mut rec = lock_record(&record);
                rec.send_completed = false;
                rec.result.clone()
            };
            if let Some(result) = result {
                result.set_failed("Speak directive canceled before playback");
            }
        }
    }

    // ─── state machine (executor thread) ─────────────────────────────────

    /// Drive the machine toward the desired state set by the last focus
    /// grant.
    fn execute_state_change(&self) {
        let (current, desired) = self.state.pair();
        debug!("state change: current {current:?}, desired {desired:?}");
        match desired {
            PlaybackState::Playing => {
                if current != PlaybackState::Playing {
                    self.start_playing();
                }
            }
            PlaybackState::Finished => match current {
                PlaybackState::Playing => self.stop_playing(),
                PlaybackState::GainingFocus => {
                    warn!("lost focus before playback started");
                    self.fail_active("lost focus before playback started");
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn start_playing(&self) {
        let Some(record) = self.current_record() else {
            warn!("focus granted with no active utterance");
            return;
        };
        let (token, attachment_id) = {
            let rec = lock_record(&record);
            (rec.token.clone(), rec.attachment_id.clone())
        };
        debug!("starting playback for token {token}");
        let Some(reader) = self.attachments.open(&attachment_id) else {
            let message = format!("could not open attachment {attachment_id}");
            error!("{message}");
            let directive = lock_record(&record).directive.clone();
            self.exceptions.send_exception(build_exception_event(
                &directive,
                ExceptionKind::InternalError,
                &message,
            ));
            self.fail_active(&message);
            return;
        };
        let started = self
            .media
            .set_source(reader)
            .and_then(|()| self.media.play());
        if let Err(e) = started {
            self.execute_playback_error(
                MediaErrorKind::Internal,
                &format!("failed to start playback: {e}"),
            );
        }
    }

    fn stop_playing(&self) {
        self.state.set_current(PlaybackState::LosingFocus);
        if let Err(e) = self.media.stop() {
            error!("failed to stop playback: {e}");
            self.execute_playback_error(
                MediaErrorKind::Internal,
                &format!("failed to stop playback: {e}"),
            );
        }
    }

    /// Fail the current utterance before any audio played: report upstream,
    /// release focus, retire, advance. No event, no observer notification —
    /// externally the agent never left FINISHED.
    fn fail_active(&self, description: &str) {
        let Some(record) = self.current_record() else {
            return;
        };
        {
            let mut rec = lock_record(&record);
            rec.send_finished = false;
        }
        deliver_failed(&record, description);
        self.state.set_finished();
        self.release_focus();
        self.retire_current();
        self.execute_activate_next();
    }

    // ─── media callbacks (executor thread) ───────────────────────────────

    fn execute_playback_started(&self) {
        let Some(record) = self.current_record() else {
            warn!("playback started with no active utterance");
            return;
        };
        let token = {
            let mut rec = lock_record(&record);
            rec.send_finished = true;
            rec.token.clone()
        };
        *self.lock_last_token() = token.clone();
        self.state.set_current(PlaybackState::Playing);
        self.events
            .send_event(build_speech_event(NAME_SPEECH_STARTED, &token));
        self.publish_context(None);
        self.observers.notify(PlaybackState::Playing);
    }

    fn execute_playback_finished(&self) {
        let Some(record) = self.current_record() else {
            debug!("playback finished with no active utterance");
            return;
        };
        if !matches!(
            self.state.current(),
            PlaybackState::Playing | PlaybackState::LosingFocus
        ) {
            debug!("ignoring playback finished outside playback");
            return;
        }
        self.last_offset_ms
            .store(self.media.offset_ms(), Ordering::Release);
        self.state.set_finished();
        let finished_token = {
            let mut rec = lock_record(&record);
            if rec.send_finished {
                rec.send_finished = false;
                Some(rec.token.clone())
            } else {
                None
            }
        };
        if let Some(token) = finished_token {
            self.events
                .send_event(build_speech_event(NAME_SPEECH_FINISHED, &token));
        }
        deliver_completed(&record);
        self.publish_context(None);
        self.observers.notify(PlaybackState::Finished);
        self.release_focus();
        self.retire_current();
        self.execute_activate_next();
    }

    fn execute_playback_error(&self, kind: MediaErrorKind, message: &str) {
        let Some(record) = self.current_record() else {
            warn!("playback error with no active utterance: {message}");
            return;
        };
        error!("playback error ({kind:?}): {message}");
        self.state.set_finished();
        let directive = {
            let mut rec = lock_record(&record);
            rec.send_finished = false;
            rec.directive.clone()
        };
        self.exceptions.send_exception(build_exception_event(
            &directive,
            ExceptionKind::InternalError,
            message,
        ));
        deliver_failed(&record, message);
        self.publish_context(None);
        self.observers.notify(PlaybackState::Finished);
        self.release_focus();
        self.retire_current();
        self.execute_activate_next();
    }

    // ─── context (executor thread) ───────────────────────────────────────

    fn publish_context(&self, request_token: Option<u32>) {
        let current = self.state.current();
        let offset = if current == PlaybackState::Playing {
            let offset = self.media.offset_ms();
            self.last_offset_ms.store(offset, Ordering::Release);
            offset
        } else {
            self.last_offset_ms.load(Ordering::Acquire)
        };
        let payload = ContextPayload {
            token: self.lock_last_token().clone(),
            offset_in_milliseconds: offset,
            player_activity: current.activity(),
        };
        match payload.to_json() {
            Ok(json) => {
                if let Err(e) = self.context.set_state(&json, request_token) {
                    error!("failed to publish context: {e}");
                }
            }
            Err(e) => error!("{e}"),
        }
    }

    // ─── bookkeeping ─────────────────────────────────────────────────────

    fn current_record(&self) -> Option<SharedRecord> {
        self.lock_current().clone()
    }

    fn retire_current(&self) {
        let record = self.lock_current().take();
        if let Some(record) = record {
            let message_id = lock_record(&record).message_id().to_owned();
            self.store.remove(&message_id);
            debug!("retired utterance {message_id}");
        }
    }

    /// Release the audio channel if this agent holds an acquisition. Runs at
    /// most once per acquisition.
    fn release_focus(&self) {
        if self.focus_held.swap(false, Ordering::AcqRel) {
            if !self.focus.release_channel(&self.config.channel_name) {
                warn!("focus manager refused release of {}", self.config.channel_name);
            }
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<SharedRecord>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_last_token(&self) -> MutexGuard<'_, String> {
        self.last_token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DirectiveHandler for SpeechSynthesizer {
    fn configuration(&self) -> Vec<DirectiveRoute> {
        vec![DirectiveRoute {
            namespace: NAMESPACE,
            name: NAME_SPEAK,
            policy: BlockingPolicy::Blocking,
        }]
    }

    fn pre_handle(&self, directive: Directive, result: Arc<dyn DirectiveResult>) {
        debug!("pre-handling Speak {}", directive.message_id);
        self.submit(move |agent| {
            let _ = agent.execute_pre_handle(directive, Some(result));
        });
    }

    fn handle(&self, message_id: &str) -> bool {
        let message_id = message_id.to_owned();
        self.submit(move |agent| agent.execute_handle(&message_id))
    }

    fn cancel(&self, message_id: &str) {
        let message_id = message_id.to_owned();
        self.submit(move |agent| agent.execute_cancel(&message_id));
    }

    fn handle_immediately(&self, directive: Directive) {
        debug!("handling Speak {} immediately", directive.message_id);
        self.submit(move |agent| {
            if let Some(record) = agent.execute_pre_handle(directive, None) {
                agent.execute_enqueue(record);
            }
        });
    }

    fn on_deregistered(&self) {
        debug!("directive router deregistered the speech synthesizer");
    }
}

impl FocusObserver for SpeechSynthesizer {
    /// Applies the focus grant and blocks until the agent reaches the state
    /// the grant drives it toward, so the focus manager observes a quiesced
    /// agent. The single blocking entry point of the agent.
    fn on_focus_changed(&self, focus: FocusState) {
        debug!("focus changed to {focus:?}");
        let (current, desired) = self.state.apply_focus(focus);
        if current == desired {
            return;
        }
        if !self.submit(|agent| agent.execute_state_change()) {
            return;
        }
        if self.executor.on_worker_thread() {
            warn!("focus change delivered on the executor thread; skipping quiesce wait");
            return;
        }
        self.state
            .wait_until_reached(|| self.executor.is_stopping());
    }
}

impl PlaybackObserver for SpeechSynthesizer {
    fn on_playback_started(&self) {
        self.submit(|agent| agent.execute_playback_started());
    }

    fn on_playback_finished(&self) {
        self.submit(|agent| agent.execute_playback_finished());
    }

    fn on_playback_error(&self, kind: MediaErrorKind, message: &str) {
        let message = message.to_owned();
        self.submit(move |agent| agent.execute_playback_error(kind, &message));
    }
}

impl StateProvider for SpeechSynthesizer {
    fn provide_state(&self, request_token: u32) {
        self.submit(move |agent| agent.publish_context(Some(request_token)));
    }
}

impl Drop for SpeechSynthesizer {
    fn drop(&mut self) {
        if !self.stopping.load(Ordering::Acquire) {
            warn!("speech synthesizer dropped without shutdown; shutting down now");
            self.shutdown();
        }
    }
}

/// Deliver the owed completion report, at most once.
fn deliver_completed(record: &SharedRecord) {
    let result = {
        let mut rec = lock_record(record);
        if rec.send_completed {
            rec.send_completed = false;
            rec.result.clone()
        } else {
            None
        }
    };
    if let Some(result) = result {
        result.set_completed();
    }
}

/// Deliver the owed failure report, at most once.
fn deliver_failed(record: &SharedRecord, description: &str) {
    let result = {
        let mut rec = lock_record(record);
        if rec.send_completed {
            rec.send_completed = false;
            rec.result.clone()
        } else {
            None
        }
    };
    if let Some(result) = result {
        result.set_failed(description);
    }
}

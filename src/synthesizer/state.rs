//! Playback/focus state machine owned by the agent.

use std::sync::{Condvar, Mutex};

use crate::context::PlayerActivity;
use crate::focus::FocusState;

/// Internal playback states. `Finished` is the initial state and the resting
/// state between utterances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No utterance is active.
    Finished,
    /// The current utterance is producing audio.
    Playing,
    /// Foreground focus has been requested for the current utterance.
    GainingFocus,
    /// Playback is being stopped after a focus downgrade.
    LosingFocus,
}

impl PlaybackState {
    /// Whether an utterance is active in this state.
    pub fn has_active_speaker(self) -> bool {
        !matches!(self, Self::Finished)
    }

    /// Collapse to the externally defined activity. `LosingFocus` still
    /// reports `PLAYING` since audio may be audible until the stop lands.
    pub fn activity(self) -> PlayerActivity {
        match self {
            Self::Playing | Self::LosingFocus => PlayerActivity::Playing,
            Self::Finished | Self::GainingFocus => PlayerActivity::Finished,
        }
    }
}

struct StateInner {
    current: PlaybackState,
    desired: PlaybackState,
    focus: FocusState,
}

/// Current and desired playback state under one mutex, with a condvar that
/// wakes focus-change waiters whenever `current` catches up to `desired`.
pub struct StateCell {
    inner: Mutex<StateInner>,
    reached: Condvar,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StateInner {
                current: PlaybackState::Finished,
                desired: PlaybackState::Finished,
                focus: FocusState::None,
            }),
            reached: Condvar::new(),
        }
    }

    pub fn current(&self) -> PlaybackState {
        self.lock().current
    }

    pub fn focus(&self) -> FocusState {
        self.lock().focus
    }

    /// Snapshot of `(current, desired)`.
    pub fn pair(&self) -> (PlaybackState, PlaybackState) {
        let inner = self.lock();
        (inner.current, inner.desired)
    }

    /// Record a focus grant and derive the state the machine should head to:
    /// FOREGROUND drives toward `Playing`; BACKGROUND and NONE drive toward
    /// `Finished` when an utterance is playing or about to. Returns the
    /// `(current, desired)` pair after the update.
    pub fn apply_focus(&self, focus: FocusState) -> (PlaybackState, PlaybackState) {
        let mut inner = self.lock();
        inner.focus = focus;
        match focus {
            FocusState::Foreground => inner.desired = PlaybackState::Playing,
            FocusState::Background | FocusState::None => {
                if inner.current == PlaybackState::Playing
                    || inner.desired == PlaybackState::Playing
                {
                    inner.desired = PlaybackState::Finished;
                }
            }
        }
        (inner.current, inner.desired)
    }

    /// Move the machine to an intermediate state. Waiters are woken only if
    /// this happens to reach the desired state.
    pub fn set_current(&self, next: PlaybackState) {
        let mut inner = self.lock();
        inner.current = next;
        if inner.current == inner.desired {
            self.reached.notify_all();
        }
    }

    /// Terminal transition: the current utterance is over. Forces
    /// `desired = Finished` as well so no waiter can be stranded by an error
    /// path, and wakes all waiters.
    pub fn set_finished(&self) {
        let mut inner = self.lock();
        inner.current = PlaybackState::Finished;
        inner.desired = PlaybackState::Finished;
        self.reached.notify_all();
    }

    /// Block until `current == desired` or `abort()` turns true. `abort` is
    /// re-checked on every wakeup; callers that can abort must also notify
    /// the condvar (shutdown does, via [`StateCell::set_finished`]).
    pub fn wait_until_reached(&self, abort: impl Fn() -> bool) {
        let mut inner = self.lock();
        while inner.current != inner.desired && !abort() {
            inner = self
                .reached
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

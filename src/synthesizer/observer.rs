//! Fan-out of agent state changes to subscribers.

use std::sync::{Arc, Mutex};

use super::state::PlaybackState;

/// Receives agent state transitions. Callbacks run on the agent's executor
/// thread, in transition order, and may call back into the agent — except
/// `remove_observer`, which is rejected from inside a callback.
pub trait SynthesizerObserver: Send + Sync {
    fn on_state_changed(&self, state: PlaybackState);
}

/// Registered observers. The list is snapshotted under its lock and
/// notified outside it, so callbacks may re-enter the agent.
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn SynthesizerObserver>>>,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Add an observer. Re-adding the same one is a no-op.
    pub fn add(&self, observer: Arc<dyn SynthesizerObserver>) {
        let mut observers = self.lock();
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    /// Remove an observer by identity. Returns true when it was registered.
    pub fn remove(&self, observer: &Arc<dyn SynthesizerObserver>) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    /// Notify every registered observer of a transition.
    pub fn notify(&self, state: PlaybackState) {
        let snapshot: Vec<_> = self.lock().iter().map(Arc::clone).collect();
        for observer in snapshot {
            observer.on_state_changed(state);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn SynthesizerObserver>>> {
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

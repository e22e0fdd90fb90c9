//! Shutdown drains everything and fails pending work upstream.

use std::sync::Arc;

use guth::directive::{DirectiveHandler, DirectiveResult};
use guth::PlaybackState;

use crate::helpers::{harness, settle, speak, speak_directive, wait_transitions, RecordingResult};

#[test]
fn shutdown_fails_active_queued_and_cached_directives() {
    let h = harness();
    let active = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1), "A never started");
    let queued = speak(&h, "msg-b", "tok-B");
    let cached = Arc::new(RecordingResult::default());
    h.attachments.insert("msg-c", b"pcm".to_vec());
    h.agent.pre_handle(
        speak_directive("msg-c", "tok-C"),
        Arc::clone(&cached) as Arc<dyn DirectiveResult>,
    );
    settle(&h);

    h.agent.shutdown();

    for (result, name) in [(&active, "active"), (&queued, "queued"), (&cached, "cached")] {
        assert_eq!(result.completions(), 0, "{name} must not complete");
        let failures = result.failures();
        assert_eq!(failures.len(), 1, "{name} must fail exactly once");
        assert!(
            failures[0].contains("shutting down"),
            "{name} failed with: {}",
            failures[0]
        );
    }

    // Active playback was stopped, focus released, no SpeechFinished sent.
    assert!(h.media.calls().contains(&"stop"));
    assert_eq!(h.focus.releases().len(), 1);
    let emitted = h.events.emitted();
    assert!(!emitted.iter().any(|(name, _)| name == "SpeechFinished"));
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);

    // Collaborator subscriptions are gone.
    assert!(!h.media.has_observer());
    assert!(!h.context.has_provider());
}

#[test]
fn work_submitted_after_shutdown_is_dropped() {
    let h = harness();
    h.agent.shutdown();

    assert!(!h.agent.handle("msg-x"), "handle must report the drop");
    let result = Arc::new(RecordingResult::default());
    h.agent.pre_handle(
        speak_directive("msg-x", "tok-X"),
        Arc::clone(&result) as Arc<dyn DirectiveResult>,
    );
    h.agent.cancel("msg-x");

    assert_eq!(result.total_reports(), 0);
    assert!(h.events.emitted().is_empty());
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
}

#[test]
fn shutdown_is_idempotent() {
    let h = harness();
    let result = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    h.agent.shutdown();
    h.agent.shutdown();
    assert_eq!(result.failures().len(), 1, "only one failure report");
}

#[test]
fn dropping_the_agent_shuts_it_down() {
    let h = harness();
    let result = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    // A detached focus-grant thread may briefly hold the last reference, so
    // the drop-triggered shutdown is only eventually observable.
    drop(h.agent);
    assert!(crate::helpers::wait_until(crate::helpers::SETTLE, || {
        result.failures().len() == 1
    }));
    assert_eq!(result.completions(), 0);
    assert!(crate::helpers::wait_until(crate::helpers::SETTLE, || {
        h.focus.releases().len() == 1
    }));
}

//! Cancel semantics: active vs queued utterances.

use guth::directive::{DirectiveHandler, DirectiveResult};
use guth::PlaybackState;

use std::sync::Arc;

use crate::helpers::{
    harness, settle, speak, speak_directive, wait_transitions, RecordingResult,
};

#[test]
fn cancel_active_utterance_stops_media_and_reports_nothing() {
    let h = harness();
    let result = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1), "A never started");

    h.agent.cancel("msg-a");
    assert!(wait_transitions(&h, 2), "cancel never quiesced");

    assert!(h.media.calls().contains(&"stop"), "media was not stopped");
    // The upstream initiated the cancel; it gets no report at all.
    assert_eq!(result.total_reports(), 0);
    // SpeechStarted went out, SpeechFinished must not.
    assert_eq!(
        h.events.emitted(),
        vec![("SpeechStarted".to_owned(), "tok-A".to_owned())]
    );
    assert_eq!(
        h.observer.states(),
        vec![PlaybackState::Playing, PlaybackState::Finished]
    );
    assert_eq!(h.focus.releases().len(), 1, "focus released exactly once");
    h.agent.shutdown();
}

#[test]
fn cancel_queued_utterance_reports_cancellation_upstream() {
    let h = harness();
    let result_a = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    let result_b = speak(&h, "msg-b", "tok-B");

    h.agent.cancel("msg-b");
    settle(&h);
    h.media.finish();
    settle(&h);

    // A completed normally; B never played and was reported as canceled.
    assert_eq!(result_a.completions(), 1);
    assert_eq!(result_b.completions(), 0);
    let failures = result_b.failures();
    assert_eq!(failures.len(), 1);
    assert!(
        failures[0].contains("canceled"),
        "unexpected description: {}",
        failures[0]
    );
    let tokens: Vec<String> = h.events.emitted().into_iter().map(|(_, t)| t).collect();
    assert!(!tokens.contains(&"tok-B".to_owned()), "B must not emit events");
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
    h.agent.shutdown();
}

#[test]
fn cancel_between_pre_handle_and_handle_reports_cancellation() {
    let h = harness();
    h.attachments.insert("msg-c", b"pcm".to_vec());
    let result = Arc::new(RecordingResult::default());
    h.agent.pre_handle(
        speak_directive("msg-c", "tok-C"),
        Arc::clone(&result) as Arc<dyn DirectiveResult>,
    );
    h.agent.cancel("msg-c");
    settle(&h);

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("canceled"));

    // The id is gone: a late handle is a no-op.
    h.agent.handle("msg-c");
    settle(&h);
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
    assert!(h.events.emitted().is_empty());
    h.agent.shutdown();
}

#[test]
fn cancel_unknown_message_id_is_ignored() {
    let h = harness();
    h.agent.cancel("never-seen");
    settle(&h);
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
    h.agent.shutdown();
}

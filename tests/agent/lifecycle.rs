//! Happy-path directive lifecycle.

use guth::directive::{BlockingPolicy, DirectiveHandler};
use guth::PlaybackState;

use crate::helpers::{harness, settle, speak, speak_directive, wait_transitions};

#[test]
fn happy_path_plays_and_reports_in_order() {
    let h = harness();
    let result = speak(&h, "msg-a", "tok-A");

    assert!(wait_transitions(&h, 1), "utterance never started playing");
    assert_eq!(h.observer.states(), vec![PlaybackState::Playing]);

    h.media.finish();
    assert!(wait_transitions(&h, 2), "utterance never finished");
    assert_eq!(
        h.observer.states(),
        vec![PlaybackState::Playing, PlaybackState::Finished]
    );

    let emitted = h.events.emitted();
    assert_eq!(
        emitted,
        vec![
            ("SpeechStarted".to_owned(), "tok-A".to_owned()),
            ("SpeechFinished".to_owned(), "tok-A".to_owned()),
        ]
    );

    assert_eq!(result.completions(), 1, "completion owed exactly once");
    assert!(result.failures().is_empty());

    let acquires = h.focus.acquires();
    assert_eq!(acquires.len(), 1);
    assert_eq!(acquires[0].0, "Dialog");
    assert_eq!(acquires[0].1, "SpeechSynthesizer.Speak");
    assert_eq!(h.focus.releases(), vec!["Dialog".to_owned()]);

    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
    assert_eq!(h.media.calls(), vec!["set_source", "play"]);
}

#[test]
fn configuration_declares_blocking_speak_route() {
    let h = harness();
    let routes = h.agent.configuration();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].namespace, "SpeechSynthesizer");
    assert_eq!(routes[0].name, "Speak");
    assert_eq!(routes[0].policy, BlockingPolicy::Blocking);
    h.agent.shutdown();
}

#[test]
fn handle_immediately_plays_without_a_result_handle() {
    let h = harness();
    h.attachments.insert("msg-now", b"pcm".to_vec());
    h.agent.handle_immediately(speak_directive("msg-now", "tok-now"));

    assert!(wait_transitions(&h, 1), "immediate utterance never started");
    h.media.finish();
    assert!(wait_transitions(&h, 2), "immediate utterance never completed");
    settle(&h);

    let emitted = h.events.emitted();
    assert!(emitted.contains(&("SpeechStarted".to_owned(), "tok-now".to_owned())));
    assert_eq!(h.agent.playback_state(), PlaybackState::Finished);
    h.agent.shutdown();
}

#[test]
fn completion_is_reported_after_speech_finished_is_emitted() {
    let h = harness();
    let result = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    // Still playing: nothing owed yet.
    assert_eq!(result.total_reports(), 0);
    assert_eq!(h.events.emitted().len(), 1);

    h.media.finish();
    assert!(wait_transitions(&h, 2));
    assert_eq!(result.completions(), 1);
    h.agent.shutdown();
}

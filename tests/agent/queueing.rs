//! FIFO queueing of back-to-back Speak directives.

use guth::PlaybackState;

use crate::helpers::{harness, speak, wait_transitions};

#[test]
fn back_to_back_speaks_play_in_pre_handle_order() {
    let h = harness();
    let result_a = speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1), "A never started");

    // B arrives while A is playing; it must wait its turn.
    let result_b = speak(&h, "msg-b", "tok-B");
    assert_eq!(h.observer.states(), vec![PlaybackState::Playing]);

    h.media.finish();
    assert!(wait_transitions(&h, 3), "B never started after A finished");
    h.media.finish();
    assert!(wait_transitions(&h, 4), "B never finished");

    assert_eq!(
        h.observer.states(),
        vec![
            PlaybackState::Playing,
            PlaybackState::Finished,
            PlaybackState::Playing,
            PlaybackState::Finished,
        ]
    );
    assert_eq!(
        h.events.emitted(),
        vec![
            ("SpeechStarted".to_owned(), "tok-A".to_owned()),
            ("SpeechFinished".to_owned(), "tok-A".to_owned()),
            ("SpeechStarted".to_owned(), "tok-B".to_owned()),
            ("SpeechFinished".to_owned(), "tok-B".to_owned()),
        ]
    );
    assert_eq!(result_a.completions(), 1);
    assert_eq!(result_b.completions(), 1);

    // One acquisition and one release per utterance.
    assert_eq!(h.focus.acquires().len(), 2);
    assert_eq!(h.focus.releases().len(), 2);
    h.agent.shutdown();
}

#[test]
fn three_queued_speaks_keep_strict_fifo() {
    let h = harness();
    let results = [
        speak(&h, "msg-1", "tok-1"),
        speak(&h, "msg-2", "tok-2"),
        speak(&h, "msg-3", "tok-3"),
    ];

    for finished in 1..=3 {
        assert!(
            wait_transitions(&h, finished * 2 - 1),
            "utterance {finished} never started"
        );
        h.media.finish();
        assert!(
            wait_transitions(&h, finished * 2),
            "utterance {finished} never finished"
        );
    }

    let tokens: Vec<String> = h
        .events
        .emitted()
        .into_iter()
        .filter(|(name, _)| name == "SpeechStarted")
        .map(|(_, token)| token)
        .collect();
    assert_eq!(tokens, vec!["tok-1", "tok-2", "tok-3"]);
    for result in &results {
        assert_eq!(result.completions(), 1);
    }
    h.agent.shutdown();
}

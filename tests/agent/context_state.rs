//! Context publication: refresh on transitions, on-demand snapshots.

use std::sync::atomic::Ordering;

use crate::helpers::{harness, settle, speak, wait_transitions, wait_until, SETTLE};

#[test]
fn context_is_refreshed_at_playing_and_finished() {
    let h = harness();
    h.media.offset.store(777, Ordering::SeqCst);
    speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    h.media.finish();
    assert!(wait_transitions(&h, 2));
    settle(&h);

    let published = h.context.published();
    let unsolicited: Vec<_> = published
        .iter()
        .filter(|(_, token)| token.is_none())
        .collect();
    assert_eq!(unsolicited.len(), 2, "one refresh per transition");

    let (playing, _) = unsolicited[0];
    assert_eq!(playing["playerActivity"], "PLAYING");
    assert_eq!(playing["token"], "tok-A");
    assert_eq!(playing["offsetInMilliseconds"], 777);

    let (finished, _) = unsolicited[1];
    assert_eq!(finished["playerActivity"], "FINISHED");
    assert_eq!(finished["token"], "tok-A");
    assert_eq!(finished["offsetInMilliseconds"], 777);
    h.agent.shutdown();
}

#[test]
fn provide_state_echoes_the_request_token() {
    let h = harness();
    speak(&h, "msg-a", "tok-A");
    assert!(wait_transitions(&h, 1));
    h.media.finish();
    assert!(wait_transitions(&h, 2));

    h.context.request_state(42);
    assert!(wait_until(SETTLE, || {
        h.context
            .published()
            .iter()
            .any(|(_, token)| *token == Some(42))
    }));
    let published = h.context.published();
    let (snapshot, _) = published
        .iter()
        .find(|(_, token)| *token == Some(42))
        .expect("snapshot answered");
    assert_eq!(snapshot["playerActivity"], "FINISHED");
    assert_eq!(snapshot["token"], "tok-A");
    h.agent.shutdown();
}

#[test]
fn initial_state_reports_finished_with_empty_token() {
    let h = harness();
    h.context.request_state(7);
    assert!(wait_until(SETTLE, || {
        h.context
            .published()
            .iter()
            .any(|(_, token)| *token == Some(7))
    }));
    let published = h.context.published();
    let (snapshot, _) = published
        .iter()
        .find(|(_, token)| *token == Some(7))
        .expect("snapshot answered");
    assert_eq!(snapshot["playerActivity"], "FINISHED");
    assert_eq!(snapshot["token"], "");
    assert_eq!(snapshot["offsetInMilliseconds"], 0);
    h.agent.shutdown();
}

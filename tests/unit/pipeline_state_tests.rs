//! Unit tests for processor occupancy and at-most-once hand-off.

use std::sync::Arc;

use chat_herald::models::chat::ChatEvent;
use chat_herald::pipeline::intake::DedupScope;
use chat_herald::pipeline::state::{PipelineState, ProcessorState};

fn state_with(texts: &[&str]) -> Arc<PipelineState> {
    let state = Arc::new(PipelineState::new(DedupScope::Seen));
    for text in texts {
        state.enqueue(ChatEvent::new("alice", text, None).expect("valid event"));
    }
    state
}

#[test]
fn empty_queue_stays_idle() {
    let state = state_with(&[]);
    assert!(state.try_begin().is_none());
    assert_eq!(state.processor_state(), ProcessorState::Idle);
}

#[test]
fn begin_marks_busy_and_records_processed() {
    let state = state_with(&["one"]);
    let in_flight = state.try_begin().expect("event available");

    assert_eq!(in_flight.event().text, "one");
    assert_eq!(state.processor_state(), ProcessorState::Busy);
    assert_eq!(state.queue_depth(), 0);
    assert_eq!(state.processed_count(), 1);
}

#[test]
fn second_begin_is_refused_while_busy() {
    let state = state_with(&["one", "two"]);
    let _in_flight = state.try_begin().expect("first event");

    assert!(state.try_begin().is_none());
    assert_eq!(state.queue_depth(), 1, "second event must stay queued");
}

#[test]
fn dropping_in_flight_returns_to_idle() {
    let state = state_with(&["one", "two"]);
    drop(state.try_begin().expect("first event"));

    assert_eq!(state.processor_state(), ProcessorState::Idle);
    let next = state.try_begin().expect("second event");
    assert_eq!(next.event().text, "two");
}

#[test]
fn processed_event_is_not_accepted_again() {
    let state = state_with(&["gm"]);
    drop(state.try_begin().expect("event"));

    let again = ChatEvent::new("alice", "gm", None).expect("valid event");
    assert!(!state.enqueue(again).is_queued());
    assert_eq!(state.queue_depth(), 0);
}

#[test]
fn dedup_scope_is_reported() {
    let state = PipelineState::new(DedupScope::Processed);
    assert_eq!(state.dedup_scope(), DedupScope::Processed);
}

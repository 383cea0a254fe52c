//! Unit tests for status and live event wire shapes.

use chat_herald::models::live::LiveEvent;
use chat_herald::models::status::{SourceState, StatusReport};

fn idle_report() -> StatusReport {
    StatusReport {
        token_address: None,
        token_name: None,
        queue_depth: 0,
        processing: false,
        speaking: false,
        speech_enabled: true,
        processed_count: 0,
        source: SourceState::default(),
    }
}

#[test]
fn source_state_is_internally_tagged() {
    let json = serde_json::to_value(SourceState::Backoff {
        attempt: 2,
        delay_ms: 10_000,
    })
    .expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({ "state": "backoff", "attempt": 2, "delay_ms": 10_000 })
    );
}

#[test]
fn default_source_state_is_stopped() {
    assert_eq!(SourceState::default(), SourceState::Stopped);
}

#[test]
fn speak_event_carries_reply_and_comment() {
    let event = LiveEvent::Speak {
        text: "WAGMI alice".into(),
        user: "alice".into(),
        comment: "gm wagmi".into(),
    };
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "speak");
    assert_eq!(json["text"], "WAGMI alice");
    assert_eq!(json["comment"], "gm wagmi");
}

#[test]
fn status_event_round_trips() {
    let event = LiveEvent::Status {
        status: idle_report(),
    };
    let json = serde_json::to_string(&event).expect("serialize");
    let back: LiveEvent = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, event);
}

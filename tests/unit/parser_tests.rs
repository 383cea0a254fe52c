//! Unit tests for the chat source line parser.

use chat_herald::models::chat::ParsedChat;
use chat_herald::source::parser::{
    decode_colon_heuristic, decode_new_message, decode_record, parse_chunk, parse_line,
};

#[test]
fn new_message_line_is_parsed() {
    assert_eq!(
        parse_line("New message from alice: gm wagmi"),
        Some(ParsedChat::new("alice", "gm wagmi"))
    );
}

#[test]
fn new_message_prefix_is_ignored() {
    let parsed = parse_line("[12:00:01] 💬 New message from bob: wen moon?").expect("parsed");
    assert_eq!(parsed.user, "bob");
    assert_eq!(parsed.text, "wen moon?");
}

#[test]
fn colon_inside_text_is_kept() {
    let parsed = decode_new_message("New message from carol: ratio: 2:1").expect("parsed");
    assert_eq!(parsed.user, "carol");
    assert_eq!(parsed.text, "ratio: 2:1");
}

#[test]
fn json_record_is_parsed_with_id() {
    let line = r#"{"type":"message","user":"dave","text":"lfg","id":"abc"}"#;
    let parsed = parse_line(line).expect("parsed");
    assert_eq!(parsed, ParsedChat::new("dave", "lfg").with_id("abc"));
}

#[test]
fn json_record_field_aliases_are_accepted() {
    let line = r#"{"kind":"chat","username":"erin","message":"hello there"}"#;
    let parsed = decode_record(line).expect("parsed");
    assert_eq!(parsed.user, "erin");
    assert_eq!(parsed.text, "hello there");
    assert_eq!(parsed.id, None);
}

#[test]
fn json_record_of_other_kind_is_not_a_message() {
    let line = r#"{"type":"trade","user":"frank","text":"bought 10"}"#;
    assert_eq!(decode_record(line), None);
}

#[test]
fn json_record_wins_over_colon_heuristic() {
    // The raw line also contains "user: ..." shaped text.
    let line = r#"{"type":"message","user":"gina","text":"note: this is fine"}"#;
    let parsed = parse_line(line).expect("parsed");
    assert_eq!(parsed.user, "gina");
    assert_eq!(parsed.text, "note: this is fine");
}

#[test]
fn colon_heuristic_accepts_simple_sender() {
    assert_eq!(
        decode_colon_heuristic("hank: this chart is wild"),
        Some(ParsedChat::new("hank", "this chart is wild"))
    );
}

#[test]
fn log_level_prefixes_are_not_senders() {
    assert_eq!(parse_line("ERROR: connection reset"), None);
    assert_eq!(parse_line("warn: retrying in 5s"), None);
    assert_eq!(parse_line("info: subscribed to chat"), None);
}

#[test]
fn multi_word_prefix_is_not_a_sender() {
    assert_eq!(parse_line("Connecting to chat server: ok"), None);
}

#[test]
fn blank_and_diagnostic_lines_yield_nothing() {
    assert_eq!(parse_line(""), None);
    assert_eq!(parse_line("    "), None);
    assert_eq!(parse_line("Listening for messages..."), None);
}

#[test]
fn ansi_colored_line_is_parsed() {
    let parsed = parse_line("\x1b[36mNew message from ivy\x1b[0m: gn frens").expect("parsed");
    assert_eq!(parsed.user, "ivy");
    assert_eq!(parsed.text, "gn frens");
}

#[test]
fn chunk_lines_are_independent() {
    let chunk = "garbage line\nNew message from jay: hi\n{not json\nkim: hello\n";
    let parsed = parse_chunk(chunk);
    assert_eq!(
        parsed,
        vec![ParsedChat::new("jay", "hi"), ParsedChat::new("kim", "hello")]
    );
}

#[test]
fn malformed_json_falls_through_without_panicking() {
    assert_eq!(parse_line(r#"{"type":"message","user":"#), None);
}

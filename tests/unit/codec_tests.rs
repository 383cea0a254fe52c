//! Unit tests for the chat line codec.

use bytes::BytesMut;
use chat_herald::source::codec::ChatLineCodec;
use tokio_util::codec::Decoder;

#[test]
fn splits_on_newlines_and_strips_carriage_returns() {
    let mut codec = ChatLineCodec::new();
    let mut buf = BytesMut::from("alice: hi\r\nbob: yo\n");

    assert_eq!(codec.decode(&mut buf).unwrap(), Some("alice: hi".to_owned()));
    assert_eq!(codec.decode(&mut buf).unwrap(), Some("bob: yo".to_owned()));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn partial_line_waits_for_more_input() {
    let mut codec = ChatLineCodec::new();
    let mut buf = BytesMut::from("New message from al");
    assert_eq!(codec.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"ice: gm\n");
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some("New message from alice: gm".to_owned())
    );
}

#[test]
fn trailing_line_without_newline_is_emitted_at_eof() {
    let mut codec = ChatLineCodec::new();
    let mut buf = BytesMut::from("carol: last words");
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    assert_eq!(
        codec.decode_eof(&mut buf).unwrap(),
        Some("carol: last words".to_owned())
    );
}

#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let mut codec = ChatLineCodec::new();
    let mut buf = BytesMut::from(&b"dave: caf\xff\n"[..]);
    let line = codec.decode(&mut buf).unwrap().expect("line");
    assert!(line.starts_with("dave: caf"));
    assert!(line.contains('\u{FFFD}'));
}

#[test]
fn oversized_line_is_skipped_and_counted() {
    let mut codec = ChatLineCodec::with_max_length(16);
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[b'x'; 64]);
    buf.extend_from_slice(b"\nerin: ok\n");

    assert_eq!(codec.decode(&mut buf).unwrap(), Some("erin: ok".to_owned()));
    assert_eq!(codec.oversized_lines(), 1);
}

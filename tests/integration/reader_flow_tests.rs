//! Chat source stream reading into the intake queue.

use std::sync::Arc;

use chat_herald::pipeline::intake::DedupScope;
use chat_herald::pipeline::state::PipelineState;
use chat_herald::source::reader::{ingest_line, run_reader, ReaderStats};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn mixed_output_queues_only_chat_lines() {
    let output = concat!(
        "Connecting to chat server...\n",
        "New message from alice: gm wagmi\n",
        "ERROR: socket hiccup\n",
        "{\"type\":\"message\",\"user\":\"bob\",\"text\":\"lfg\",\"id\":7}\n",
        "New message from alice: gm wagmi\n",
        "\n",
        "carol: wen moon"
    );
    let state = Arc::new(PipelineState::new(DedupScope::Seen));

    let stats = run_reader(
        "stdout",
        output.as_bytes(),
        Arc::clone(&state),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(stats.lines, 7);
    assert_eq!(stats.parsed, 4);
    assert_eq!(stats.queued, 3);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(state.queue_depth(), 3);
}

#[tokio::test]
async fn cancellation_stops_an_open_stream() {
    let (mut writer, reader) = tokio::io::duplex(1024);
    let state = Arc::new(PipelineState::new(DedupScope::Seen));
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run_reader(
        "stderr",
        reader,
        Arc::clone(&state),
        cancel.clone(),
    ));

    writer
        .write_all(b"New message from dave: hello\n")
        .await
        .expect("write");

    let queued = super::test_helpers::wait_until(std::time::Duration::from_secs(2), || {
        state.queue_depth() == 1
    })
    .await;
    assert!(queued);

    cancel.cancel();
    let stats = task.await.expect("reader task");
    assert_eq!(stats.queued, 1);
    drop(writer);
}

#[tokio::test]
async fn oversized_line_does_not_end_the_stream() {
    let mut output = vec![b'x'; 70_000];
    output.extend_from_slice(b"\nerin: still reading\n");
    let state = Arc::new(PipelineState::new(DedupScope::Seen));

    let stats = run_reader(
        "stdout",
        &output[..],
        Arc::clone(&state),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(stats.queued, 1);
    assert_eq!(state.queue_depth(), 1);
}

#[test]
fn record_with_oversized_id_is_still_queued() {
    let state = PipelineState::new(DedupScope::Seen);
    let mut stats = ReaderStats::default();
    let line = format!(
        "{{\"type\":\"message\",\"user\":\"dave\",\"text\":\"gm\",\"id\":\"{}\"}}",
        "z".repeat(400)
    );

    ingest_line(&state, &line, &mut stats);
    ingest_line(&state, "dave: gm", &mut stats);

    assert_eq!(stats.invalid, 0);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.duplicates, 1, "content id matches the plain-text line");
    assert_eq!(state.queue_depth(), 1);
}

//! Chat source reader task.
//!
//! Frames one output stream of the chat source with [`ChatLineCodec`],
//! runs each line through the parser chain, validates the result into a
//! [`ChatEvent`], and offers it to the intake queue. Unparseable and
//! invalid lines are skipped; they never stop the reader.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::models::chat::ChatEvent;
use crate::pipeline::state::PipelineState;
use crate::source::codec::ChatLineCodec;
use crate::source::parser::parse_line;

/// Counters collected by one reader over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Lines framed from the stream.
    pub lines: u64,
    /// Lines that produced a chat tuple.
    pub parsed: u64,
    /// Events appended to the intake queue.
    pub queued: u64,
    /// Events dropped as duplicates.
    pub duplicates: u64,
    /// Chat tuples that failed validation.
    pub invalid: u64,
}

/// Offer one raw line to the pipeline, updating `stats`.
pub fn ingest_line(state: &PipelineState, line: &str, stats: &mut ReaderStats) {
    stats.lines += 1;

    let Some(parsed) = parse_line(line) else {
        return;
    };
    stats.parsed += 1;

    match ChatEvent::from_parsed(&parsed) {
        Ok(event) => {
            if state.enqueue(event).is_queued() {
                stats.queued += 1;
            } else {
                stats.duplicates += 1;
            }
        }
        Err(err) => {
            stats.invalid += 1;
            debug!(%err, "chat tuple rejected");
        }
    }
}

/// Read `stream` until EOF, an I/O error, or cancellation.
pub async fn run_reader<R>(
    stream_name: &'static str,
    stream: R,
    state: Arc<PipelineState>,
    cancel: CancellationToken,
) -> ReaderStats
where
    R: AsyncRead + Unpin + Send,
{
    let span = info_span!("source_reader", stream = stream_name);
    async move {
        let mut framed = FramedRead::new(stream, ChatLineCodec::new());
        let mut stats = ReaderStats::default();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("cancellation received, stopping");
                    break;
                }

                item = framed.next() => match item {
                    None => {
                        debug!("EOF detected");
                        break;
                    }
                    Some(Err(err)) => {
                        warn!(%err, "stream error, stopping");
                        break;
                    }
                    Some(Ok(line)) => ingest_line(&state, &line, &mut stats),
                }
            }
        }

        debug!(
            lines = stats.lines,
            parsed = stats.parsed,
            queued = stats.queued,
            duplicates = stats.duplicates,
            "reader finished"
        );
        stats
    }
    .instrument(span)
    .await
}

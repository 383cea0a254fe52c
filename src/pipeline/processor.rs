//! Sequential processor: one event per tick, never overlapping.
//!
//! On each tick the processor tries to move `Idle -> Busy` and pull the
//! head of the intake queue. The event is generated and announced inside
//! a spawned task so that a panic is contained as a [`JoinError`] at the
//! tick boundary. The [`InFlight`] guard returns the processor to `Idle`
//! whatever the outcome, and a failed event is never re-queued.
//!
//! [`JoinError`]: tokio::task::JoinError

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::pipeline::state::{InFlight, PipelineState};
use crate::respond::generator::ResponseGenerator;
use crate::speech::announcer::{AnnounceOutcome, Announcement, Announcer};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: queue empty or an event already in flight.
    Idle,
    /// One event was answered.
    Processed {
        /// Reply that was announced.
        reply: String,
        /// How the announcement ended.
        announce: AnnounceOutcome,
    },
    /// Processing the event panicked; the event was dropped.
    Aborted,
}

/// Drains the intake queue through the generator and announcer.
#[derive(Clone)]
pub struct Processor {
    state: Arc<PipelineState>,
    generator: Arc<ResponseGenerator>,
    announcer: Arc<Announcer>,
}

impl Processor {
    /// Assemble a processor over shared state.
    #[must_use]
    pub fn new(
        state: Arc<PipelineState>,
        generator: Arc<ResponseGenerator>,
        announcer: Arc<Announcer>,
    ) -> Self {
        Self {
            state,
            generator,
            announcer,
        }
    }

    /// Shared pipeline state.
    #[must_use]
    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Run the tick loop until `cancel` fires.
    #[must_use]
    pub fn spawn(self, tick: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX), "processor started");

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("processor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.process_one().await;
                    }
                }
            }
        })
    }

    /// Execute one tick.
    pub async fn process_one(&self) -> TickOutcome {
        let Some(in_flight) = self.state.try_begin() else {
            return TickOutcome::Idle;
        };

        let event_id = in_flight.event().id.clone();
        let span = info_span!("processor_tick", event_id = %event_id);

        let generator = Arc::clone(&self.generator);
        let announcer = Arc::clone(&self.announcer);
        let task = tokio::spawn(handle(in_flight, generator, announcer).instrument(span));

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                // The InFlight guard was dropped during unwinding.
                error!(event_id = %event_id, %err, "processing task aborted; event dropped");
                TickOutcome::Aborted
            }
        }
    }
}

async fn handle(
    in_flight: InFlight,
    generator: Arc<ResponseGenerator>,
    announcer: Arc<Announcer>,
) -> TickOutcome {
    let event = in_flight.event();
    debug!(user = %event.user, "processing comment");

    let reply = generator.generate(event).await;
    let announcement = Announcement::reply_to(event, reply.clone());
    let announce = announcer.announce(&announcement).await;

    info!(user = %event.user, ?announce, "comment answered");
    drop(in_flight);

    TickOutcome::Processed { reply, announce }
}

//! Explicit pipeline state shared by the source readers and the processor.
//!
//! Producers (one reader task per subprocess stream) call
//! [`PipelineState::enqueue`]; the single consumer calls
//! [`PipelineState::try_begin`]. The queue sits behind a mutex and the
//! `Idle`/`Busy` flag is an atomic, so both sides may run on different
//! worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::models::chat::ChatEvent;
use crate::pipeline::intake::{DedupScope, EnqueueOutcome, IntakeQueue};

/// Processor occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Ready to pull the next event.
    Idle,
    /// One event is in flight.
    Busy,
}

/// Queue, processed history, and processor flag for one pipeline.
#[derive(Debug)]
pub struct PipelineState {
    intake: Mutex<IntakeQueue>,
    busy: AtomicBool,
}

impl PipelineState {
    /// Create idle, empty state.
    #[must_use]
    pub fn new(scope: DedupScope) -> Self {
        Self {
            intake: Mutex::new(IntakeQueue::new(scope)),
            busy: AtomicBool::new(false),
        }
    }

    fn intake(&self) -> MutexGuard<'_, IntakeQueue> {
        self.intake.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer an event to the intake queue.
    pub fn enqueue(&self, event: ChatEvent) -> EnqueueOutcome {
        let id = event.id.clone();
        let outcome = self.intake().enqueue(event);
        debug!(event_id = %id, ?outcome, "intake");
        outcome
    }

    /// Transition `Idle -> Busy` and take the head of the queue.
    ///
    /// Returns `None` (and stays `Idle`) when another event is already in
    /// flight or the queue is empty. The event's id is recorded as
    /// processed before this returns, so it is delivered at most once.
    #[must_use]
    pub fn try_begin(self: &Arc<Self>) -> Option<InFlight> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let event = {
            let mut intake = self.intake();
            intake.dequeue().inspect(|event| {
                intake.mark_processed(event.id.clone());
            })
        };

        match event {
            Some(event) => Some(InFlight {
                state: Arc::clone(self),
                event,
            }),
            None => {
                self.busy.store(false, Ordering::Release);
                None
            }
        }
    }

    /// Current processor occupancy.
    #[must_use]
    pub fn processor_state(&self) -> ProcessorState {
        if self.busy.load(Ordering::Acquire) {
            ProcessorState::Busy
        } else {
            ProcessorState::Idle
        }
    }

    /// Events waiting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.intake().len()
    }

    /// Distinct ids ever handed to the processor.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.intake().processed_count()
    }

    /// Dedup scope in effect.
    #[must_use]
    pub fn dedup_scope(&self) -> DedupScope {
        self.intake().scope()
    }
}

/// An event pulled by the processor.
///
/// Holding this value keeps the processor `Busy`; dropping it returns the
/// processor to `Idle`, whether processing finished, failed, or panicked.
#[derive(Debug)]
pub struct InFlight {
    state: Arc<PipelineState>,
    event: ChatEvent,
}

impl InFlight {
    /// The event being processed.
    #[must_use]
    pub fn event(&self) -> &ChatEvent {
        &self.event
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.busy.store(false, Ordering::Release);
    }
}

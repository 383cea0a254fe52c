//! Deduplicating FIFO intake queue.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::models::chat::{ChatEvent, EventId};

/// Which identities gate [`IntakeQueue::enqueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Only ids already handed to the processor are rejected. An event
    /// produced twice before its first processing is queued twice.
    Processed,
    /// Ids that are queued or already processed are rejected.
    #[default]
    Seen,
}

/// Result of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the tail of the queue.
    Queued,
    /// Dropped: the id was already processed.
    AlreadyProcessed,
    /// Dropped: the id is waiting in the queue ([`DedupScope::Seen`] only).
    AlreadyQueued,
}

impl EnqueueOutcome {
    /// Whether the event was appended.
    #[must_use]
    pub fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// FIFO of pending chat events plus the processed-id history.
///
/// Insertion order is processing order. The processed set only grows; it
/// is never pruned for the life of the process.
#[derive(Debug, Default)]
pub struct IntakeQueue {
    scope: DedupScope,
    pending: VecDeque<ChatEvent>,
    queued_ids: HashSet<EventId>,
    processed: HashSet<EventId>,
}

impl IntakeQueue {
    /// Create an empty queue with the given dedup scope.
    #[must_use]
    pub fn new(scope: DedupScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    /// Dedup scope in effect.
    #[must_use]
    pub fn scope(&self) -> DedupScope {
        self.scope
    }

    /// Append `event` unless its id is already known.
    pub fn enqueue(&mut self, event: ChatEvent) -> EnqueueOutcome {
        if self.processed.contains(&event.id) {
            return EnqueueOutcome::AlreadyProcessed;
        }

        if self.scope == DedupScope::Seen && !self.queued_ids.insert(event.id.clone()) {
            return EnqueueOutcome::AlreadyQueued;
        }

        self.pending.push_back(event);
        EnqueueOutcome::Queued
    }

    /// Pop the head of the queue.
    pub fn dequeue(&mut self) -> Option<ChatEvent> {
        let event = self.pending.pop_front()?;
        if self.scope == DedupScope::Seen {
            self.queued_ids.remove(&event.id);
        }
        Some(event)
    }

    /// Record `id` as handed to the processor. Returns `false` if it was
    /// already recorded.
    pub fn mark_processed(&mut self, id: EventId) -> bool {
        self.processed.insert(id)
    }

    /// Whether `id` has been handed to the processor.
    #[must_use]
    pub fn is_processed(&self, id: &EventId) -> bool {
        self.processed.contains(id)
    }

    /// Number of events waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no events are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of distinct ids ever processed.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}

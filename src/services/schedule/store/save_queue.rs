//! Per-activity write serialization.
//!
//! At most one write per entry is in flight. Later writes for the same entry
//! wait in call order and are released one at a time as earlier ones
//! complete. Writes for different entries are independent.

use std::collections::{BTreeMap, VecDeque};

use crate::error::ScheduleError;
use crate::models::activity::{Activity, ActivityDraft, ActivityId, ActivityPatch};
use crate::models::trip::TripId;

use super::{EntryKey, Generation};

/// Identifies one dispatched write and the generation it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket {
    pub(crate) seq: u64,
    pub(crate) key: EntryKey,
    pub(crate) generation: Generation,
}

impl SaveTicket {
    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// The collaborator call a request stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOp {
    Create { trip_id: TripId, draft: ActivityDraft },
    Update { id: ActivityId, patch: ActivityPatch },
    Delete { id: ActivityId },
}

impl SaveOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// A write ready to be sent to the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub op: SaveOp,
}

/// What the collaborator answered for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveResponse {
    Created(Activity),
    Updated(Activity),
    Deleted(bool),
}

pub type SaveOutcome = std::result::Result<SaveResponse, ScheduleError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionStatus {
    /// Result folded into the cache.
    Applied(Option<Activity>),
    /// Issued before the latest reload; dropped without touching the cache.
    Discarded,
    /// Persistence failed. Creates and deletes are rolled back locally;
    /// updates stay in place and the entry is flagged for refresh.
    Failed(ScheduleError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub status: CompletionStatus,
    /// Next write for the same entry, now released for dispatch.
    pub next: Option<SaveRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueuedWrite {
    Update(ActivityPatch),
    Delete,
}

#[derive(Debug, Default)]
pub(crate) struct SaveQueue {
    next_seq: u64,
    in_flight: BTreeMap<EntryKey, (SaveTicket, WriteKind)>,
    waiting: BTreeMap<EntryKey, VecDeque<QueuedWrite>>,
}

impl SaveQueue {
    pub(crate) fn ticket(&mut self, key: EntryKey, generation: Generation) -> SaveTicket {
        self.next_seq += 1;
        SaveTicket {
            seq: self.next_seq,
            key,
            generation,
        }
    }

    pub(crate) fn is_busy(&self, key: EntryKey) -> bool {
        self.in_flight.contains_key(&key)
    }

    pub(crate) fn has_pending(&self, key: EntryKey) -> bool {
        self.is_busy(key) || self.waiting.get(&key).is_some_and(|queue| !queue.is_empty())
    }

    pub(crate) fn mark_in_flight(&mut self, ticket: SaveTicket, kind: WriteKind) {
        self.in_flight.insert(ticket.key, (ticket, kind));
    }

    /// Whether `ticket` is the write currently in flight for its entry.
    pub(crate) fn is_current(&self, ticket: &SaveTicket) -> bool {
        self.in_flight
            .get(&ticket.key)
            .is_some_and(|(current, _)| current.seq == ticket.seq)
    }

    /// Release the entry for its next write. Returns the kind of the write
    /// that finished, or `None` if `ticket` was not the one in flight.
    pub(crate) fn finish(&mut self, ticket: &SaveTicket) -> Option<WriteKind> {
        if !self.is_current(ticket) {
            return None;
        }
        self.in_flight.remove(&ticket.key).map(|(_, kind)| kind)
    }

    pub(crate) fn in_flight_kind(&self, key: EntryKey) -> Option<WriteKind> {
        self.in_flight.get(&key).map(|(_, kind)| *kind)
    }

    /// Park a write behind the one in flight. Consecutive updates coalesce.
    pub(crate) fn enqueue(&mut self, key: EntryKey, write: QueuedWrite) {
        let queue = self.waiting.entry(key).or_default();
        match (queue.back_mut(), write) {
            (Some(QueuedWrite::Update(pending)), QueuedWrite::Update(patch)) => pending.merge(patch),
            (_, write) => queue.push_back(write),
        }
    }

    pub(crate) fn pop_waiting(&mut self, key: EntryKey) -> Option<QueuedWrite> {
        let queue = self.waiting.get_mut(&key)?;
        let write = queue.pop_front();
        if queue.is_empty() {
            self.waiting.remove(&key);
        }
        write
    }

    pub(crate) fn drop_waiting(&mut self, key: EntryKey) -> usize {
        self.waiting.remove(&key).map_or(0, |queue| queue.len())
    }

    /// Forget every parked write; in-flight tickets are kept so their
    /// results can still be recognised and discarded.
    pub(crate) fn clear_waiting(&mut self) -> usize {
        let dropped = self.waiting.values().map(VecDeque::len).sum();
        self.waiting.clear();
        dropped
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn waiting_count(&self) -> usize {
        self.waiting.values().map(VecDeque::len).sum()
    }

    pub(crate) fn in_flight(&self) -> impl Iterator<Item = &SaveTicket> {
        self.in_flight.values().map(|(ticket, _)| ticket)
    }

    pub(crate) fn waiting_keys(&self) -> impl Iterator<Item = EntryKey> + '_ {
        self.waiting.keys().copied()
    }
}

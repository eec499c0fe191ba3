//! Canonical activity collection for one trip session.
//!
//! The store is sans-IO. Every mutating call updates the cache optimistically
//! and hands back [`SaveRequest`]s for the caller to send to the persistence
//! collaborator; the caller reports each answer through
//! [`ActivityStore::complete`], which may release the next queued write.
//!
//! Entries are stamped with the store generation at the time they were last
//! changed. A full reload bumps the generation, and any result whose ticket
//! predates it is discarded instead of applied.

mod debounce;
mod moves;
mod remote;
mod save_queue;
mod views;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::error::{Result, ScheduleError};
use crate::models::activity::{Activity, ActivityDraft, ActivityId, ActivityPatch};
use crate::models::trip::TripId;

use self::debounce::Debouncer;
use self::save_queue::{QueuedWrite, SaveQueue, WriteKind};
use super::range::RangeChange;

pub use self::moves::{MoveResult, DEFAULT_MOVE_MINUTES, MIN_MOVE_MINUTES};
pub use self::remote::RemoteChange;
pub use self::save_queue::{
    Completion, CompletionStatus, SaveOp, SaveOutcome, SaveRequest, SaveResponse, SaveTicket,
};
pub use self::views::{ActivityStats, ItineraryDay};

/// Store-local handle for an entry. Stable from the optimistic create
/// through confirmation and across reloads of the same activity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey(pub(crate) u64);

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub(crate) u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CachedActivity {
    pub(crate) key: EntryKey,
    pub(crate) activity: Activity,
    pub(crate) generation: Generation,
    pub(crate) needs_refresh: bool,
}

impl CachedActivity {
    fn new(key: EntryKey, activity: Activity, generation: Generation) -> Self {
        Self {
            key,
            activity,
            generation,
            needs_refresh: false,
        }
    }
}

#[derive(Debug)]
pub struct ActivityStore {
    trip_id: TripId,
    generation: Generation,
    loaded: bool,
    next_key: u64,
    entries: BTreeMap<EntryKey, CachedActivity>,
    /// Locally deleted entries kept until the delete is confirmed.
    tombstones: BTreeMap<EntryKey, CachedActivity>,
    queue: SaveQueue,
    debouncer: Debouncer,
    needs_refresh: bool,
}

impl ActivityStore {
    pub fn new(trip_id: TripId, autosave_delay: Duration) -> Self {
        Self {
            trip_id,
            generation: Generation::default(),
            loaded: false,
            next_key: 0,
            entries: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            queue: SaveQueue::default(),
            debouncer: Debouncer::new(autosave_delay),
            needs_refresh: false,
        }
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Some local state is known to disagree with the collaborator.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh || self.entries.values().any(|entry| entry.needs_refresh)
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.queue.in_flight_count()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.waiting_count()
    }

    pub fn pending_debounced_count(&self) -> usize {
        self.debouncer.len()
    }

    pub fn autosave_delay(&self) -> Duration {
        self.debouncer.delay()
    }

    pub fn set_autosave_delay(&mut self, delay: Duration) {
        self.debouncer.set_delay(delay);
    }

    /// Instant at which the next debounced edit becomes due, if any.
    pub fn next_debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.next_due()
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.key_of(id).and_then(|key| self.get_entry(key))
    }

    pub fn get_entry(&self, key: EntryKey) -> Option<&Activity> {
        self.entries.get(&key).map(|entry| &entry.activity)
    }

    /// Cached activities with their entry keys, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryKey, &Activity)> + '_ {
        self.entries.values().map(|entry| (entry.key, &entry.activity))
    }

    pub fn key_of(&self, id: ActivityId) -> Option<EntryKey> {
        self.entries
            .values()
            .find(|entry| entry.activity.id == Some(id))
            .map(|entry| entry.key)
    }

    /// Whether an entry has writes in flight, queued or debounced.
    pub fn has_pending_writes(&self, key: EntryKey) -> bool {
        self.queue.has_pending(key) || self.debouncer.contains(key)
    }

    /// Replace the cache with an authoritative listing.
    ///
    /// Bumps the generation, so every save still in flight becomes stale.
    /// Queued writes, debounced edits and local tombstones are dropped.
    pub fn replace_all(&mut self, activities: Vec<Activity>) -> Generation {
        let known: HashMap<ActivityId, EntryKey> = self
            .entries
            .values()
            .chain(self.tombstones.values())
            .filter_map(|entry| entry.activity.id.map(|id| (id, entry.key)))
            .collect();

        self.generation = self.generation.next();
        let dropped_writes = self.queue.clear_waiting();
        let dropped_edits = self.debouncer.clear();
        if dropped_writes + dropped_edits > 0 {
            warn!(
                "Reload dropped {} queued write(s) and {} debounced edit(s) for trip {}",
                dropped_writes, dropped_edits, self.trip_id
            );
        }

        self.entries.clear();
        self.tombstones.clear();
        self.needs_refresh = false;

        for activity in activities {
            if activity.trip_id != self.trip_id {
                warn!(
                    "Ignoring activity {:?} of trip {} while loading trip {}",
                    activity.id, activity.trip_id, self.trip_id
                );
                continue;
            }
            let Some(id) = activity.id else {
                warn!("Ignoring stored activity '{}' without an id", activity.title);
                continue;
            };

            let key = match known.get(&id) {
                Some(key) if !self.entries.contains_key(key) => *key,
                Some(_) => {
                    warn!("Duplicate activity id {} in listing", id);
                    continue;
                }
                None => self.allocate_key(),
            };
            self.entries
                .insert(key, CachedActivity::new(key, activity, self.generation));
        }

        self.loaded = true;
        info!(
            "Loaded {} activities for trip {} ({})",
            self.entries.len(),
            self.trip_id,
            self.generation
        );
        self.generation
    }

    /// Validate `draft`, insert it optimistically and return the create request.
    pub fn begin_create(&mut self, draft: ActivityDraft) -> Result<(EntryKey, SaveRequest)> {
        let activity = draft.to_activity(self.trip_id, None)?;
        let key = self.allocate_key();
        self.entries
            .insert(key, CachedActivity::new(key, activity, self.generation));

        let ticket = self.queue.ticket(key, self.generation);
        self.queue.mark_in_flight(ticket, WriteKind::Create);
        debug!("Queued create for entry {} ({})", key, self.generation);

        let op = SaveOp::Create {
            trip_id: self.trip_id,
            draft,
        };
        Ok((key, SaveRequest { ticket, op }))
    }

    /// Apply `patch` locally and return the write to send, or `None` when the
    /// write has to wait behind another one for the same activity.
    pub fn begin_update(&mut self, id: ActivityId, patch: ActivityPatch) -> Result<Option<SaveRequest>> {
        let key = self.key_of(id).ok_or(ScheduleError::NotFound(id))?;
        self.begin_update_entry(key, patch)
    }

    pub(crate) fn begin_update_entry(
        &mut self,
        key: EntryKey,
        patch: ActivityPatch,
    ) -> Result<Option<SaveRequest>> {
        self.apply_locally(key, &patch)?;

        let patch = match self.debouncer.take(key) {
            Some(mut pending) => {
                pending.merge(patch);
                pending
            }
            None => patch,
        };
        if patch.is_empty() {
            return Ok(None);
        }

        Ok(self.submit(key, QueuedWrite::Update(patch)))
    }

    /// Apply `patch` locally right away and hold the write until edits to
    /// this activity have been quiet for the autosave delay.
    pub fn stage_debounced(&mut self, id: ActivityId, patch: ActivityPatch, now: Instant) -> Result<()> {
        let key = self.key_of(id).ok_or(ScheduleError::NotFound(id))?;
        self.apply_locally(key, &patch)?;
        self.debouncer.stage(key, patch, now);
        debug!("Debounced edit staged for activity {}", id);
        Ok(())
    }

    /// Release debounced edits whose quiet period has elapsed at `now`.
    pub fn flush_debounced_at(&mut self, now: Instant) -> Vec<SaveRequest> {
        let due = self.debouncer.take_due(now);
        self.submit_debounced(due)
    }

    /// Release every debounced edit regardless of timing.
    pub fn flush_all_debounced(&mut self) -> Vec<SaveRequest> {
        let pending = self.debouncer.take_all();
        self.submit_debounced(pending)
    }

    /// Remove the activity locally and return the delete to send, or `None`
    /// when it has to wait behind another write.
    pub fn begin_delete(&mut self, id: ActivityId) -> Result<Option<SaveRequest>> {
        let key = self.key_of(id).ok_or(ScheduleError::NotFound(id))?;
        self.begin_delete_entry(key)
    }

    pub(crate) fn begin_delete_entry(&mut self, key: EntryKey) -> Result<Option<SaveRequest>> {
        let Some(mut entry) = self.entries.remove(&key) else {
            return Err(ScheduleError::validation("activity", format!("entry {key} is not cached")));
        };

        if self.debouncer.take(key).is_some() {
            debug!("Dropping debounced edit of deleted entry {}", key);
            entry.needs_refresh = true;
        }
        entry.generation = self.generation;
        self.tombstones.insert(key, entry);

        Ok(self.submit(key, QueuedWrite::Delete))
    }

    /// Optimistically apply a planned range change. Every deletion and clamp
    /// goes through the save queue like any other write.
    pub fn apply_range_change(&mut self, change: &RangeChange<EntryKey>) -> Result<Vec<SaveRequest>> {
        let mut requests = Vec::new();

        for clamped in &change.clamped {
            let patch = ActivityPatch::default().dates(clamped.activity_date, clamped.end_date);
            requests.extend(self.begin_update_entry(clamped.key, patch)?);
        }
        for deleted in &change.deleted {
            requests.extend(self.begin_delete_entry(deleted.key)?);
        }

        info!(
            "Trip {} range {} -> {}: {} clamped, {} deleted",
            self.trip_id,
            change.previous,
            change.range,
            change.clamped.len(),
            change.deleted.len()
        );
        Ok(requests)
    }

    /// Fold a collaborator answer into the cache.
    pub fn complete(&mut self, ticket: SaveTicket, outcome: SaveOutcome) -> Completion {
        let kind = self.queue.finish(&ticket);

        let status = match kind {
            Some(kind) if ticket.generation == self.generation => match outcome {
                Ok(response) => self.apply_success(ticket.key, kind, response),
                Err(err) => self.apply_failure(ticket.key, kind, err),
            },
            _ => {
                warn!(
                    "Discarding stale save result for entry {} ({} < {})",
                    ticket.key, ticket.generation, self.generation
                );
                CompletionStatus::Discarded
            }
        };

        Completion {
            status,
            next: self.release_next(ticket.key),
        }
    }

    /// Development-time self check of the bookkeeping. Logs every violation.
    pub fn validate_state(&self) -> bool {
        let mut ok = true;
        let mut check = |condition: bool, message: String| {
            if !condition {
                warn!("Store state check failed: {}", message);
                ok = false;
            }
        };

        let mut seen_ids = HashMap::new();
        for (key, entry) in &self.entries {
            check(entry.key == *key, format!("entry {} stored under {}", entry.key, key));
            check(
                entry.generation <= self.generation,
                format!("entry {} stamped {} ahead of {}", key, entry.generation, self.generation),
            );
            check(
                entry.activity.trip_id == self.trip_id,
                format!("entry {} belongs to trip {}", key, entry.activity.trip_id),
            );
            check(
                entry.activity.validate().is_ok(),
                format!("entry {} holds an invalid activity", key),
            );
            match entry.activity.id {
                Some(id) => check(
                    seen_ids.insert(id, *key).is_none(),
                    format!("activity {} cached twice", id),
                ),
                None => check(
                    self.queue.in_flight_kind(*key) == Some(WriteKind::Create),
                    format!("unsaved entry {} has no create in flight", key),
                ),
            }
        }

        for key in self.tombstones.keys() {
            check(
                !self.entries.contains_key(key),
                format!("entry {} is both cached and deleted", key),
            );
        }
        for key in self.queue.waiting_keys() {
            check(
                self.queue.is_busy(key),
                format!("entry {} has queued writes but nothing in flight", key),
            );
        }
        for key in self.debouncer.keys() {
            check(
                self.entries.contains_key(&key),
                format!("debounced edit for missing entry {}", key),
            );
        }
        for ticket in self.queue.in_flight() {
            check(
                ticket.generation <= self.generation,
                format!("ticket for {} issued in the future", ticket.key),
            );
        }

        ok
    }

    fn allocate_key(&mut self) -> EntryKey {
        self.next_key += 1;
        EntryKey(self.next_key)
    }

    fn apply_locally(&mut self, key: EntryKey, patch: &ActivityPatch) -> Result<()> {
        let generation = self.generation;
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| ScheduleError::validation("activity", format!("entry {key} is not cached")))?;
        let updated = patch.preview(&entry.activity)?;
        entry.activity = updated;
        entry.generation = generation;
        Ok(())
    }

    fn submit_debounced(&mut self, edits: Vec<(EntryKey, ActivityPatch)>) -> Vec<SaveRequest> {
        let mut requests = Vec::new();
        for (key, patch) in edits {
            if !self.entries.contains_key(&key) {
                continue;
            }
            requests.extend(self.submit(key, QueuedWrite::Update(patch)));
        }
        requests
    }

    fn submit(&mut self, key: EntryKey, write: QueuedWrite) -> Option<SaveRequest> {
        if self.queue.is_busy(key) {
            debug!("Entry {} busy; queueing write", key);
            self.queue.enqueue(key, write);
            return None;
        }
        self.dispatch(key, write)
    }

    fn dispatch(&mut self, key: EntryKey, write: QueuedWrite) -> Option<SaveRequest> {
        let id = self
            .entries
            .get(&key)
            .or_else(|| self.tombstones.get(&key))
            .and_then(|entry| entry.activity.id);
        let Some(id) = id else {
            warn!("Dropping write for entry {} without a persisted id", key);
            return None;
        };

        let (kind, op) = match write {
            QueuedWrite::Update(patch) => (WriteKind::Update, SaveOp::Update { id, patch }),
            QueuedWrite::Delete => (WriteKind::Delete, SaveOp::Delete { id }),
        };
        let ticket = self.queue.ticket(key, self.generation);
        self.queue.mark_in_flight(ticket, kind);
        debug!("Dispatching {} for activity {} ({})", op.label(), id, self.generation);
        Some(SaveRequest { ticket, op })
    }

    fn release_next(&mut self, key: EntryKey) -> Option<SaveRequest> {
        if self.queue.is_busy(key) {
            return None;
        }
        while let Some(write) = self.queue.pop_waiting(key) {
            if let Some(request) = self.dispatch(key, write) {
                return Some(request);
            }
        }
        None
    }

    fn apply_success(&mut self, key: EntryKey, kind: WriteKind, response: SaveResponse) -> CompletionStatus {
        let followups = self.has_pending_writes(key);

        match (kind, response) {
            (WriteKind::Create, SaveResponse::Created(created)) => {
                let Some(id) = created.id else {
                    return self.apply_failure(
                        key,
                        kind,
                        ScheduleError::Persistence("created activity has no id".to_string()),
                    );
                };

                // A realtime echo of this insert may already be cached.
                let echoes: Vec<EntryKey> = self
                    .entries
                    .values()
                    .filter(|entry| entry.key != key && entry.activity.id == Some(id))
                    .map(|entry| entry.key)
                    .collect();
                for echo in echoes {
                    self.entries.remove(&echo);
                }

                if let Some(entry) = self.entries.get_mut(&key) {
                    if followups {
                        entry.activity.id = Some(id);
                    } else {
                        entry.activity = created.clone();
                    }
                } else if let Some(tombstone) = self.tombstones.get_mut(&key) {
                    tombstone.activity.id = Some(id);
                }
                debug!("Create confirmed for entry {} as activity {}", key, id);
                CompletionStatus::Applied(Some(created))
            }
            (WriteKind::Update, SaveResponse::Updated(updated)) => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    if !followups {
                        entry.activity = updated.clone();
                        entry.needs_refresh = false;
                    }
                }
                CompletionStatus::Applied(Some(updated))
            }
            (WriteKind::Delete, SaveResponse::Deleted(true)) => {
                self.tombstones.remove(&key);
                CompletionStatus::Applied(None)
            }
            (WriteKind::Delete, SaveResponse::Deleted(false)) => self.apply_failure(
                key,
                kind,
                ScheduleError::Persistence("activity was not deleted".to_string()),
            ),
            (kind, response) => self.apply_failure(
                key,
                kind,
                ScheduleError::Persistence(format!("unexpected response {response:?} to {kind:?}")),
            ),
        }
    }

    fn apply_failure(&mut self, key: EntryKey, kind: WriteKind, err: ScheduleError) -> CompletionStatus {
        error!("Save of entry {} failed ({:?}): {}", key, kind, err);

        match kind {
            WriteKind::Create => {
                self.entries.remove(&key);
                self.tombstones.remove(&key);
                self.debouncer.take(key);
                let dropped = self.queue.drop_waiting(key);
                warn!("Rolled back create of entry {} and {} queued write(s)", key, dropped);
            }
            WriteKind::Update => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.needs_refresh = true;
                }
                self.needs_refresh = true;
            }
            WriteKind::Delete => {
                if let Some(mut restored) = self.tombstones.remove(&key) {
                    if restored.needs_refresh {
                        self.needs_refresh = true;
                    }
                    restored.generation = self.generation;
                    warn!("Restored entry {} after failed delete", key);
                    self.entries.insert(key, restored);
                }
            }
        }

        CompletionStatus::Failed(err)
    }
}

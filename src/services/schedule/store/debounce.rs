use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::models::activity::ActivityPatch;

use super::EntryKey;

#[derive(Debug, Clone)]
struct PendingEdit {
    patch: ActivityPatch,
    last_edit: Instant,
}

/// Coalesces rapid edits per entry until they have been quiet for `delay`.
#[derive(Debug, Clone)]
pub(crate) struct Debouncer {
    delay: Duration,
    pending: BTreeMap<EntryKey, PendingEdit>,
}

impl Debouncer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    pub(crate) fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Fold `patch` into the pending edit for `key` and restart its quiet period.
    pub(crate) fn stage(&mut self, key: EntryKey, patch: ActivityPatch, now: Instant) {
        match self.pending.get_mut(&key) {
            Some(edit) => {
                edit.patch.merge(patch);
                edit.last_edit = now;
            }
            None => {
                self.pending.insert(
                    key,
                    PendingEdit {
                        patch,
                        last_edit: now,
                    },
                );
            }
        }
    }

    /// Remove and return the edits that have been quiet for at least `delay`.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(EntryKey, ActivityPatch)> {
        let due: Vec<EntryKey> = self
            .pending
            .iter()
            .filter(|(_, edit)| now.saturating_duration_since(edit.last_edit) >= self.delay)
            .map(|(key, _)| *key)
            .collect();

        due.into_iter()
            .filter_map(|key| self.take(key).map(|patch| (key, patch)))
            .collect()
    }

    pub(crate) fn take(&mut self, key: EntryKey) -> Option<ActivityPatch> {
        self.pending.remove(&key).map(|edit| edit.patch)
    }

    pub(crate) fn take_all(&mut self) -> Vec<(EntryKey, ActivityPatch)> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(key, edit)| (key, edit.patch))
            .collect()
    }

    pub(crate) fn contains(&self, key: EntryKey) -> bool {
        self.pending.contains_key(&key)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = EntryKey> + '_ {
        self.pending.keys().copied()
    }

    /// Earliest instant at which some pending edit becomes due.
    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|edit| edit.last_edit + self.delay)
            .min()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::activity::{Activity, ActivityId};

use super::{ActivityStore, CachedActivity};

/// Row-level change pushed by the hosted store's realtime feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "record")]
pub enum RemoteChange {
    #[serde(rename = "INSERT")]
    Inserted(Activity),
    #[serde(rename = "UPDATE")]
    Updated(Activity),
    #[serde(rename = "DELETE")]
    Deleted(ActivityId),
}

impl ActivityStore {
    /// Fold a remote change into the cache. Local writes still pending for
    /// the same activity win until the next refresh. Returns whether the
    /// cache changed.
    pub fn apply_remote(&mut self, change: RemoteChange) -> bool {
        match change {
            RemoteChange::Inserted(activity) => {
                let Some(id) = activity.id else {
                    return false;
                };
                if activity.trip_id != self.trip_id || self.is_known(id) {
                    return false;
                }
                let key = self.allocate_key();
                debug!("Remote insert of activity {} as entry {}", id, key);
                self.entries
                    .insert(key, CachedActivity::new(key, activity, self.generation));
                true
            }
            RemoteChange::Updated(activity) => {
                if activity.trip_id != self.trip_id {
                    return false;
                }
                let Some(key) = activity.id.and_then(|id| self.key_of(id)) else {
                    return false;
                };
                if self.has_pending_writes(key) {
                    debug!("Ignoring remote update of entry {} with local writes pending", key);
                    return false;
                }
                let generation = self.generation;
                match self.entries.get_mut(&key) {
                    Some(entry) => {
                        entry.activity = activity;
                        entry.generation = generation;
                        entry.needs_refresh = false;
                        true
                    }
                    None => false,
                }
            }
            RemoteChange::Deleted(id) => {
                let Some(key) = self.key_of(id) else {
                    return false;
                };
                self.debouncer.take(key);
                debug!("Remote delete of activity {} (entry {})", id, key);
                self.entries.remove(&key).is_some()
            }
        }
    }

    fn is_known(&self, id: ActivityId) -> bool {
        self.entries
            .values()
            .chain(self.tombstones.values())
            .any(|entry| entry.activity.id == Some(id))
    }
}

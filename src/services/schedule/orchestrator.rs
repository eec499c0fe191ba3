//! Per-trip session tying the store, the drag controller and the range
//! extender to a persistence collaborator.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use log::{info, warn};

use crate::error::{Result, ScheduleError};
use crate::models::activity::{Activity, ActivityDraft, ActivityId, ActivityPatch};
use crate::models::settings::CalendarSettings;
use crate::models::trip::{ExtendDirection, Trip, TripId, TripRange};
use crate::services::repository::ActivityRepository;

use super::conflicts::{ConflictDetector, ConflictMap, ConflictWarning};
use super::drag::{DragDropController, DragOutcome};
use super::range::{RangeChange, TripRangeExtender};
use super::store::{
    ActivityStats, ActivityStore, CompletionStatus, EntryKey, Generation, ItineraryDay, MoveResult,
    RemoteChange, SaveOp, SaveOutcome, SaveRequest, SaveResponse,
};
use super::time_slots::slots_for;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
}

pub struct ScheduleOrchestrator<R> {
    repo: R,
    trip_id: TripId,
    range: TripRange,
    settings: CalendarSettings,
    store: ActivityStore,
    drag: DragDropController,
    loading: bool,
    save_status: SaveStatus,
}

impl<R: ActivityRepository> ScheduleOrchestrator<R> {
    /// Start a session for a persisted trip. Activities are not loaded
    /// until [`load`](Self::load) is called.
    pub fn new(repo: R, trip: &Trip, settings: CalendarSettings) -> Result<Self> {
        let trip_id = trip
            .id
            .ok_or_else(|| ScheduleError::validation("trip", "trip has not been saved"))?;
        settings.validate()?;

        let store = ActivityStore::new(trip_id, Duration::from_millis(settings.autosave_delay_ms));
        Ok(Self {
            repo,
            trip_id,
            range: trip.range,
            settings,
            store,
            drag: DragDropController::new(),
            loading: false,
            save_status: SaveStatus::Idle,
        })
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn range(&self) -> TripRange {
        self.range
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CalendarSettings) -> Result<()> {
        settings.validate()?;
        self.store
            .set_autosave_delay(Duration::from_millis(settings.autosave_delay_ms));
        self.settings = settings;
        Ok(())
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn in_flight_count(&self) -> usize {
        self.store.in_flight_count()
    }

    pub fn pending_debounced_count(&self) -> usize {
        self.store.pending_debounced_count()
    }

    pub fn needs_refresh(&self) -> bool {
        self.store.needs_refresh()
    }

    pub fn generation(&self) -> Generation {
        self.store.generation()
    }

    pub fn load(&mut self) -> Result<()> {
        self.reload()
    }

    /// Drop all local optimistic state and reload from the collaborator.
    pub fn force_refresh_activities(&mut self) -> Result<()> {
        info!("Force refresh of trip {}", self.trip_id);
        self.reload()
    }

    pub fn get_activities_by_date(&self) -> BTreeMap<NaiveDate, Vec<&Activity>> {
        self.store.group_by_date()
    }

    pub fn itinerary(&self) -> Vec<ItineraryDay> {
        self.store.itinerary(&self.range)
    }

    pub fn get_activity_stats(&self) -> ActivityStats {
        self.store.stats()
    }

    pub fn time_slots(&self) -> Vec<String> {
        slots_for(&self.settings)
    }

    pub fn conflicts_on(&self, date: NaiveDate) -> ConflictMap<ActivityId> {
        self.store.conflicts_on(date, &self.detector())
    }

    pub fn conflict_warnings_on(&self, date: NaiveDate) -> Vec<ConflictWarning> {
        self.store.conflict_warnings_on(date, &self.detector())
    }

    pub fn create_activity(&mut self, draft: ActivityDraft) -> Result<Activity> {
        let (key, request) = self.store.begin_create(draft)?;
        let statuses = self.dispatch(request);
        self.first_result(key, statuses)
    }

    pub fn update_activity(&mut self, id: ActivityId, patch: ActivityPatch) -> Result<Activity> {
        let key = self.store.key_of(id).ok_or(ScheduleError::NotFound(id))?;
        let statuses = match self.store.begin_update(id, patch)? {
            Some(request) => self.dispatch(request),
            None => Vec::new(),
        };
        self.first_result(key, statuses)
    }

    /// Update the cached copy now; persist once edits go quiet.
    pub fn update_activity_debounced(&mut self, id: ActivityId, patch: ActivityPatch) -> Result<()> {
        self.update_activity_debounced_at(id, patch, Instant::now())
    }

    pub fn update_activity_debounced_at(
        &mut self,
        id: ActivityId,
        patch: ActivityPatch,
        now: Instant,
    ) -> Result<()> {
        self.store.stage_debounced(id, patch, now)
    }

    /// Persist debounced edits that have gone quiet. Call periodically.
    pub fn tick(&mut self) -> Result<usize> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Result<usize> {
        let requests = self.store.flush_debounced_at(now);
        self.dispatch_batch(requests)
    }

    /// Persist every debounced edit immediately.
    pub fn flush_pending(&mut self) -> Result<usize> {
        let requests = self.store.flush_all_debounced();
        self.dispatch_batch(requests)
    }

    pub fn delete_activity(&mut self, id: ActivityId) -> Result<()> {
        let Some(request) = self.store.begin_delete(id)? else {
            return Ok(());
        };

        match self.dispatch(request).into_iter().next() {
            Some(CompletionStatus::Failed(err)) => Err(err),
            _ => Ok(()),
        }
    }

    /// Effects an extension would have, without applying it.
    pub fn preview_extend(&self, direction: ExtendDirection, days: i64) -> Result<RangeChange<EntryKey>> {
        TripRangeExtender::plan(self.range, direction, days, self.store.entries())
    }

    /// Move one boundary of the trip and reconcile its activities in the
    /// same step. On success the activities are reloaded from the
    /// collaborator.
    pub fn extend_trip(&mut self, direction: ExtendDirection, days: i64) -> Result<RangeChange<EntryKey>> {
        let change = self.preview_extend(direction, days)?;
        if change.is_noop() {
            return Ok(change);
        }

        if let Err(err) = self.flush_pending() {
            warn!("Pending edits failed to save before range change: {}", err);
        }

        let stored = self
            .repo
            .update_trip_range(self.trip_id, change.range.start(), change.range.end())
            .map_err(ScheduleError::persistence)?;
        self.range = stored;

        let requests = self.store.apply_range_change(&change)?;
        let total = requests.len();
        let failed = requests
            .into_iter()
            .flat_map(|request| self.dispatch(request))
            .filter(|status| matches!(status, CompletionStatus::Failed(_)))
            .count();

        if failed > 0 {
            self.store.mark_needs_refresh();
            return Err(ScheduleError::Reconciliation { failed, total });
        }

        if let Err(err) = self.reload() {
            warn!("Refresh after range change failed: {}", err);
            self.store.mark_needs_refresh();
        }
        Ok(change)
    }

    /// Start dragging a cached activity. Returns whether a drag started.
    pub fn begin_drag(&mut self, id: ActivityId) -> bool {
        match self.store.get(id) {
            Some(activity) => self.drag.begin(activity),
            None => false,
        }
    }

    pub fn drag_hover(&mut self, date: NaiveDate, slot: NaiveTime) {
        self.drag.hover(date, slot);
    }

    pub fn drag_leave(&mut self) {
        self.drag.leave();
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn drag(&self) -> &DragDropController {
        &self.drag
    }

    /// Finish the drag gesture. A drop is applied to the store and saved;
    /// conflicts on the destination day are reported but never block it.
    pub fn release_drag(&mut self) -> Result<Option<MoveResult>> {
        let command = match self.drag.release() {
            Some(DragOutcome::Dropped(command)) => command,
            Some(DragOutcome::Cancelled) | None => return Ok(None),
        };

        let result = self.store.apply_move(&command, &self.settings)?;
        for request in result.requests.clone() {
            if let Some(CompletionStatus::Failed(err)) = self.dispatch(request).into_iter().next() {
                return Err(err);
            }
        }
        Ok(Some(result))
    }

    pub fn apply_remote_change(&mut self, change: RemoteChange) -> bool {
        self.store.apply_remote(change)
    }

    pub fn validate_state(&self) -> bool {
        let consistent = self.store.validate_state();
        if self.loading {
            warn!("State check while a load is in progress");
            return false;
        }
        consistent
    }

    fn detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.settings.time_slot_duration)
    }

    fn reload(&mut self) -> Result<()> {
        self.loading = true;
        let listed = self.repo.list_activities(self.trip_id);
        self.loading = false;

        let activities = listed.map_err(ScheduleError::persistence)?;
        self.store.replace_all(activities);
        Ok(())
    }

    fn execute(&self, op: &SaveOp) -> SaveOutcome {
        let result = match op {
            SaveOp::Create { trip_id, draft } => self
                .repo
                .create_activity(*trip_id, draft)
                .map(SaveResponse::Created),
            SaveOp::Update { id, patch } => self
                .repo
                .update_activity(*id, patch)
                .map(SaveResponse::Updated),
            SaveOp::Delete { id } => self.repo.delete_activity(*id).map(SaveResponse::Deleted),
        };
        result.map_err(ScheduleError::persistence)
    }

    /// Send `request` and every write it releases for the same activity.
    fn dispatch(&mut self, request: SaveRequest) -> Vec<CompletionStatus> {
        let mut statuses = Vec::new();
        let mut pending = Some(request);

        while let Some(request) = pending.take() {
            self.save_status = SaveStatus::Saving;
            let outcome = self.execute(&request.op);
            let completion = self.store.complete(request.ticket, outcome);

            match &completion.status {
                CompletionStatus::Applied(_) => self.save_status = SaveStatus::Saved,
                CompletionStatus::Failed(err) => self.save_status = SaveStatus::Failed(err.to_string()),
                CompletionStatus::Discarded => {}
            }
            statuses.push(completion.status);
            pending = completion.next;
        }

        statuses
    }

    fn dispatch_batch(&mut self, requests: Vec<SaveRequest>) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;

        for request in requests {
            for status in self.dispatch(request) {
                match status {
                    CompletionStatus::Applied(_) => written += 1,
                    CompletionStatus::Failed(err) => {
                        first_error.get_or_insert(err);
                    }
                    CompletionStatus::Discarded => {}
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }

    fn first_result(&self, key: EntryKey, statuses: Vec<CompletionStatus>) -> Result<Activity> {
        match statuses.into_iter().next() {
            Some(CompletionStatus::Failed(err)) => Err(err),
            _ => self
                .store
                .get_entry(key)
                .cloned()
                .ok_or_else(|| ScheduleError::Persistence("activity is no longer cached".to_string())),
        }
    }
}

use chrono::{NaiveDate, NaiveTime, Timelike};
use log::debug;

use crate::error::{Result, ScheduleError};
use crate::models::activity::{Activity, ActivityId, ActivityPatch};
use crate::models::settings::CalendarSettings;
use crate::services::schedule::conflicts::{ConflictDetector, ConflictMap};
use crate::services::schedule::drag::MoveCommand;
use crate::utils::date::{add_days, add_minutes_clamped, days_between};

use super::{ActivityStore, EntryKey, SaveRequest};

/// Shortest duration a moved activity keeps.
pub const MIN_MOVE_MINUTES: i64 = 15;
/// Duration given to an activity that had no usable times before the move.
pub const DEFAULT_MOVE_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub moved: ActivityId,
    pub swapped_with: Option<ActivityId>,
    pub requests: Vec<SaveRequest>,
    /// Conflicts on the destination date after the move. Advisory only.
    pub conflicts: ConflictMap<ActivityId>,
}

/// Dates and times placing `activity` at `date`/`slot` with its duration and
/// day span preserved.
fn relocation(activity: &Activity, date: NaiveDate, slot: NaiveTime) -> Result<ActivityPatch> {
    let minutes = activity
        .duration_minutes()
        .map(|minutes| minutes.max(MIN_MOVE_MINUTES))
        .unwrap_or(DEFAULT_MOVE_MINUTES);
    let end_time = add_minutes_clamped(slot, minutes);

    let shift = days_between(activity.activity_date, date);
    let end_date = add_days(activity.end_date, shift)
        .ok_or_else(|| ScheduleError::validation("end_date", "moved activity ends out of range"))?;

    Ok(ActivityPatch::default()
        .dates(date, end_date)
        .times(Some(slot), Some(end_time)))
}

impl ActivityStore {
    /// Apply a dropped drag gesture and re-run conflict detection for the
    /// destination date. Conflicts never block the move.
    pub fn apply_move(&mut self, command: &MoveCommand, settings: &CalendarSettings) -> Result<MoveResult> {
        let detector = ConflictDetector::new(settings.time_slot_duration);
        let id = command.activity_id;
        let key = self.key_of(id).ok_or(ScheduleError::NotFound(id))?;
        let source = self
            .get_entry(key)
            .cloned()
            .ok_or(ScheduleError::NotFound(id))?;

        let mut result = MoveResult {
            moved: id,
            swapped_with: None,
            requests: Vec::new(),
            conflicts: ConflictMap::new(),
        };

        if source.activity_date == command.target_date && source.start_time == Some(command.target_slot) {
            result.conflicts = self.conflicts_on(command.target_date, &detector);
            return Ok(result);
        }

        let patch = relocation(&source, command.target_date, command.target_slot)?;
        patch.preview(&source)?;

        let swap = match (settings.swap_on_occupied_slot, source.start_time) {
            (true, Some(origin_slot)) => self
                .occupant_of(key, command.target_date, command.target_slot)
                .map(|(other_key, other)| -> Result<_> {
                    let other_patch = relocation(&other, source.activity_date, origin_slot)?;
                    other_patch.preview(&other)?;
                    Ok((other_key, other.id, other_patch))
                })
                .transpose()?,
            _ => None,
        };

        result.requests.extend(self.begin_update_entry(key, patch)?);
        if let Some((other_key, other_id, other_patch)) = swap {
            debug!("Swapping activity {} with {:?}", id, other_id);
            result.requests.extend(self.begin_update_entry(other_key, other_patch)?);
            result.swapped_with = other_id;
        }

        result.conflicts = self.conflicts_on(command.target_date, &detector);
        Ok(result)
    }

    /// Persisted timed activity, other than `exclude`, starting on `date`
    /// within the hour of `slot`.
    fn occupant_of(&self, exclude: EntryKey, date: NaiveDate, slot: NaiveTime) -> Option<(EntryKey, Activity)> {
        self.entries
            .values()
            .filter(|entry| entry.key != exclude && entry.activity.id.is_some())
            .filter(|entry| entry.activity.activity_date == date)
            .find(|entry| {
                entry
                    .activity
                    .start_time
                    .is_some_and(|start| start.hour() == slot.hour())
            })
            .map(|entry| (entry.key, entry.activity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityDraft;
    use crate::models::trip::TripId;
    use crate::utils::date::{parse_date, parse_time};
    use pretty_assertions::assert_eq;

    fn d(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn t(value: &str) -> NaiveTime {
        parse_time(value).unwrap()
    }

    #[test]
    fn test_relocation_keeps_duration_and_span() {
        let hotel = ActivityDraft::new("Hotel")
            .on(d("2024-07-28"))
            .until(d("2024-07-30"))
            .at(t("15:00"), Some(t("16:30")))
            .to_activity(TripId(1), Some(ActivityId(1)))
            .unwrap();

        let patch = relocation(&hotel, d("2024-07-29"), t("10:00")).unwrap();
        let moved = patch.preview(&hotel).unwrap();

        assert_eq!(moved.activity_date, d("2024-07-29"));
        assert_eq!(moved.end_date, d("2024-07-31"));
        assert_eq!(moved.start_time, Some(t("10:00")));
        assert_eq!(moved.end_time, Some(t("11:30")));
    }

    #[test]
    fn test_relocation_of_untimed_activity_gets_default_hour() {
        let dinner = ActivityDraft::new("Dinner")
            .on(d("2024-07-28"))
            .to_activity(TripId(1), Some(ActivityId(1)))
            .unwrap();

        let moved = relocation(&dinner, d("2024-07-28"), t("19:00"))
            .unwrap()
            .preview(&dinner)
            .unwrap();
        assert_eq!(moved.end_time, Some(t("20:00")));
    }

    #[test]
    fn test_relocation_enforces_minimum_duration() {
        let call = ActivityDraft::new("Call")
            .on(d("2024-07-28"))
            .at(t("09:00"), Some(t("09:05")))
            .to_activity(TripId(1), Some(ActivityId(1)))
            .unwrap();

        let moved = relocation(&call, d("2024-07-28"), t("11:00"))
            .unwrap()
            .preview(&call)
            .unwrap();
        assert_eq!(moved.end_time, Some(t("11:15")));
    }

    #[test]
    fn test_relocation_late_slot_clamps_end_of_day() {
        let show = ActivityDraft::new("Show")
            .on(d("2024-07-28"))
            .at(t("20:00"), Some(t("22:00")))
            .to_activity(TripId(1), Some(ActivityId(1)))
            .unwrap();

        let moved = relocation(&show, d("2024-07-28"), t("23:00"))
            .unwrap()
            .preview(&show)
            .unwrap();
        assert_eq!(moved.end_time, Some(t("23:59")));
    }
}

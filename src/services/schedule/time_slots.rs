//! Time-slot labels for one calendar day.

use chrono::NaiveTime;

use crate::models::settings::CalendarSettings;
use crate::utils::date::{minutes_of_day, time_from_minutes};

const HOURS_PER_DAY: u32 = 24;

/// Produce `HH:MM` slot labels from `start_hour:00` through `end_hour:00`
/// inclusive, stepping by `duration_minutes`.
///
/// `start_hour > end_hour` yields an empty grid. A duration that does not
/// divide 60 still steps evenly from the start; slots then straddle hour
/// boundaries. A zero duration yields an empty grid. Hours past 24 are
/// treated as 24.
pub fn generate_slots(start_hour: u32, end_hour: u32, duration_minutes: u32) -> Vec<String> {
    if start_hour > end_hour || duration_minutes == 0 {
        return Vec::new();
    }

    let first = start_hour.min(HOURS_PER_DAY) * 60;
    let last = end_hour.min(HOURS_PER_DAY) * 60;
    (first..=last)
        .step_by(duration_minutes as usize)
        .map(|minute| format!("{:02}:{:02}", minute / 60, minute % 60))
        .collect()
}

/// Slot grid for the given calendar settings.
pub fn slots_for(settings: &CalendarSettings) -> Vec<String> {
    generate_slots(
        settings.start_hour,
        settings.end_hour,
        settings.time_slot_duration,
    )
}

/// Start of the slot that contains `time`, aligned to midnight.
pub fn slot_start(time: NaiveTime, duration_minutes: u32) -> NaiveTime {
    if duration_minutes == 0 {
        return time;
    }
    let minutes = minutes_of_day(time);
    let aligned = minutes - minutes % duration_minutes;
    time_from_minutes(aligned as i64).unwrap_or(time)
}

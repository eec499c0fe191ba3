// Settings module
// Calendar view configuration owned by the UI layer

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Slot granularities the calendar grid supports.
pub const SLOT_DURATIONS: [u32; 3] = [15, 30, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarViewType {
    #[default]
    Day,
    Week,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub view: CalendarViewType,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Minutes per grid slot; one of [`SLOT_DURATIONS`].
    pub time_slot_duration: u32,
    pub show_weekends: bool,
    /// Quiet period before a debounced edit is written.
    pub autosave_delay_ms: u64,
    /// Dropping onto a slot whose hour is taken swaps the two activities.
    pub swap_on_occupied_slot: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            view: CalendarViewType::Day,
            start_hour: 8,
            end_hour: 20,
            time_slot_duration: 30,
            show_weekends: true,
            autosave_delay_ms: 2000,
            swap_on_occupied_slot: false,
        }
    }
}

impl CalendarSettings {
    pub fn validate(&self) -> Result<()> {
        if self.start_hour > 24 || self.end_hour > 24 {
            return Err(ScheduleError::validation(
                "start_hour",
                "calendar hours must be between 0 and 24",
            ));
        }

        if !SLOT_DURATIONS.contains(&self.time_slot_duration) {
            return Err(ScheduleError::validation(
                "time_slot_duration",
                format!(
                    "slot duration must be one of {:?} minutes, got {}",
                    SLOT_DURATIONS, self.time_slot_duration
                ),
            ));
        }

        Ok(())
    }
}

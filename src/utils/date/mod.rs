// Date utility functions
// Calendar-date and time-of-day helpers shared by the scheduling core

use chrono::{Days, NaiveDate, NaiveTime, Timelike};

/// Wire format for calendar dates (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wire format for times of day (`HH:MM`).
pub const TIME_FORMAT: &str = "%H:%M";

const MINUTES_PER_DAY: i64 = 24 * 60;

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a time of day. Accepts `HH:MM` and the `HH:MM:SS` form hosted
/// stores tend to return; seconds are dropped.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
        .and_then(|time| time.with_second(0))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Build a time from minutes since midnight. `None` outside `0..1440`.
pub fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    if !(0..MINUTES_PER_DAY).contains(&minutes) {
        return None;
    }
    NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
}

/// Add minutes to a time of day without wrapping past midnight.
/// Results are clamped to `00:00..=23:59`.
pub fn add_minutes_clamped(time: NaiveTime, minutes: i64) -> NaiveTime {
    let total = (minutes_of_day(time) as i64 + minutes).clamp(0, MINUTES_PER_DAY - 1);
    time_from_minutes(total).unwrap_or(time)
}

/// Signed day arithmetic. `None` when the result leaves chrono's date range.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    }
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Serde adapter for `NaiveDate` as `YYYY-MM-DD`.
pub mod serde_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'")))
    }
}

/// Serde adapter for `Option<NaiveTime>` as `HH:MM`.
pub mod serde_time_opt {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&super::format_time(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => super::parse_time(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time '{value}'"))),
        }
    }
}

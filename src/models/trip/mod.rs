//! Trip model: identity and the authoritative calendar date range.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::utils::date::{add_days, days_between, serde_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub i64);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive date range a trip covers. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTripRange")]
pub struct TripRange {
    #[serde(with = "serde_date")]
    start: NaiveDate,
    #[serde(with = "serde_date")]
    end: NaiveDate,
}

impl TripRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ScheduleError::validation(
                "end_date",
                format!("trip end {end} is before start {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days in the range (at least 1).
    pub fn day_count(&self) -> i64 {
        days_between(self.start, self.end) + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date of the range in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.day_count()).filter_map(move |offset| add_days(start, offset))
    }

    /// 1-based position of `date` within the trip.
    pub fn day_number(&self, date: NaiveDate) -> Option<u32> {
        self.contains(date)
            .then(|| (days_between(self.start, date) + 1) as u32)
    }
}

#[derive(Deserialize)]
struct RawTripRange {
    #[serde(with = "serde_date")]
    start: NaiveDate,
    #[serde(with = "serde_date")]
    end: NaiveDate,
}

impl TryFrom<RawTripRange> for TripRange {
    type Error = ScheduleError;

    fn try_from(raw: RawTripRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl fmt::Display for TripRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Which boundary of the trip a day-count change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendDirection {
    Before,
    After,
}

impl fmt::Display for ExtendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Option<TripId>,
    pub name: String,
    pub range: TripRange,
}

impl Trip {
    pub fn new(name: impl Into<String>, range: TripRange) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScheduleError::validation("name", "trip name cannot be empty"));
        }
        Ok(Self {
            id: None,
            name,
            range,
        })
    }
}

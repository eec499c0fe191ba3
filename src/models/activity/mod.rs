// Activity module
// Dated, optionally timed itinerary items attached to a trip

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::trip::TripId;
use crate::utils::date::{days_between, minutes_of_day, serde_date, serde_time_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub i64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Meeting,
    Meal,
    Travel,
    Flight,
    Accommodation,
    Event,
    Break,
    Other,
}

impl ActivityType {
    pub fn all() -> &'static [ActivityType] {
        &[
            Self::Meeting,
            Self::Meal,
            Self::Travel,
            Self::Flight,
            Self::Accommodation,
            Self::Event,
            Self::Break,
            Self::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Meal => "meal",
            Self::Travel => "travel",
            Self::Flight => "flight",
            Self::Accommodation => "accommodation",
            Self::Event => "event",
            Self::Break => "break",
            Self::Other => "other",
        }
    }

    /// Parse a stored type name. Unknown names map to `Other`.
    pub fn from_name(name: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::Other)
    }

    /// Meetings and events count as company visits in trip statistics.
    pub fn is_visit(&self) -> bool {
        matches!(self, Self::Meeting | Self::Event)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Brl,
    Usd,
    Eur,
    Gbp,
    Dkk,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Brl => "BRL",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Dkk => "DKK",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "BRL" => Some(Self::Brl),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "DKK" => Some(Self::Dkk),
            _ => None,
        }
    }
}

/// A dated itinerary item. `activity_date..=end_date` is the set of days the
/// activity is active on; times belong to the first (governing) day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Option<ActivityId>,
    pub trip_id: TripId,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "serde_date")]
    pub activity_date: NaiveDate,
    #[serde(with = "serde_date")]
    pub end_date: NaiveDate,
    #[serde(with = "serde_time_opt", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "serde_time_opt", default)]
    pub end_time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub is_confirmed: bool,
    pub location: Option<String>,
    pub host: Option<String>,
    pub cost: Option<f64>,
    pub currency: Option<Currency>,
    pub notes: Option<String>,
}

impl Activity {
    /// Validate invariants that must hold for every stored activity.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ScheduleError::validation("title", "activity title cannot be empty"));
        }

        if self.end_date < self.activity_date {
            return Err(ScheduleError::validation(
                "end_date",
                format!(
                    "end date {} is before activity date {}",
                    self.end_date, self.activity_date
                ),
            ));
        }

        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ScheduleError::validation("cost", "cost must be a positive amount"));
            }
        }

        Ok(())
    }

    /// Activities without any time are all-day and never conflict.
    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }

    pub fn is_multi_day(&self) -> bool {
        self.end_date > self.activity_date
    }

    /// Whether the activity is active on `date`.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.activity_date <= date && date <= self.end_date
    }

    /// Number of days spanned, counting both ends.
    pub fn span_days(&self) -> i64 {
        days_between(self.activity_date, self.end_date) + 1
    }

    /// Scheduled length in minutes when both times are set and ordered.
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end > start => {
                Some(minutes_of_day(end) as i64 - minutes_of_day(start) as i64)
            }
            _ => None,
        }
    }
}

/// Form data for a new activity. Nothing is persisted until validated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityDraft {
    pub title: String,
    pub description: Option<String>,
    pub activity_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub activity_type: Option<ActivityType>,
    pub is_confirmed: bool,
    pub location: Option<String>,
    pub host: Option<String>,
    pub cost: Option<f64>,
    pub currency: Option<Currency>,
    pub notes: Option<String>,
}

impl ActivityDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.activity_date = Some(date);
        self
    }

    /// Make the activity span through `end_date` (inclusive).
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn at(mut self, start: NaiveTime, end: Option<NaiveTime>) -> Self {
        self.start_time = Some(start);
        self.end_time = end;
        self
    }

    pub fn kind(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn confirmed(mut self, is_confirmed: bool) -> Self {
        self.is_confirmed = is_confirmed;
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn cost(mut self, amount: f64, currency: Currency) -> Self {
        self.cost = Some(amount);
        self.currency = Some(currency);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Required-field check performed before any persistence call.
    pub fn validate(&self) -> Result<()> {
        self.to_activity(TripId(0), None).map(|_| ())
    }

    /// Materialize the draft as an activity of `trip_id`.
    pub fn to_activity(&self, trip_id: TripId, id: Option<ActivityId>) -> Result<Activity> {
        if self.title.trim().is_empty() {
            return Err(ScheduleError::validation("title", "activity title cannot be empty"));
        }

        let activity_date = self
            .activity_date
            .ok_or_else(|| ScheduleError::validation("activity_date", "activity date is required"))?;

        let activity = Activity {
            id,
            trip_id,
            title: self.title.clone(),
            description: self.description.clone(),
            activity_date,
            end_date: self.end_date.unwrap_or(activity_date),
            start_time: self.start_time,
            end_time: self.end_time,
            activity_type: self.activity_type.unwrap_or(ActivityType::Other),
            is_confirmed: self.is_confirmed,
            location: self.location.clone(),
            host: self.host.clone(),
            cost: self.cost,
            currency: self.currency,
            notes: self.notes.clone(),
        };

        activity.validate()?;
        Ok(activity)
    }
}

/// Field-level update. `None` leaves a field alone; for clearable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub activity_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub activity_type: Option<ActivityType>,
    pub is_confirmed: Option<bool>,
    pub location: Option<Option<String>>,
    pub host: Option<Option<String>>,
    pub cost: Option<Option<f64>>,
    pub currency: Option<Option<Currency>>,
    pub notes: Option<Option<String>>,
}

impl ActivityPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn dates(mut self, activity_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.activity_date = Some(activity_date);
        self.end_date = Some(end_date);
        self
    }

    pub fn times(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn kind(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn confirmed(mut self, is_confirmed: bool) -> Self {
        self.is_confirmed = Some(is_confirmed);
        self
    }

    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a later patch into this one; fields set in `later` win.
    pub fn merge(&mut self, later: ActivityPatch) {
        fn take<T>(slot: &mut Option<T>, later: Option<T>) {
            if later.is_some() {
                *slot = later;
            }
        }

        take(&mut self.title, later.title);
        take(&mut self.description, later.description);
        take(&mut self.activity_date, later.activity_date);
        take(&mut self.end_date, later.end_date);
        take(&mut self.start_time, later.start_time);
        take(&mut self.end_time, later.end_time);
        take(&mut self.activity_type, later.activity_type);
        take(&mut self.is_confirmed, later.is_confirmed);
        take(&mut self.location, later.location);
        take(&mut self.host, later.host);
        take(&mut self.cost, later.cost);
        take(&mut self.currency, later.currency);
        take(&mut self.notes, later.notes);
    }

    /// Write the patched fields into `activity`.
    pub fn apply_to(&self, activity: &mut Activity) {
        if let Some(title) = &self.title {
            activity.title = title.clone();
        }
        if let Some(description) = &self.description {
            activity.description = description.clone();
        }
        if let Some(date) = self.activity_date {
            activity.activity_date = date;
        }
        if let Some(date) = self.end_date {
            activity.end_date = date;
        }
        if let Some(time) = self.start_time {
            activity.start_time = time;
        }
        if let Some(time) = self.end_time {
            activity.end_time = time;
        }
        if let Some(kind) = self.activity_type {
            activity.activity_type = kind;
        }
        if let Some(confirmed) = self.is_confirmed {
            activity.is_confirmed = confirmed;
        }
        if let Some(location) = &self.location {
            activity.location = location.clone();
        }
        if let Some(host) = &self.host {
            activity.host = host.clone();
        }
        if let Some(cost) = self.cost {
            activity.cost = cost;
        }
        if let Some(currency) = self.currency {
            activity.currency = currency;
        }
        if let Some(notes) = &self.notes {
            activity.notes = notes.clone();
        }
    }

    /// Return the activity as it would look after this patch, validated.
    pub fn preview(&self, activity: &Activity) -> Result<Activity> {
        let mut patched = activity.clone();
        self.apply_to(&mut patched);
        patched.validate()?;
        Ok(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date::{parse_date, parse_time};
    use test_case::test_case;

    fn d(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn t(value: &str) -> NaiveTime {
        parse_time(value).unwrap()
    }

    fn sample() -> Activity {
        ActivityDraft::new("Cupping at Fazenda")
            .on(d("2024-07-28"))
            .at(t("09:00"), Some(t("10:30")))
            .kind(ActivityType::Meeting)
            .to_activity(TripId(1), Some(ActivityId(10)))
            .unwrap()
    }

    #[test]
    fn test_draft_requires_title() {
        let err = ActivityDraft::new("  ").on(d("2024-07-28")).validate().unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "title", .. }));
    }

    #[test]
    fn test_draft_requires_activity_date() {
        let err = ActivityDraft::new("Dinner").validate().unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "activity_date", .. }));
    }

    #[test]
    fn test_draft_end_date_defaults_to_start() {
        let activity = sample();
        assert_eq!(activity.end_date, activity.activity_date);
        assert!(!activity.is_multi_day());
        assert_eq!(activity.span_days(), 1);
    }

    #[test]
    fn test_draft_rejects_end_before_start() {
        let err = ActivityDraft::new("Hotel")
            .on(d("2024-07-29"))
            .until(d("2024-07-28"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "end_date", .. }));
    }

    #[test]
    fn test_occurs_on_inclusive_span() {
        let mut activity = sample();
        activity.end_date = d("2024-07-30");

        assert!(activity.occurs_on(d("2024-07-28")));
        assert!(activity.occurs_on(d("2024-07-29")));
        assert!(activity.occurs_on(d("2024-07-30")));
        assert!(!activity.occurs_on(d("2024-07-31")));
        assert_eq!(activity.span_days(), 3);
    }

    #[test]
    fn test_duration_minutes() {
        let mut activity = sample();
        assert_eq!(activity.duration_minutes(), Some(90));
        activity.end_time = None;
        assert_eq!(activity.duration_minutes(), None);
        assert!(!activity.is_all_day());
        activity.start_time = None;
        assert!(activity.is_all_day());
    }

    #[test]
    fn test_patch_merge_later_wins() {
        let mut first = ActivityPatch::default().title("A").confirmed(false);
        first.merge(ActivityPatch::default().title("B"));
        first.merge(ActivityPatch::default().notes(Some("bring samples".into())));

        assert_eq!(first.title.as_deref(), Some("B"));
        assert_eq!(first.is_confirmed, Some(false));
        assert_eq!(first.notes, Some(Some("bring samples".to_string())));
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let mut activity = sample();
        ActivityPatch::default().times(None, None).apply_to(&mut activity);
        assert!(activity.is_all_day());
    }

    #[test]
    fn test_patch_preview_validates() {
        let activity = sample();
        assert!(ActivityPatch::default().title("").preview(&activity).is_err());
        assert!(ActivityPatch::default()
            .dates(d("2024-07-29"), d("2024-07-28"))
            .preview(&activity)
            .is_err());
        assert_eq!(
            ActivityPatch::default().title("Lunch").preview(&activity).unwrap().title,
            "Lunch"
        );
    }

    #[test_case("meeting", ActivityType::Meeting; "meeting")]
    #[test_case("BREAK", ActivityType::Break; "case insensitive")]
    #[test_case("hotel", ActivityType::Other; "unknown maps to other")]
    fn test_activity_type_from_name(name: &str, expected: ActivityType) {
        assert_eq!(ActivityType::from_name(name), expected);
    }

    #[test]
    fn test_activity_wire_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["activity_date"], "2024-07-28");
        assert_eq!(json["start_time"], "09:00");
        assert_eq!(json["type"], "meeting");

        let back: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(back.end_time, Some(t("10:30")));
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("dkk"), Some(Currency::Dkk));
        assert_eq!(Currency::Brl.code(), "BRL");
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
        assert!(Currency::from_code("JPY").is_none());
    }
}

//! Activity persistence.
//! CRUD and listing queries over the `activities` table, split across
//! focused submodules.

use rusqlite::Connection;

pub mod crud;
pub mod queries;
mod shared;

/// Service for reading and writing trip activities stored in SQLite.
pub struct ActivityService<'a> {
    pub(crate) conn: &'a Connection,
}

impl<'a> ActivityService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::{ActivityDraft, ActivityId, ActivityPatch, ActivityType, Currency};
    use crate::models::trip::{Trip, TripId, TripRange};
    use crate::services::database::Database;
    use crate::services::trip::TripService;
    use crate::utils::date::{parse_date, parse_time};
    use chrono::NaiveDate;

    fn d(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn setup_test_db() -> (Database, TripId) {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        let range = TripRange::new(d("2024-07-27"), d("2024-07-30")).unwrap();
        let trip = TripService::new(db.connection())
            .create(&Trip::new("Brazil harvest", range).unwrap())
            .unwrap();
        let trip_id = trip.id.unwrap();
        (db, trip_id)
    }

    fn lunch() -> ActivityDraft {
        ActivityDraft::new("Lunch at the co-op")
            .on(d("2024-07-28"))
            .at(parse_time("12:00").unwrap(), parse_time("13:30"))
            .kind(ActivityType::Meal)
    }

    #[test]
    fn test_create_assigns_id() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());

        let created = service.create(trip_id, &lunch()).unwrap();
        assert!(created.id.is_some());
        assert_eq!(created.trip_id, trip_id);
        assert_eq!(created.end_date, d("2024-07-28"));
    }

    #[test]
    fn test_create_with_all_fields_round_trips() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());

        let draft = lunch()
            .host("Cooxupé")
            .location("Guaxupé")
            .cost(120.5, Currency::Brl)
            .notes("Bring samples")
            .confirmed(true);
        let created = service.create(trip_id, &draft).unwrap();
        let fetched = service.get(created.id.unwrap()).unwrap().unwrap();

        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_rejects_invalid_draft() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());

        assert!(service.create(trip_id, &ActivityDraft::new("No date")).is_err());
        assert!(service.list_for_trip(trip_id).unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (db, _) = setup_test_db();
        let service = ActivityService::new(db.connection());
        assert!(service.get(ActivityId(999)).unwrap().is_none());
    }

    #[test]
    fn test_update_applies_patch() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());
        let created = service.create(trip_id, &lunch()).unwrap();

        let patch = ActivityPatch::default().title("Long lunch").times(None, None);
        let updated = service.update(created.id.unwrap(), &patch).unwrap();

        assert_eq!(updated.title, "Long lunch");
        assert!(updated.is_all_day());
        assert_eq!(service.get(created.id.unwrap()).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_missing_activity_fails() {
        let (db, _) = setup_test_db();
        let service = ActivityService::new(db.connection());
        let err = service
            .update(ActivityId(42), &ActivityPatch::default().title("x"))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_delete() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());
        let id = service.create(trip_id, &lunch()).unwrap().id.unwrap();

        assert!(service.delete(id).unwrap());
        assert!(!service.delete(id).unwrap());
    }

    #[test]
    fn test_list_orders_by_date_then_time() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());

        service
            .create(trip_id, &ActivityDraft::new("All day").on(d("2024-07-28")))
            .unwrap();
        service.create(trip_id, &lunch()).unwrap();
        service
            .create(
                trip_id,
                &ActivityDraft::new("Arrival")
                    .on(d("2024-07-27"))
                    .at(parse_time("18:00").unwrap(), None),
            )
            .unwrap();

        let titles: Vec<String> = service
            .list_for_trip(trip_id)
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Arrival", "Lunch at the co-op", "All day"]);
    }

    #[test]
    fn test_deleting_trip_cascades() {
        let (db, trip_id) = setup_test_db();
        let service = ActivityService::new(db.connection());
        service.create(trip_id, &lunch()).unwrap();

        TripService::new(db.connection()).delete(trip_id).unwrap();
        assert!(service.list_for_trip(trip_id).unwrap().is_empty());
    }
}

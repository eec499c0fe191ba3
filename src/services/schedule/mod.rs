//! Trip activity scheduling core.
//! Slot grid, conflict detection, the activity store and its save queue,
//! drag-and-drop moves, trip range changes and the per-trip orchestrator.

pub mod conflicts;
pub mod drag;
pub mod orchestrator;
pub mod range;
pub mod store;
pub mod time_slots;

pub use conflicts::{ConflictDetector, ConflictMap, ConflictWarning};
pub use drag::{DragDropController, DragOutcome, DragState, MoveCommand};
pub use orchestrator::{SaveStatus, ScheduleOrchestrator};
pub use range::{ClampedActivity, DeletedActivity, RangeChange, TripRangeExtender};
pub use store::{ActivityStats, ActivityStore, EntryKey, ItineraryDay, MoveResult, RemoteChange};
pub use time_slots::generate_slots;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::activity::{Activity, ActivityId};

/// What is being dragged and where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragContext {
    pub activity_id: ActivityId,
    pub original_date: NaiveDate,
    pub original_start: Option<NaiveTime>,
}

impl DragContext {
    /// Only persisted activities can be dragged.
    pub fn from_activity(activity: &Activity) -> Option<Self> {
        let activity_id = activity.id?;
        Some(Self {
            activity_id,
            original_date: activity.activity_date,
            original_start: activity.start_time,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragContext),
    Hovering {
        context: DragContext,
        date: NaiveDate,
        slot: NaiveTime,
    },
}

/// Emitted on a drop over a valid cell; applied by the activity store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MoveCommand {
    pub activity_id: ActivityId,
    pub target_date: NaiveDate,
    pub target_slot: NaiveTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    Dropped(MoveCommand),
    Cancelled,
}

/// Pointer-drag gesture from an activity card to a (day, slot) cell.
///
/// The controller never validates a move and never touches the store.
#[derive(Debug, Default)]
pub struct DragDropController {
    state: DragState,
}

impl DragDropController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn active(&self) -> Option<DragContext> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging(context) | DragState::Hovering { context, .. } => Some(context),
        }
    }

    /// Start dragging `activity`. Returns `false` if it cannot be dragged;
    /// a gesture already in progress is replaced.
    pub fn begin(&mut self, activity: &Activity) -> bool {
        let Some(context) = DragContext::from_activity(activity) else {
            log::debug!("Ignoring drag of unsaved activity '{}'", activity.title);
            return false;
        };
        self.state = DragState::Dragging(context);
        true
    }

    pub fn hover(&mut self, date: NaiveDate, slot: NaiveTime) {
        if let Some(context) = self.active() {
            self.state = DragState::Hovering { context, date, slot };
        }
    }

    /// The pointer left every drop target.
    pub fn leave(&mut self) {
        if let DragState::Hovering { context, .. } = self.state {
            self.state = DragState::Dragging(context);
        }
    }

    /// Release the pointer. Over a cell this yields a move command;
    /// anywhere else the gesture is cancelled. `None` when idle.
    pub fn release(&mut self) -> Option<DragOutcome> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Dragging(_) => Some(DragOutcome::Cancelled),
            DragState::Hovering { context, date, slot } => Some(DragOutcome::Dropped(MoveCommand {
                activity_id: context.activity_id,
                target_date: date,
                target_slot: slot,
            })),
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityDraft;
    use crate::models::trip::TripId;
    use crate::utils::date::{parse_date, parse_time};

    fn saved() -> Activity {
        ActivityDraft::new("Farm visit")
            .on(parse_date("2024-07-28").unwrap())
            .at(parse_time("09:00").unwrap(), parse_time("10:00"))
            .to_activity(TripId(1), Some(ActivityId(5)))
            .unwrap()
    }

    #[test]
    fn test_drop_over_cell_emits_move() {
        let mut controller = DragDropController::new();
        assert!(controller.begin(&saved()));

        let date = parse_date("2024-07-29").unwrap();
        let slot = parse_time("14:30").unwrap();
        controller.hover(date, slot);

        assert_eq!(
            controller.release(),
            Some(DragOutcome::Dropped(MoveCommand {
                activity_id: ActivityId(5),
                target_date: date,
                target_slot: slot,
            }))
        );
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn test_release_outside_targets_cancels() {
        let mut controller = DragDropController::new();
        controller.begin(&saved());
        controller.hover(parse_date("2024-07-29").unwrap(), parse_time("08:00").unwrap());
        controller.leave();

        assert_eq!(controller.release(), Some(DragOutcome::Cancelled));
        assert!(!controller.is_active());
    }

    #[test]
    fn test_unsaved_activity_cannot_be_dragged() {
        let mut unsaved = saved();
        unsaved.id = None;
        let mut controller = DragDropController::new();

        assert!(!controller.begin(&unsaved));
        assert_eq!(controller.release(), None);
    }

    #[test]
    fn test_hover_without_drag_is_ignored() {
        let mut controller = DragDropController::new();
        controller.hover(parse_date("2024-07-29").unwrap(), parse_time("08:00").unwrap());
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn test_cancel_discards_gesture() {
        let mut controller = DragDropController::new();
        controller.begin(&saved());
        controller.hover(parse_date("2024-07-29").unwrap(), parse_time("08:00").unwrap());
        controller.cancel();
        assert_eq!(controller.release(), None);
    }
}

//! Collaborator interfaces the scheduler reads from and writes to.
//!
//! # Invariants
//! - Availability is append-only per event; `list_windows` returns a snapshot.
//! - `set_confirmed` replaces any previous confirmation (last write wins).

use crate::error::StoreResult;
use crate::model::{AvailabilityWindow, CalendarEvent, ConfirmedSchedule, EventId};

/// Accumulates availability windows per event.
pub trait AvailabilityStore: Send + Sync {
    /// All windows recorded for `event_id`, in insertion order.
    fn list_windows(&self, event_id: EventId) -> StoreResult<Vec<AvailabilityWindow>>;

    /// Append one window.
    fn add_window(&self, window: AvailabilityWindow) -> StoreResult<()>;

    /// Append several windows. Implementations backed by a transactional
    /// store should override this to make the batch atomic.
    fn add_windows(&self, windows: Vec<AvailabilityWindow>) -> StoreResult<()> {
        for window in windows {
            self.add_window(window)?;
        }
        Ok(())
    }
}

/// Holds calendar-event records and their confirmed schedule.
pub trait EventStore: Send + Sync {
    /// Look up an event. `Ok(None)` when no such event exists.
    fn get_event(&self, event_id: EventId) -> StoreResult<Option<CalendarEvent>>;

    /// Overwrite the event's confirmed schedule.
    fn set_confirmed(&self, event_id: EventId, schedule: ConfirmedSchedule) -> StoreResult<()>;
}

//! In-memory store implementations.
//!
//! Used by tests and by the CLI, which loads them from and saves them to a
//! JSON state file.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::model::{AvailabilityWindow, CalendarEvent, ConfirmedSchedule, EventId};
use crate::store::{AvailabilityStore, EventStore};

fn poisoned(store: &str) -> StoreError {
    StoreError::Unavailable(format!("{} lock poisoned", store))
}

/// Append-only availability log keyed by event id.
#[derive(Debug, Default)]
pub struct InMemoryAvailabilityStore {
    windows: RwLock<HashMap<EventId, Vec<AvailabilityWindow>>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store preloaded with `windows`, keeping their order.
    pub fn from_windows(windows: impl IntoIterator<Item = AvailabilityWindow>) -> Self {
        let mut by_event: HashMap<EventId, Vec<AvailabilityWindow>> = HashMap::new();
        for window in windows {
            by_event.entry(window.event_id).or_default().push(window);
        }
        Self {
            windows: RwLock::new(by_event),
        }
    }

    /// Every stored window, grouped by ascending event id.
    pub fn all_windows(&self) -> StoreResult<Vec<AvailabilityWindow>> {
        let guard = self.windows.read().map_err(|_| poisoned("availability"))?;
        let ordered: BTreeMap<&EventId, &Vec<AvailabilityWindow>> = guard.iter().collect();
        Ok(ordered.into_values().flatten().cloned().collect())
    }

    /// Number of windows stored for `event_id`.
    pub fn window_count(&self, event_id: EventId) -> StoreResult<usize> {
        let guard = self.windows.read().map_err(|_| poisoned("availability"))?;
        Ok(guard.get(&event_id).map_or(0, Vec::len))
    }
}

impl AvailabilityStore for InMemoryAvailabilityStore {
    fn list_windows(&self, event_id: EventId) -> StoreResult<Vec<AvailabilityWindow>> {
        let guard = self.windows.read().map_err(|_| poisoned("availability"))?;
        Ok(guard.get(&event_id).cloned().unwrap_or_default())
    }

    fn add_window(&self, window: AvailabilityWindow) -> StoreResult<()> {
        let mut guard = self.windows.write().map_err(|_| poisoned("availability"))?;
        guard.entry(window.event_id).or_default().push(window);
        Ok(())
    }

    /// Appends the whole batch under a single write lock.
    fn add_windows(&self, windows: Vec<AvailabilityWindow>) -> StoreResult<()> {
        let mut guard = self.windows.write().map_err(|_| poisoned("availability"))?;
        for window in windows {
            guard.entry(window.event_id).or_default().push(window);
        }
        Ok(())
    }
}

/// Calendar-event records keyed by event id.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<BTreeMap<EventId, CalendarEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = CalendarEvent>) -> Self {
        Self {
            events: RwLock::new(events.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    /// Insert or replace an event record.
    pub fn insert_event(&self, event: CalendarEvent) -> StoreResult<()> {
        let mut guard = self.events.write().map_err(|_| poisoned("event"))?;
        guard.insert(event.id, event);
        Ok(())
    }

    /// Every stored event, ordered by id.
    pub fn all_events(&self) -> StoreResult<Vec<CalendarEvent>> {
        let guard = self.events.read().map_err(|_| poisoned("event"))?;
        Ok(guard.values().cloned().collect())
    }
}

impl EventStore for InMemoryEventStore {
    fn get_event(&self, event_id: EventId) -> StoreResult<Option<CalendarEvent>> {
        let guard = self.events.read().map_err(|_| poisoned("event"))?;
        Ok(guard.get(&event_id).cloned())
    }

    fn set_confirmed(&self, event_id: EventId, schedule: ConfirmedSchedule) -> StoreResult<()> {
        let mut guard = self.events.write().map_err(|_| poisoned("event"))?;
        let event = guard
            .get_mut(&event_id)
            .ok_or(StoreError::EventNotFound(event_id))?;
        event.confirmation = Some(schedule);
        Ok(())
    }
}

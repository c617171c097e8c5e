//! Consensus scheduling: register availability, compute ranked candidates,
//! and commit a confirmed time for an event.
//!
//! # Invariants
//! - Every operation validates all of its inputs before writing anything.
//! - Candidates are recomputed from a fresh availability snapshot on each
//!   call; a confirm target is matched by its exact `(start, end)` value.
//! - Confirmations for one event are serialized by a per-event lock held
//!   across recompute and write. The lock entry is removed once no caller
//!   holds or waits on it.
//! - Registering availability never touches an existing confirmation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};
use crate::merger::merge_windows;
use crate::model::{
    AvailabilityWindow, CalendarEvent, ConfirmationSource, ConfirmedSchedule, EventId,
    MergedSlot, ParticipantId, ScheduleState, SlotKey,
};
use crate::ranker::rank_slots;
use crate::store::{AvailabilityStore, EventStore};

/// Orchestrates merge + rank and the confirm/override transition.
pub struct ConsensusScheduler<A, E> {
    availability: A,
    events: E,
    locks: Mutex<HashMap<EventId, Arc<Mutex<()>>>>,
}

impl<A: AvailabilityStore, E: EventStore> ConsensusScheduler<A, E> {
    pub fn new(availability: A, events: E) -> Self {
        Self {
            availability,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn availability(&self) -> &A {
        &self.availability
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Give the stores back, e.g. to persist them.
    pub fn into_stores(self) -> (A, E) {
        (self.availability, self.events)
    }

    /// Record that `participant_id` is free over `[start, end)` for the event.
    ///
    /// Allowed whether or not the event is already confirmed.
    ///
    /// # Errors
    /// `InvalidWindow` if `start >= end`, `UnknownEvent` if the event is absent.
    pub fn register_availability(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilityWindow> {
        validate_range(start, end)?;
        self.require_event(event_id)?;

        let window = AvailabilityWindow::new(event_id, participant_id, start, end);
        self.availability.add_window(window.clone())?;

        tracing::info!(
            event_id = %event_id,
            participant = %window.participant_id,
            start = %start,
            end = %end,
            "availability registered"
        );
        Ok(window)
    }

    /// Record several windows for one participant in a single submission.
    ///
    /// Either every range is stored or none is. An empty batch is a no-op.
    pub fn register_availability_batch(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        ranges: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> Result<Vec<AvailabilityWindow>> {
        for &(start, end) in ranges {
            validate_range(start, end)?;
        }
        self.require_event(event_id)?;
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let windows: Vec<AvailabilityWindow> = ranges
            .iter()
            .map(|&(start, end)| {
                AvailabilityWindow::new(event_id, participant_id.clone(), start, end)
            })
            .collect();
        self.availability.add_windows(windows.clone())?;

        tracing::info!(
            event_id = %event_id,
            participant = %participant_id,
            windows = windows.len(),
            "availability batch registered"
        );
        Ok(windows)
    }

    /// Merged slots for the event, best candidate first.
    ///
    /// Returns an empty list when nobody has registered availability yet.
    pub fn compute_candidates(&self, event_id: EventId) -> Result<Vec<MergedSlot>> {
        self.require_event(event_id)?;
        self.candidates_for(event_id)
    }

    /// Confirm the candidate whose `(start, end)` equals `key`.
    ///
    /// # Errors
    /// `SlotNotFound` if no freshly computed candidate matches. The previous
    /// confirmation, if any, is left as it was.
    pub fn confirm_slot(&self, event_id: EventId, key: SlotKey) -> Result<ConfirmedSchedule> {
        self.with_event_lock(event_id, || self.confirm_slot_locked(event_id, key))
    }

    fn confirm_slot_locked(&self, event_id: EventId, key: SlotKey) -> Result<ConfirmedSchedule> {
        self.require_event(event_id)?;
        let candidates = self.candidates_for(event_id)?;
        let Some(slot) = candidates.into_iter().find(|slot| slot.key() == key) else {
            tracing::warn!(
                event_id = %event_id,
                start = %key.start,
                end = %key.end,
                "confirm target is not a current candidate"
            );
            return Err(SchedulerError::SlotNotFound {
                event_id,
                start: key.start,
                end: key.end,
            });
        };

        let schedule = ConfirmedSchedule {
            event_id,
            confirmed_start: slot.start,
            confirmed_end: slot.end,
            confirmed: true,
            source: ConfirmationSource::Selected,
            participants: slot.participants,
        };
        self.events.set_confirmed(event_id, schedule.clone())?;

        tracing::info!(
            event_id = %event_id,
            start = %schedule.confirmed_start,
            end = %schedule.confirmed_end,
            participants = schedule.participants.len(),
            "schedule confirmed from candidate"
        );
        Ok(schedule)
    }

    /// Confirm an organizer-supplied window without consulting availability.
    pub fn confirm_custom(
        &self,
        event_id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ConfirmedSchedule> {
        validate_range(start, end)?;
        self.with_event_lock(event_id, || self.confirm_custom_locked(event_id, start, end))
    }

    fn confirm_custom_locked(
        &self,
        event_id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ConfirmedSchedule> {
        self.require_event(event_id)?;
        let schedule = ConfirmedSchedule {
            event_id,
            confirmed_start: start,
            confirmed_end: end,
            confirmed: true,
            source: ConfirmationSource::Custom,
            participants: BTreeSet::new(),
        };
        self.events.set_confirmed(event_id, schedule.clone())?;

        tracing::info!(
            event_id = %event_id,
            start = %start,
            end = %end,
            "schedule confirmed with custom window"
        );
        Ok(schedule)
    }

    /// The committed outcome, if the event has been confirmed.
    pub fn confirmed_schedule(&self, event_id: EventId) -> Result<Option<ConfirmedSchedule>> {
        let event = self.require_event(event_id)?;
        Ok(event.confirmation.filter(|schedule| schedule.confirmed))
    }

    pub fn state(&self, event_id: EventId) -> Result<ScheduleState> {
        Ok(self.require_event(event_id)?.state())
    }

    fn require_event(&self, event_id: EventId) -> Result<CalendarEvent> {
        self.events
            .get_event(event_id)?
            .ok_or(SchedulerError::UnknownEvent(event_id))
    }

    fn candidates_for(&self, event_id: EventId) -> Result<Vec<MergedSlot>> {
        let windows = self.availability.list_windows(event_id)?;
        let ranked = rank_slots(&merge_windows(&windows));
        tracing::debug!(
            event_id = %event_id,
            windows = windows.len(),
            candidates = ranked.len(),
            "computed candidates"
        );
        Ok(ranked)
    }

    /// Number of events with a confirmation in flight.
    ///
    /// Entries are dropped once no caller holds them, so this is zero while
    /// the scheduler is idle.
    pub fn active_event_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run `f` while holding the event's confirm lock.
    fn with_event_lock<T>(&self, event_id: EventId, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(event_id).or_default())
        };
        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        // Clones are only taken under the map lock, so a count of one means
        // no other caller is waiting on this entry.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&event_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&event_id);
        }
        out
    }
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start >= end {
        return Err(SchedulerError::InvalidWindow { start, end });
    }
    Ok(())
}

//! Tests for the register / compute / confirm scheduler operations.

use std::sync::Mutex;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use consensus_engine::error::{SchedulerError, StoreError, StoreResult};
use consensus_engine::memory::{InMemoryAvailabilityStore, InMemoryEventStore};
use consensus_engine::model::{
    AvailabilityWindow, CalendarEvent, ConfirmationSource, ConfirmedSchedule, EventId,
    ParticipantId, ScheduleState, SlotKey,
};
use consensus_engine::scheduler::ConsensusScheduler;
use consensus_engine::store::{AvailabilityStore, EventStore};

// ── Helpers ─────────────────────────────────────────────────────────────────

const EVENT: EventId = EventId(7);

type MemoryScheduler = ConsensusScheduler<InMemoryAvailabilityStore, InMemoryEventStore>;

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, min, 0).unwrap()
}

fn who(name: &str) -> ParticipantId {
    ParticipantId::from(name)
}

fn scheduler() -> MemoryScheduler {
    let events = InMemoryEventStore::new();
    events
        .insert_event(CalendarEvent::new(EVENT, "Study group"))
        .unwrap();
    ConsensusScheduler::new(InMemoryAvailabilityStore::new(), events)
}

fn seed_example(s: &MemoryScheduler) {
    s.register_availability(EVENT, who("A"), at(9, 0), at(10, 0)).unwrap();
    s.register_availability(EVENT, who("B"), at(9, 30), at(10, 30)).unwrap();
    s.register_availability(EVENT, who("C"), at(11, 0), at(12, 0)).unwrap();
}

// ── registerAvailability ────────────────────────────────────────────────────

#[test]
fn register_appends_window() {
    let s = scheduler();

    let window = s
        .register_availability(EVENT, who("A"), at(9, 0), at(10, 0))
        .unwrap();

    assert_eq!(window.participant_id, who("A"));
    assert_eq!(s.availability().list_windows(EVENT).unwrap(), vec![window]);
}

#[test]
fn zero_width_window_is_rejected_and_store_untouched() {
    let s = scheduler();

    let err = s
        .register_availability(EVENT, who("A"), at(9, 0), at(9, 0))
        .unwrap_err();

    assert!(matches!(err, SchedulerError::InvalidWindow { .. }));
    assert_eq!(s.availability().window_count(EVENT).unwrap(), 0);
}

#[test]
fn inverted_window_is_rejected() {
    let s = scheduler();

    let err = s
        .register_availability(EVENT, who("A"), at(10, 0), at(9, 0))
        .unwrap_err();

    assert_eq!(
        err,
        SchedulerError::InvalidWindow {
            start: at(10, 0),
            end: at(9, 0)
        }
    );
}

#[test]
fn register_for_unknown_event_fails() {
    let s = scheduler();

    let err = s
        .register_availability(EventId(99), who("A"), at(9, 0), at(10, 0))
        .unwrap_err();

    assert_eq!(err, SchedulerError::UnknownEvent(EventId(99)));
    assert_eq!(s.availability().window_count(EventId(99)).unwrap(), 0);
}

#[test]
fn batch_with_one_bad_range_writes_nothing() {
    let s = scheduler();

    let err = s
        .register_availability_batch(
            EVENT,
            who("A"),
            &[(at(9, 0), at(10, 0)), (at(12, 0), at(11, 0))],
        )
        .unwrap_err();

    assert!(matches!(err, SchedulerError::InvalidWindow { .. }));
    assert_eq!(s.availability().window_count(EVENT).unwrap(), 0);
}

#[test]
fn batch_registers_every_range() {
    let s = scheduler();

    let windows = s
        .register_availability_batch(
            EVENT,
            who("A"),
            &[(at(9, 0), at(10, 0)), (at(13, 0), at(14, 0))],
        )
        .unwrap();

    assert_eq!(windows.len(), 2);
    assert_eq!(s.availability().window_count(EVENT).unwrap(), 2);
    assert_eq!(s.compute_candidates(EVENT).unwrap().len(), 2);
}

#[test]
fn empty_batch_is_noop() {
    let s = scheduler();

    let windows = s.register_availability_batch(EVENT, who("A"), &[]).unwrap();

    assert!(windows.is_empty());
    assert_eq!(s.availability().window_count(EVENT).unwrap(), 0);
}

// ── computeCandidates ───────────────────────────────────────────────────────

#[test]
fn no_availability_yields_empty_candidates() {
    let s = scheduler();
    assert!(s.compute_candidates(EVENT).unwrap().is_empty());
}

#[test]
fn candidates_for_unknown_event_fail() {
    let s = scheduler();
    assert_eq!(
        s.compute_candidates(EventId(3)).unwrap_err(),
        SchedulerError::UnknownEvent(EventId(3))
    );
}

#[test]
fn worked_example_top_candidate_has_two_participants() {
    let s = scheduler();
    seed_example(&s);

    let candidates = s.compute_candidates(EVENT).unwrap();

    assert_eq!(candidates.len(), 4);
    assert_eq!(candidates[0].key(), SlotKey::new(at(9, 30), at(10, 0)));
    assert_eq!(candidates[0].participant_count(), 2);
    // Remaining single-participant slots in start order.
    let rest: Vec<_> = candidates[1..].iter().map(|c| c.start).collect();
    assert_eq!(rest, vec![at(9, 0), at(10, 0), at(11, 0)]);
}

#[test]
fn windows_of_other_events_are_ignored() {
    let s = scheduler();
    s.events()
        .insert_event(CalendarEvent::new(EventId(8), "Other"))
        .unwrap();
    s.register_availability(EventId(8), who("Z"), at(9, 0), at(17, 0))
        .unwrap();
    s.register_availability(EVENT, who("A"), at(9, 0), at(10, 0))
        .unwrap();

    let candidates = s.compute_candidates(EVENT).unwrap();

    assert_eq!(candidates.len(), 1);
    assert!(!candidates[0].contains_participant(&who("Z")));
}

// ── confirmSlot ─────────────────────────────────────────────────────────────

#[test]
fn confirm_slot_writes_selected_schedule() {
    let s = scheduler();
    seed_example(&s);

    let schedule = s
        .confirm_slot(EVENT, SlotKey::new(at(9, 30), at(10, 0)))
        .unwrap();

    assert!(schedule.confirmed);
    assert_eq!(schedule.source, ConfirmationSource::Selected);
    assert_eq!(schedule.confirmed_start, at(9, 30));
    assert_eq!(schedule.confirmed_end, at(10, 0));
    assert_eq!(schedule.participants.len(), 2);
    assert_eq!(s.confirmed_schedule(EVENT).unwrap(), Some(schedule));
    assert_eq!(s.state(EVENT).unwrap(), ScheduleState::Confirmed);
}

#[test]
fn confirm_slot_requires_exact_match() {
    let s = scheduler();
    seed_example(&s);

    // 09:00-10:00 is A's raw window, not a merged candidate.
    let err = s
        .confirm_slot(EVENT, SlotKey::new(at(9, 0), at(10, 0)))
        .unwrap_err();

    assert_eq!(
        err,
        SchedulerError::SlotNotFound {
            event_id: EVENT,
            start: at(9, 0),
            end: at(10, 0),
        }
    );
    assert_eq!(s.state(EVENT).unwrap(), ScheduleState::Open);
}

#[test]
fn failed_confirm_keeps_previous_confirmation() {
    let s = scheduler();
    seed_example(&s);
    let first = s
        .confirm_slot(EVENT, SlotKey::new(at(11, 0), at(12, 0)))
        .unwrap();

    let err = s
        .confirm_slot(EVENT, SlotKey::new(at(18, 0), at(19, 0)))
        .unwrap_err();

    assert!(matches!(err, SchedulerError::SlotNotFound { .. }));
    assert_eq!(s.confirmed_schedule(EVENT).unwrap(), Some(first));
}

#[test]
fn reconfirm_overwrites_previous_confirmation() {
    let s = scheduler();
    seed_example(&s);
    s.confirm_slot(EVENT, SlotKey::new(at(11, 0), at(12, 0)))
        .unwrap();

    let second = s
        .confirm_slot(EVENT, SlotKey::new(at(9, 30), at(10, 0)))
        .unwrap();

    assert_eq!(s.confirmed_schedule(EVENT).unwrap(), Some(second));
}

#[test]
fn confirm_slot_on_unknown_event_fails() {
    let s = scheduler();
    let err = s
        .confirm_slot(EventId(42), SlotKey::new(at(9, 0), at(10, 0)))
        .unwrap_err();
    assert_eq!(err, SchedulerError::UnknownEvent(EventId(42)));
}

// ── confirmCustom ───────────────────────────────────────────────────────────

#[test]
fn custom_confirmation_without_availability_succeeds() {
    let s = scheduler();

    let schedule = s.confirm_custom(EVENT, at(14, 0), at(15, 0)).unwrap();

    assert_eq!(schedule.source, ConfirmationSource::Custom);
    assert!(schedule.participants.is_empty());
    assert_eq!(s.state(EVENT).unwrap(), ScheduleState::Confirmed);
}

#[test]
fn custom_confirmation_rejects_bad_window_and_keeps_state() {
    let s = scheduler();

    let err = s.confirm_custom(EVENT, at(15, 0), at(15, 0)).unwrap_err();

    assert!(matches!(err, SchedulerError::InvalidWindow { .. }));
    assert_eq!(s.confirmed_schedule(EVENT).unwrap(), None);
}

#[test]
fn stale_candidate_fails_after_new_availability_splits_it() {
    let s = scheduler();
    s.confirm_custom(EVENT, at(14, 0), at(15, 0)).unwrap();
    s.register_availability(EVENT, who("A"), at(9, 0), at(11, 0))
        .unwrap();
    let stale = s.compute_candidates(EVENT).unwrap()[0].key();

    // B's window splits 09:00-11:00 into three slots.
    s.register_availability(EVENT, who("B"), at(10, 0), at(10, 30))
        .unwrap();

    let err = s.confirm_slot(EVENT, stale).unwrap_err();
    assert!(matches!(err, SchedulerError::SlotNotFound { .. }));
    let kept = s.confirmed_schedule(EVENT).unwrap().unwrap();
    assert_eq!(kept.source, ConfirmationSource::Custom);
}

#[test]
fn candidate_still_matching_after_new_availability_confirms() {
    let s = scheduler();
    s.confirm_custom(EVENT, at(14, 0), at(15, 0)).unwrap();
    s.register_availability(EVENT, who("A"), at(9, 0), at(10, 0))
        .unwrap();
    let key = s.compute_candidates(EVENT).unwrap()[0].key();

    // Disjoint window leaves 09:00-10:00 intact.
    s.register_availability(EVENT, who("B"), at(16, 0), at(17, 0))
        .unwrap();

    let schedule = s.confirm_slot(EVENT, key).unwrap();
    assert_eq!(schedule.source, ConfirmationSource::Selected);
    assert_eq!(schedule.confirmed_start, at(9, 0));
}

#[test]
fn registering_after_confirmation_keeps_confirmation() {
    let s = scheduler();
    seed_example(&s);
    let confirmed = s
        .confirm_slot(EVENT, SlotKey::new(at(9, 30), at(10, 0)))
        .unwrap();

    s.register_availability(EVENT, who("D"), at(9, 45), at(10, 15))
        .unwrap();

    assert_eq!(s.confirmed_schedule(EVENT).unwrap(), Some(confirmed));
    assert_eq!(s.state(EVENT).unwrap(), ScheduleState::Confirmed);
}

// ── Store failures ──────────────────────────────────────────────────────────

struct FailingAvailability;

impl AvailabilityStore for FailingAvailability {
    fn list_windows(&self, _event_id: EventId) -> StoreResult<Vec<AvailabilityWindow>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn add_window(&self, _window: AvailabilityWindow) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Records every `set_confirmed` call so tests can assert nothing was written.
#[derive(Default)]
struct RecordingEvents {
    writes: Mutex<Vec<ConfirmedSchedule>>,
}

impl EventStore for RecordingEvents {
    fn get_event(&self, event_id: EventId) -> StoreResult<Option<CalendarEvent>> {
        Ok(Some(CalendarEvent::new(event_id, "Recorded")))
    }

    fn set_confirmed(&self, _event_id: EventId, schedule: ConfirmedSchedule) -> StoreResult<()> {
        self.writes.lock().unwrap().push(schedule);
        Ok(())
    }
}

#[test]
fn store_failure_surfaces_as_store_unavailable() {
    let s = ConsensusScheduler::new(FailingAvailability, RecordingEvents::default());

    let err = s.compute_candidates(EVENT).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::StoreUnavailable(StoreError::Unavailable(
            "connection refused".to_string()
        ))
    );

    let err = s
        .register_availability(EVENT, who("A"), at(9, 0), at(10, 0))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::StoreUnavailable(_)));
}

#[test]
fn confirm_slot_does_not_write_when_availability_read_fails() {
    let s = ConsensusScheduler::new(FailingAvailability, RecordingEvents::default());

    let err = s
        .confirm_slot(EVENT, SlotKey::new(at(9, 0), at(10, 0)))
        .unwrap_err();

    assert!(matches!(err, SchedulerError::StoreUnavailable(_)));
    assert!(s.events().writes.lock().unwrap().is_empty());
}

#[test]
fn store_not_found_maps_to_unknown_event() {
    let events = InMemoryEventStore::new();
    let err = events
        .set_confirmed(
            EventId(5),
            ConfirmedSchedule {
                event_id: EventId(5),
                confirmed_start: at(9, 0),
                confirmed_end: at(10, 0),
                confirmed: true,
                source: ConfirmationSource::Custom,
                participants: Default::default(),
            },
        )
        .unwrap_err();

    assert_eq!(
        SchedulerError::from(err),
        SchedulerError::UnknownEvent(EventId(5))
    );
}

// ── Concurrency ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_registrations_are_all_recorded() {
    let s = scheduler();

    thread::scope(|scope| {
        for i in 0..8u32 {
            let s = &s;
            scope.spawn(move || {
                s.register_availability(EVENT, who(&format!("p{i}")), at(9, 0), at(10, 0))
                    .unwrap();
            });
        }
    });

    let candidates = s.compute_candidates(EVENT).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].participant_count(), 8);
}

#[test]
fn concurrent_confirmations_leave_one_consistent_winner() {
    let s = scheduler();
    seed_example(&s);
    let keys = [
        SlotKey::new(at(9, 30), at(10, 0)),
        SlotKey::new(at(11, 0), at(12, 0)),
    ];

    let results: Vec<ConfirmedSchedule> = thread::scope(|scope| {
        let handles: Vec<_> = keys
            .iter()
            .map(|&key| {
                let s = &s;
                scope.spawn(move || s.confirm_slot(EVENT, key).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let stored = s.confirmed_schedule(EVENT).unwrap().unwrap();
    assert!(results.contains(&stored), "stored schedule must be one of the writes");
}

#[test]
fn confirm_locks_are_released_after_use() {
    let s = scheduler();
    seed_example(&s);

    s.confirm_slot(EVENT, SlotKey::new(at(9, 30), at(10, 0))).unwrap();
    assert_eq!(s.active_event_locks(), 0);

    let missing = s.confirm_slot(EVENT, SlotKey::new(at(6, 0), at(7, 0)));
    assert!(missing.is_err());
    assert_eq!(s.active_event_locks(), 0);

    for event in 100..140 {
        let _ = s.confirm_custom(EventId(event), at(14, 0), at(15, 0));
    }
    assert_eq!(s.active_event_locks(), 0);
}

#[test]
fn confirm_locks_are_released_after_concurrent_confirms() {
    let s = scheduler();
    seed_example(&s);

    thread::scope(|scope| {
        for i in 0..8u32 {
            let s = &s;
            scope.spawn(move || {
                s.confirm_custom(EVENT, at(13, i), at(14, i)).unwrap();
            });
        }
    });

    assert_eq!(s.active_event_locks(), 0);
    assert_eq!(s.state(EVENT).unwrap(), ScheduleState::Confirmed);
}

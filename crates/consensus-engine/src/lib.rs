//! # consensus-engine
//!
//! Availability aggregation and consensus scheduling for group calendar events.
//!
//! Participants declare the windows in which they are free for an event. The
//! engine merges those windows into disjoint slots annotated with who is
//! available, ranks the slots so the best-attended come first, and commits a
//! chosen slot (or an organizer-supplied override) as the event's confirmed
//! time.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use consensus_engine::{
//!     CalendarEvent, ConsensusScheduler, EventId, InMemoryAvailabilityStore,
//!     InMemoryEventStore, ParticipantId,
//! };
//!
//! let events = InMemoryEventStore::new();
//! events.insert_event(CalendarEvent::new(EventId(1), "Team dinner")).unwrap();
//! let scheduler = ConsensusScheduler::new(InMemoryAvailabilityStore::new(), events);
//!
//! let at = |h, m| Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap();
//! scheduler.register_availability(EventId(1), ParticipantId::from("alice"), at(9, 0), at(10, 0)).unwrap();
//! scheduler.register_availability(EventId(1), ParticipantId::from("bob"), at(9, 30), at(10, 30)).unwrap();
//!
//! let best = &scheduler.compute_candidates(EventId(1)).unwrap()[0];
//! assert_eq!((best.start, best.end), (at(9, 30), at(10, 0)));
//! assert_eq!(best.participant_count(), 2);
//!
//! let confirmed = scheduler.confirm_slot(EventId(1), best.key()).unwrap();
//! assert!(confirmed.confirmed);
//! ```
//!
//! ## Modules
//!
//! - [`model`] — windows, merged slots, confirmed schedules, event records
//! - [`merger`] — sweep-line merge of windows into disjoint slots
//! - [`ranker`] — candidate ordering
//! - [`scheduler`] — register / compute / confirm operations
//! - [`store`] — collaborator traits for availability and event storage
//! - [`memory`] — in-memory store implementations
//! - [`local`] — date/time parsing and timezone resolution
//! - [`error`] — Error types

pub mod error;
pub mod local;
pub mod memory;
pub mod merger;
pub mod model;
pub mod ranker;
pub mod scheduler;
pub mod store;

pub use error::{SchedulerError, StoreError};
pub use memory::{InMemoryAvailabilityStore, InMemoryEventStore};
pub use merger::merge_windows;
pub use model::{
    AvailabilityWindow, CalendarEvent, ConfirmationSource, ConfirmedSchedule, EventId,
    MergedSlot, ParticipantId, ScheduleState, SlotKey,
};
pub use ranker::{rank_slots, rank_slots_with_min, top_candidates};
pub use scheduler::ConsensusScheduler;
pub use store::{AvailabilityStore, EventStore};

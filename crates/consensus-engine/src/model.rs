//! Data model shared by the merger, ranker, scheduler and stores.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a calendar event awaiting (or holding) a confirmed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a participant (a login id in the surrounding service).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One participant's declared free interval for one event.
///
/// Windows are half-open: `start` is included, `end` is not. A window that
/// starts exactly when another ends does not overlap it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub event_id: EventId,
    pub participant_id: ParticipantId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn new(
        event_id: EventId,
        participant_id: ParticipantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            participant_id,
            start,
            end,
        }
    }

    /// `true` when `start < end`.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// The `(start, end)` pair identifying a candidate slot across recomputations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotKey {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// A maximal time range during which a constant, non-empty set of
/// participants is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub participants: BTreeSet<ParticipantId>,
}

impl MergedSlot {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Strict overlap: slots that merely touch do not overlap.
    pub fn overlaps(&self, other: &MergedSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_participant(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }
}

/// How a confirmed time was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSource {
    /// Picked from the ranked candidate list.
    Selected,
    /// Supplied by the organizer, not validated against availability.
    Custom,
}

/// The committed outcome for an event. Overwritten on every confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedSchedule {
    pub event_id: EventId,
    pub confirmed_start: DateTime<Utc>,
    pub confirmed_end: DateTime<Utc>,
    pub confirmed: bool,
    pub source: ConfirmationSource,
    /// Participants of the selected slot. Always empty for custom confirmations.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub participants: BTreeSet<ParticipantId>,
}

/// Calendar-event record held by an [`EventStore`](crate::store::EventStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    /// Meeting link, for events held online.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Expected length in minutes. Informational; candidates are not filtered by it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmedSchedule>,
}

impl CalendarEvent {
    pub fn new(id: EventId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            place: None,
            link: None,
            duration_minutes: None,
            note: None,
            confirmation: None,
        }
    }

    pub fn state(&self) -> ScheduleState {
        match &self.confirmation {
            Some(schedule) if schedule.confirmed => ScheduleState::Confirmed,
            _ => ScheduleState::Open,
        }
    }
}

/// Per-event scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// No confirmation yet.
    #[default]
    Open,
    /// A window has been committed. Re-enterable with a different window.
    Confirmed,
}

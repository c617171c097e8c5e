//! Merge per-participant availability windows into disjoint slots.
//!
//! A sweep-line over window boundaries tracks which participants are present.
//! Every change in the present set closes the current slot and opens the next
//! one, so each output slot carries exactly the participants available for
//! its whole span. The result does not depend on input order, and chained
//! overlaps (A overlaps B, B overlaps C) are split correctly.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::model::{AvailabilityWindow, MergedSlot, ParticipantId};

/// Boundary kind. `End` sorts before `Start` so that a window starting exactly
/// where another ends is processed after the first one is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    End,
    Start,
}

#[derive(Debug)]
struct Boundary<'a> {
    at: DateTime<Utc>,
    edge: Edge,
    participant: &'a ParticipantId,
}

/// The slot currently being built by the sweep.
struct OpenSlot {
    start: DateTime<Utc>,
    participants: BTreeSet<ParticipantId>,
}

/// Merge availability windows into maximal slots annotated with participants.
///
/// Output slots are sorted by start time and pairwise non-overlapping (they
/// may touch). Duplicate or overlapping windows of the same participant count
/// once. Windows with `start >= end` are skipped.
pub fn merge_windows(windows: &[AvailabilityWindow]) -> Vec<MergedSlot> {
    let mut boundaries: Vec<Boundary<'_>> = Vec::with_capacity(windows.len() * 2);
    for window in windows {
        if !window.is_valid() {
            tracing::warn!(
                event_id = %window.event_id,
                participant = %window.participant_id,
                start = %window.start,
                end = %window.end,
                "skipping empty or inverted availability window"
            );
            continue;
        }
        boundaries.push(Boundary {
            at: window.start,
            edge: Edge::Start,
            participant: &window.participant_id,
        });
        boundaries.push(Boundary {
            at: window.end,
            edge: Edge::End,
            participant: &window.participant_id,
        });
    }

    boundaries.sort_by(|a, b| {
        (a.at, a.edge, a.participant).cmp(&(b.at, b.edge, b.participant))
    });

    // Presence count per participant; a participant is active while > 0.
    let mut active: BTreeMap<&ParticipantId, usize> = BTreeMap::new();
    let mut open: Option<OpenSlot> = None;
    let mut slots = Vec::new();

    let mut i = 0;
    while i < boundaries.len() {
        let at = boundaries[i].at;

        let mut released = false;
        while i < boundaries.len() && boundaries[i].at == at && boundaries[i].edge == Edge::End {
            let participant = boundaries[i].participant;
            if let Some(count) = active.get_mut(participant) {
                *count -= 1;
                if *count == 0 {
                    active.remove(participant);
                    released = true;
                }
            }
            i += 1;
        }
        if released {
            close_slot(&mut open, at, &mut slots);
        }

        let mut joined = false;
        while i < boundaries.len() && boundaries[i].at == at {
            let count = active.entry(boundaries[i].participant).or_insert(0);
            if *count == 0 {
                joined = true;
            }
            *count += 1;
            i += 1;
        }
        if joined {
            close_slot(&mut open, at, &mut slots);
        }

        if open.is_none() && !active.is_empty() {
            open = Some(OpenSlot {
                start: at,
                participants: active.keys().map(|p| (*p).clone()).collect(),
            });
        }
    }

    tracing::debug!(
        windows = windows.len(),
        slots = slots.len(),
        "merged availability windows"
    );

    slots
}

/// Close the open slot (if any) at `at`, emitting it when it has positive width.
fn close_slot(open: &mut Option<OpenSlot>, at: DateTime<Utc>, slots: &mut Vec<MergedSlot>) {
    if let Some(slot) = open.take() {
        if slot.start < at {
            slots.push(MergedSlot {
                start: slot.start,
                end: at,
                participants: slot.participants,
            });
        }
    }
}

//! Order merged slots so the best candidates come first.
//!
//! Order key: more participants first, then earlier start, then earlier end.

use std::cmp::Reverse;

use crate::model::MergedSlot;

/// Rank slots by descending participant count, then ascending start and end.
///
/// Returns a new vector; the input is left untouched. The sort is stable.
pub fn rank_slots(slots: &[MergedSlot]) -> Vec<MergedSlot> {
    let mut ranked = slots.to_vec();
    ranked.sort_by_key(|slot| (Reverse(slot.participant_count()), slot.start, slot.end));
    ranked
}

/// Rank only the slots with at least `min_participants` participants.
pub fn rank_slots_with_min(slots: &[MergedSlot], min_participants: usize) -> Vec<MergedSlot> {
    let eligible: Vec<MergedSlot> = slots
        .iter()
        .filter(|slot| slot.participant_count() >= min_participants)
        .cloned()
        .collect();
    rank_slots(&eligible)
}

/// The first `limit` slots in ranked order.
pub fn top_candidates(slots: &[MergedSlot], limit: usize) -> Vec<MergedSlot> {
    let mut ranked = rank_slots(slots);
    ranked.truncate(limit);
    ranked
}

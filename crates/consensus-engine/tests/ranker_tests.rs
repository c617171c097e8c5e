//! Tests for candidate ranking.

use chrono::{DateTime, TimeZone, Utc};
use consensus_engine::model::{MergedSlot, ParticipantId};
use consensus_engine::ranker::{rank_slots, rank_slots_with_min, top_candidates};

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, min, 0).unwrap()
}

fn slot(start: (u32, u32), end: (u32, u32), who: &[&str]) -> MergedSlot {
    MergedSlot {
        start: at(start.0, start.1),
        end: at(end.0, end.1),
        participants: who.iter().copied().map(ParticipantId::from).collect(),
    }
}

#[test]
fn more_participants_rank_first() {
    let slots = vec![
        slot((9, 0), (9, 30), &["A"]),
        slot((9, 30), (10, 0), &["A", "B"]),
        slot((10, 0), (10, 30), &["B"]),
        slot((11, 0), (12, 0), &["C"]),
    ];

    let ranked = rank_slots(&slots);

    assert_eq!(ranked[0].start, at(9, 30));
    assert_eq!(ranked[0].participant_count(), 2);
}

#[test]
fn ties_break_on_earlier_start() {
    let slots = vec![
        slot((14, 0), (15, 0), &["A", "B"]),
        slot((9, 0), (10, 0), &["C", "D"]),
        slot((11, 0), (12, 0), &["E", "F"]),
    ];

    let ranked = rank_slots(&slots);

    let starts: Vec<_> = ranked.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![at(9, 0), at(11, 0), at(14, 0)]);
}

#[test]
fn ties_on_start_break_on_earlier_end() {
    let slots = vec![
        slot((9, 0), (11, 0), &["A"]),
        slot((9, 0), (10, 0), &["B"]),
    ];

    let ranked = rank_slots(&slots);

    assert_eq!(ranked[0].end, at(10, 0));
    assert_eq!(ranked[1].end, at(11, 0));
}

#[test]
fn ranking_does_not_mutate_input() {
    let slots = vec![
        slot((9, 0), (10, 0), &["A"]),
        slot((10, 0), (11, 0), &["A", "B"]),
    ];
    let before = slots.clone();

    let _ = rank_slots(&slots);

    assert_eq!(slots, before);
}

#[test]
fn empty_input_ranks_to_empty() {
    assert!(rank_slots(&[]).is_empty());
}

#[test]
fn min_participants_filters_before_ranking() {
    let slots = vec![
        slot((9, 0), (10, 0), &["A"]),
        slot((10, 0), (11, 0), &["A", "B", "C"]),
        slot((11, 0), (12, 0), &["A", "B"]),
    ];

    let ranked = rank_slots_with_min(&slots, 2);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].participant_count(), 3);
    assert_eq!(ranked[1].participant_count(), 2);
}

#[test]
fn top_candidates_truncates_ranked_list() {
    let slots = vec![
        slot((9, 0), (10, 0), &["A"]),
        slot((10, 0), (11, 0), &["A", "B", "C"]),
        slot((11, 0), (12, 0), &["A", "B"]),
    ];

    let top = top_candidates(&slots, 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].start, at(10, 0));
    assert_eq!(top[1].start, at(11, 0));

    assert_eq!(top_candidates(&slots, 10).len(), 3);
    assert!(top_candidates(&slots, 0).is_empty());
}

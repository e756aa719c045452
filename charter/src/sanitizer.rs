use crate::candidates::ms_key;
use crate::chart::Note;
use crate::lane_assigner::EPSILON;
use std::collections::{BTreeMap, HashSet};

/// Restore chart invariants after lane assignment:
///
/// 1. overlapping longs on a lane: the shorter one goes (the later one on ties)
/// 2. taps inside a long on the same lane (within `EPSILON`) are removed
/// 3. notes are sorted by time, taps before longs, then lane
/// 4. exact duplicates are removed
///
/// Running it on its own output changes nothing.
pub fn sanitize(notes: Vec<Note>) -> Vec<Note> {
    let before = notes.len();
    let (longs, taps): (Vec<Note>, Vec<Note>) = notes.into_iter().partition(|n| n.is_long());

    let longs = resolve_long_overlaps(longs);

    let mut by_lane: BTreeMap<u8, Vec<(f64, f64)>> = BTreeMap::new();
    for long in &longs {
        if let Some(end) = long.end_time() {
            by_lane.entry(long.lane).or_default().push((long.time, end));
        }
    }
    let taps = taps.into_iter().filter(|tap| {
        by_lane.get(&tap.lane).map_or(true, |spans| {
            !spans
                .iter()
                .any(|&(start, end)| start - EPSILON <= tap.time && tap.time <= end + EPSILON)
        })
    });

    let mut notes: Vec<Note> = longs.into_iter().chain(taps).collect();
    notes.sort_by(Note::chart_order);

    let mut seen = HashSet::new();
    notes.retain(|n| seen.insert((ms_key(n.time), n.lane, n.is_long(), n.end_time().map(ms_key))));

    if notes.len() != before {
        log::debug!("Sanitizer removed {} note(s)", before - notes.len());
    }
    notes
}

/// Sweep each lane's longs in (start, end) order, keeping the longer of any
/// overlapping pair.
fn resolve_long_overlaps(longs: Vec<Note>) -> Vec<Note> {
    let mut by_lane: BTreeMap<u8, Vec<Note>> = BTreeMap::new();
    for long in longs {
        by_lane.entry(long.lane).or_default().push(long);
    }

    let mut kept = Vec::new();
    for (_, mut lane_longs) in by_lane {
        lane_longs.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(span_end(a).total_cmp(&span_end(b)))
        });

        let mut lane_kept: Vec<Note> = Vec::with_capacity(lane_longs.len());
        for long in lane_longs {
            match lane_kept.last() {
                Some(prev) if long.time <= span_end(prev) => {
                    if length(&long) > length(prev) {
                        lane_kept.pop();
                        lane_kept.push(long);
                    }
                }
                _ => lane_kept.push(long),
            }
        }
        kept.extend(lane_kept);
    }
    kept
}

fn span_end(note: &Note) -> f64 {
    note.end_time().unwrap_or(note.time)
}

fn length(note: &Note) -> f64 {
    span_end(note) - note.time
}

use crate::candidates::{ms_key, Candidate, CandidateKind, CandidateSet, TIME_TOLERANCE};
use crate::chart::Note;
use crate::profile::DifficultyProfile;
use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

pub const LANE_COUNT: usize = 7;

/// Lane that may hold a solo note but is never picked as a chord partner.
pub const SPACE_LANE: u8 = 3;

/// Half-width of the interval a tap reserves on its lane.
pub const EPSILON: f64 = 0.02;

/// Weighted draws before falling back to a scan over every lane.
pub const MAX_WEIGHTED_ATTEMPTS: usize = 4;

pub const MAX_NOTES_PER_TIMESTAMP: u8 = 2;

const CHORD_FALLBACK_OFFSETS: [u8; 6] = [3, 4, 2, 5, 1, 6];

/// Closed time range reserved on a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Interval { start, end }
    }

    pub fn around(t: f64) -> Self {
        Interval::new(t - EPSILON, t + EPSILON)
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Reserved intervals per lane, each list sorted and pairwise disjoint.
#[derive(Clone, Debug, Default)]
pub struct LaneOccupancy {
    lanes: [Vec<Interval>; LANE_COUNT],
}

impl LaneOccupancy {
    pub fn is_free(&self, lane: u8, interval: Interval) -> bool {
        let reserved = &self.lanes[lane as usize];
        // disjoint and sorted: only the last interval starting before our end can reach us
        let idx = reserved.partition_point(|r| r.start <= interval.end);
        match idx.checked_sub(1) {
            Some(i) => !reserved[i].overlaps(&interval),
            None => true,
        }
    }

    pub fn reserve(&mut self, lane: u8, interval: Interval) {
        let reserved = &mut self.lanes[lane as usize];
        let idx = reserved.partition_point(|r| r.start <= interval.start);
        reserved.insert(idx, interval);
    }

    pub fn intervals(&self, lane: u8) -> &[Interval] {
        &self.lanes[lane as usize]
    }
}

/// All mutable bookkeeping of one scheduling pass.
#[derive(Clone, Debug, Default)]
pub struct SchedulerState {
    occupancy: LaneOccupancy,
    last_tap: [Option<f64>; LANE_COUNT],
    /// Notes per exact millisecond
    concurrency: BTreeMap<i64, u8>,
    /// Lane of the last primary placement
    cursor: Option<u8>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupancy(&self) -> &LaneOccupancy {
        &self.occupancy
    }

    pub fn notes_at(&self, t: f64) -> u8 {
        self.concurrency.get(&ms_key(t)).copied().unwrap_or(0)
    }

    fn has_room(&self, t: f64) -> bool {
        self.notes_at(t) < MAX_NOTES_PER_TIMESTAMP
    }

    pub fn tap_fits(&self, lane: u8, t: f64, min_gap: f64) -> bool {
        let spaced = self.last_tap[lane as usize]
            .map_or(true, |last| t - last >= min_gap - TIME_TOLERANCE);
        spaced && self.occupancy.is_free(lane, Interval::around(t))
    }

    pub fn long_fits(&self, lane: u8, start: f64, end: f64) -> bool {
        self.occupancy.is_free(lane, Interval::new(start, end))
    }

    /// Sampling weights relative to the cursor, or `None` before the first placement.
    ///
    /// `alpha` blends a preference for nearby lanes (0) with one for far jumps (1).
    /// The cursor lane itself always gets weight zero.
    pub fn lane_weights(&self, alpha: f64) -> Option<[f64; LANE_COUNT]> {
        let last = self.cursor?;
        let mut weights = [0.0; LANE_COUNT];
        for (lane, w) in weights.iter_mut().enumerate() {
            let diff = (lane as i32 - last as i32).unsigned_abs() as usize;
            let dist = diff.min(LANE_COUNT - diff) as f64;
            let close = 1.0 / (dist + 1.0);
            let jump = dist + 1.0;
            *w = (1.0 - alpha) * close + alpha * jump;
        }
        weights[last as usize] = 0.0;
        Some(weights)
    }

    pub fn pick_lane<R: Rng>(&self, rng: &mut R, alpha: f64) -> u8 {
        let weighted = self
            .lane_weights(alpha)
            .and_then(|weights| WeightedIndex::new(weights).ok());
        match weighted {
            Some(dist) => rng.sample(&dist) as u8,
            None => rng.gen_range(0..LANE_COUNT) as u8,
        }
    }

    /// Up to `attempts` weighted draws; the first lane accepted by `fits` wins.
    pub fn try_weighted<R, F>(
        &self,
        rng: &mut R,
        alpha: f64,
        attempts: usize,
        fits: F,
    ) -> Option<u8>
    where
        R: Rng,
        F: Fn(u8) -> bool,
    {
        (0..attempts)
            .map(|_| self.pick_lane(rng, alpha))
            .find(|&lane| fits(lane))
    }

    pub fn place_tap<R: Rng>(
        &mut self,
        rng: &mut R,
        t: f64,
        alpha: f64,
        min_gap: f64,
    ) -> Option<u8> {
        if !self.has_room(t) {
            return None;
        }
        let fits = |lane| self.tap_fits(lane, t, min_gap);
        let lane = self
            .try_weighted(rng, alpha, MAX_WEIGHTED_ATTEMPTS, fits)
            .or_else(|| try_exhaustive(fits))?;

        self.commit_tap(lane, t);
        self.cursor = Some(lane);
        Some(lane)
    }

    pub fn place_long<R: Rng>(
        &mut self,
        rng: &mut R,
        start: f64,
        end: f64,
        alpha: f64,
    ) -> Option<u8> {
        if !self.has_room(start) {
            return None;
        }
        let fits = |lane| self.long_fits(lane, start, end);
        let lane = self
            .try_weighted(rng, alpha, MAX_WEIGHTED_ATTEMPTS, fits)
            .or_else(|| try_exhaustive(fits))?;

        self.occupancy.reserve(lane, Interval::new(start, end));
        *self.concurrency.entry(ms_key(start)).or_insert(0) += 1;
        self.cursor = Some(lane);
        Some(lane)
    }

    /// Maybe add a second tap at `t` next to the one on `base`.
    ///
    /// The gate draw happens before any lane draw and is skipped entirely when
    /// `base` is the space lane.
    pub fn place_chord<R: Rng>(
        &mut self,
        rng: &mut R,
        t: f64,
        base: u8,
        probability: f64,
        min_distance: u8,
        min_gap: f64,
    ) -> Option<u8> {
        if base == SPACE_LANE {
            return None;
        }
        if rng.gen::<f64>() >= probability || !self.has_room(t) {
            return None;
        }

        let fits = |lane: u8| lane != SPACE_LANE && lane != base && self.tap_fits(lane, t, min_gap);
        let spread: Vec<u8> = (0..LANE_COUNT as u8)
            .filter(|&lane| base.abs_diff(lane) >= min_distance && fits(lane))
            .collect();

        let lane = match spread.choose(rng) {
            Some(&lane) => lane,
            None => CHORD_FALLBACK_OFFSETS
                .iter()
                .map(|offset| (base + offset) % LANE_COUNT as u8)
                .find(|&lane| fits(lane))?,
        };

        self.commit_tap(lane, t);
        Some(lane)
    }

    fn commit_tap(&mut self, lane: u8, t: f64) {
        self.occupancy.reserve(lane, Interval::around(t));
        self.last_tap[lane as usize] = Some(t);
        *self.concurrency.entry(ms_key(t)).or_insert(0) += 1;
    }
}

/// Scan lanes in index order for the first one accepted by `fits`.
pub fn try_exhaustive<F: Fn(u8) -> bool>(fits: F) -> Option<u8> {
    (0..LANE_COUNT as u8).find(|&lane| fits(lane))
}

/// Places candidates on lanes for one difficulty profile.
pub struct LaneAssigner<'a> {
    profile: &'a DifficultyProfile,
}

impl<'a> LaneAssigner<'a> {
    pub fn new(profile: &'a DifficultyProfile) -> Self {
        LaneAssigner { profile }
    }

    /// Place every long (by start) then every tap (by time, each followed by its
    /// chord attempt). Candidates with no legal lane are dropped.
    pub fn assign_lanes<R: Rng>(&self, candidates: &CandidateSet, rng: &mut R) -> Vec<Note> {
        let mut state = SchedulerState::new();
        let mut notes = Vec::with_capacity(candidates.taps.len() + candidates.longs.len());
        let mut dropped = 0usize;

        let mut longs: Vec<&Candidate> = candidates.longs.iter().collect();
        longs.sort_by(|a, b| a.time.total_cmp(&b.time));
        for long in longs {
            let CandidateKind::Sustain { end } = long.kind else {
                continue;
            };
            let alpha = self.profile.jump_strength.get(long.tier);
            match state.place_long(rng, long.time, end, alpha) {
                Some(lane) => notes.push(Note::long(long.time, end, lane)),
                None => dropped += 1,
            }
        }

        let mut taps: Vec<&Candidate> = candidates.taps.iter().collect();
        taps.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut chords = 0usize;
        for tap in taps {
            let alpha = self.profile.jump_strength.get(tap.tier);
            let gap = self.profile.min_gap.get(tap.tier);
            let Some(lane) = state.place_tap(rng, tap.time, alpha, gap) else {
                dropped += 1;
                continue;
            };
            notes.push(Note::tap(tap.time, lane));

            let probability = self.profile.chord_probability.get(tap.tier);
            let min_distance = self.profile.chord_min_distance;
            if let Some(partner) =
                state.place_chord(rng, tap.time, lane, probability, min_distance, gap)
            {
                notes.push(Note::tap(tap.time, partner));
                chords += 1;
            }
        }

        log::debug!(
            "Lane assignment ({}): {} note(s), {} chord(s), {} candidate(s) dropped",
            self.profile.difficulty,
            notes.len(),
            chords,
            dropped
        );
        notes
    }
}

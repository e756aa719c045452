use crate::candidates::{ms_key, round_ms, Candidate, CandidateSet};
use crate::energy::{EnergyClassifier, EnergyTier};
use crate::grid::make_subgrid;
use crate::profile::{DifficultyProfile, Injection, Thinning};
use rand::Rng;
use std::collections::VecDeque;

/// Length of the trailing window used by the notes-per-second cap.
pub const RATE_WINDOW_SEC: f64 = 1.0;

/// Thins or thickens the tap stream according to the profile. Longs are left alone.
pub struct DensityRegulator<'a> {
    profile: &'a DifficultyProfile,
    classifier: &'a EnergyClassifier,
    beats: &'a [f64],
}

impl<'a> DensityRegulator<'a> {
    pub fn new(
        profile: &'a DifficultyProfile,
        classifier: &'a EnergyClassifier,
        beats: &'a [f64],
    ) -> Self {
        DensityRegulator { profile, classifier, beats }
    }

    pub fn regulate<R: Rng>(&self, mut set: CandidateSet, rng: &mut R) -> CandidateSet {
        let before = set.taps.len();

        if let Some(thinning) = self.profile.thinning {
            set.taps = thin(std::mem::take(&mut set.taps), thinning, rng);
        }
        if let Some(injection) = self.profile.injection {
            self.inject(&mut set, injection, rng);
        }

        log::debug!(
            "Density ({}): {} -> {} tap(s)",
            self.profile.difficulty,
            before,
            set.taps.len()
        );
        set
    }

    /// Add taps on the injection grid inside very-hard sections.
    fn inject<R: Rng>(&self, set: &mut CandidateSet, injection: Injection, rng: &mut R) {
        let gap = self.profile.min_gap.very_hard;
        let mut occupied: Vec<f64> = set.taps.iter().map(|c| c.time).collect();
        let mut extra = Vec::new();

        for point in make_subgrid(self.beats, injection.subdiv) {
            let t = round_ms(point);
            if self.classifier.tier_at(t) != EnergyTier::VeryHard {
                continue;
            }
            if set.in_any_long(t) {
                continue;
            }
            if nearest_distance(&occupied, t) < gap {
                continue;
            }
            if rng.gen::<f64>() < injection.probability {
                let idx = occupied.partition_point(|&o| o < t);
                occupied.insert(idx, t);
                extra.push(Candidate::tap(t, EnergyTier::VeryHard));
            }
        }

        if !extra.is_empty() {
            log::debug!("Injected {} tap(s) into very-hard sections", extra.len());
            set.taps.extend(extra);
            set.taps.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
    }
}

/// Keep each tap with a fixed probability, then cap the rate.
fn thin<R: Rng>(taps: Vec<Candidate>, thinning: Thinning, rng: &mut R) -> Vec<Candidate> {
    let kept: Vec<Candidate> = taps
        .into_iter()
        .filter(|_| rng.gen::<f64>() < thinning.keep_probability)
        .collect();
    rate_cap(kept, thinning.max_notes_per_second)
}

/// Reject taps that would put more than `max_per_window` taps inside the
/// trailing window `(t - 1s, t]`.
pub fn rate_cap(taps: Vec<Candidate>, max_per_window: usize) -> Vec<Candidate> {
    let span = ms_key(RATE_WINDOW_SEC);
    let mut window: VecDeque<i64> = VecDeque::new();
    let mut kept = Vec::with_capacity(taps.len());

    for tap in taps {
        let now = ms_key(tap.time);
        while window.front().is_some_and(|&front| front <= now - span) {
            window.pop_front();
        }
        if window.len() < max_per_window {
            window.push_back(now);
            kept.push(tap);
        }
    }
    kept
}

/// Distance from `t` to the closest value of a sorted slice (infinite if empty).
fn nearest_distance(sorted: &[f64], t: f64) -> f64 {
    let idx = sorted.partition_point(|&o| o < t);
    let after = sorted.get(idx).map(|&o| o - t);
    let before = idx.checked_sub(1).map(|i| t - sorted[i]);
    after.into_iter().chain(before).fold(f64::INFINITY, f64::min)
}

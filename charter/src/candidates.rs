use crate::energy::{percentile, EnergyClassifier, EnergyCurve, EnergyTier};
use crate::grid::{snap_to_grid, TierGrids};
use crate::profile::DifficultyProfile;

/// Slack used when comparing lengths of millisecond-rounded times.
pub const TIME_TOLERANCE: f64 = 1e-9;

/// Round to millisecond precision.
pub fn round_ms(t: f64) -> f64 {
    (t * 1000.0).round() / 1000.0
}

/// Integer millisecond key for exact-timestamp bookkeeping.
pub fn ms_key(t: f64) -> i64 {
    (t * 1000.0).round() as i64
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateKind {
    Tap,
    Sustain { end: f64 },
}

/// A note event before it has a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub time: f64,
    /// Energy tier at `time`, drives gap, jump and chord parameters
    pub tier: EnergyTier,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn tap(time: f64, tier: EnergyTier) -> Self {
        Candidate { time, tier, kind: CandidateKind::Tap }
    }

    pub fn sustain(start: f64, end: f64, tier: EnergyTier) -> Self {
        Candidate {
            time: start,
            tier,
            kind: CandidateKind::Sustain { end },
        }
    }

    pub fn end(&self) -> Option<f64> {
        match self.kind {
            CandidateKind::Tap => None,
            CandidateKind::Sustain { end } => Some(end),
        }
    }
}

/// A stretch of sustained energy on the raw curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SustainSegment {
    pub start: f64,
    pub end: f64,
}

/// Find runs of the raw curve at or above its `threshold_pct` percentile that
/// last at least `min_duration` seconds.
///
/// A run that ends before the curve does is closed at the first sample below
/// the threshold. A flat curve has no sustains.
pub fn detect_sustains(
    raw: &EnergyCurve,
    threshold_pct: f64,
    min_duration: f64,
) -> Vec<SustainSegment> {
    if raw.is_flat() {
        return Vec::new();
    }

    let threshold = percentile(&raw.values, threshold_pct);
    let last = raw.len() - 1;
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &value) in raw.values.iter().enumerate() {
        let loud = value >= threshold;
        if loud && start.is_none() {
            start = Some(i);
        }
        if !loud || i == last {
            if let Some(s) = start.take() {
                let t0 = raw.times[s];
                let t1 = raw.times[i];
                if t1 > t0 && t1 - t0 >= min_duration {
                    segments.push(SustainSegment { start: t0, end: t1 });
                }
            }
        }
    }

    log::debug!(
        "Sustain detection: threshold={:.5} (p{}), {} segment(s) >= {}s",
        threshold,
        threshold_pct,
        segments.len(),
        min_duration
    );
    segments
}

/// Snapped tap and long candidates of one chart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateSet {
    /// Ascending by time, millisecond-rounded, unique
    pub taps: Vec<Candidate>,
    /// Ascending by start
    pub longs: Vec<Candidate>,
}

impl CandidateSet {
    /// Whether `time` falls inside any long (endpoints included).
    pub fn in_any_long(&self, time: f64) -> bool {
        inside_any(&self.longs, time)
    }

    /// Drop taps swallowed by a long.
    pub fn remove_taps_in_longs(&mut self) {
        let before = self.taps.len();
        let longs = &self.longs;
        self.taps.retain(|tap| !inside_any(longs, tap.time));
        if self.taps.len() != before {
            log::debug!("Dropped {} tap(s) inside long notes", before - self.taps.len());
        }
    }

    /// Shift every candidate by `offset` seconds, clamping at zero.
    ///
    /// Taps that collapse onto the same millisecond are merged and longs that
    /// shrink below `long_snap_min` are dropped.
    pub fn with_offset(mut self, offset: f64, long_snap_min: f64) -> Self {
        if offset == 0.0 {
            return self;
        }
        let shift = |t: f64| round_ms((t + offset).max(0.0));

        for tap in &mut self.taps {
            tap.time = shift(tap.time);
        }
        self.taps.dedup_by(|b, a| ms_key(a.time) == ms_key(b.time));

        self.longs = self
            .longs
            .into_iter()
            .filter_map(|long| {
                let end = shift(long.end()?);
                let start = shift(long.time);
                (end - start >= long_snap_min - TIME_TOLERANCE)
                    .then(|| Candidate::sustain(start, end, long.tier))
            })
            .collect();

        self.remove_taps_in_longs();
        self
    }
}

fn inside_any(longs: &[Candidate], time: f64) -> bool {
    longs.iter().any(|long| match long.end() {
        Some(end) => long.time <= time && time <= end,
        None => false,
    })
}

/// Turns onsets and sustains into snapped candidates for one profile.
pub struct CandidateDeriver<'a> {
    profile: &'a DifficultyProfile,
    classifier: &'a EnergyClassifier,
    grids: &'a TierGrids,
}

impl<'a> CandidateDeriver<'a> {
    pub fn new(
        profile: &'a DifficultyProfile,
        classifier: &'a EnergyClassifier,
        grids: &'a TierGrids,
    ) -> Self {
        CandidateDeriver { profile, classifier, grids }
    }

    /// Snap a raw time to the grid chosen by the energy at that (unsnapped) time.
    pub fn snap(&self, time: f64) -> f64 {
        let tier = self.profile.snap_tier(self.classifier.tier_at(time));
        snap_to_grid(time, self.grids.for_tier(tier))
    }

    pub fn derive(&self, onsets: &[f64], sustains: &[SustainSegment]) -> CandidateSet {
        let mut set = CandidateSet {
            taps: self.derive_taps(onsets),
            longs: self.derive_longs(sustains),
        };
        set.remove_taps_in_longs();
        log::debug!(
            "Derived {} tap and {} long candidate(s) from {} onset(s)",
            set.taps.len(),
            set.longs.len(),
            onsets.len()
        );
        set
    }

    fn derive_taps(&self, onsets: &[f64]) -> Vec<Candidate> {
        let mut snapped: Vec<f64> = onsets.iter().map(|&t| self.snap(t)).collect();
        snapped.sort_by(|a, b| a.total_cmp(b));

        let mut taps: Vec<Candidate> = Vec::with_capacity(snapped.len());
        let mut last_kept = f64::NEG_INFINITY;
        for t in snapped {
            let tier = self.classifier.tier_at(t);
            if t - last_kept >= self.profile.min_gap.get(tier) {
                last_kept = t;
                taps.push(Candidate::tap(round_ms(t), tier));
            }
        }
        taps.dedup_by(|b, a| ms_key(a.time) == ms_key(b.time));
        taps
    }

    fn derive_longs(&self, sustains: &[SustainSegment]) -> Vec<Candidate> {
        let mut longs: Vec<Candidate> = sustains
            .iter()
            .filter_map(|seg| {
                let start = round_ms(self.snap(seg.start));
                let end = round_ms(self.snap(seg.end));
                (end - start >= self.profile.long_snap_min_sec - TIME_TOLERANCE)
                    .then(|| Candidate::sustain(start, end, self.classifier.tier_at(start)))
            })
            .collect();
        longs.sort_by(|a, b| a.time.total_cmp(&b.time));
        longs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Difficulty;

    fn flat_curve(duration: f64, value: f64) -> EnergyCurve {
        let n = (duration / 0.05) as usize + 1;
        EnergyCurve {
            times: (0..n).map(|i| i as f64 * 0.05).collect(),
            values: vec![value; n],
        }
    }

    #[test]
    fn test_detect_sustains_keeps_long_runs_only() {
        // loud from 1.0 to 2.2, short blip around 3.0
        let times: Vec<f64> = (0..80).map(|i| i as f64 * 0.05).collect();
        let values: Vec<f64> = (0..80)
            .map(|i| if (20..44).contains(&i) || (59..61).contains(&i) { 1.0 } else { 0.1 })
            .collect();
        let curve = EnergyCurve { times, values };

        let segments = detect_sustains(&curve, 75.0, 0.7);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start - 1.0).abs() < 1e-6);
        // closed at the first quiet sample
        assert!((segments[0].end - 2.2).abs() < 1e-6);
    }

    #[test]
    fn test_detect_sustains_run_to_end_of_curve() {
        let curve = EnergyCurve {
            times: vec![0.0, 0.5, 1.0, 1.5, 2.0],
            values: vec![0.0, 0.0, 1.0, 1.0, 1.0],
        };
        let segments = detect_sustains(&curve, 50.0, 0.5);
        assert_eq!(segments, vec![SustainSegment { start: 1.0, end: 2.0 }]);
        assert!(detect_sustains(&EnergyCurve::default(), 50.0, 0.5).is_empty());
        assert!(detect_sustains(&flat_curve(3.0, 0.5), 45.0, 0.5).is_empty());
    }

    #[test]
    fn test_easy_taps_snap_to_beats_and_respect_gap() {
        let profile = Difficulty::Easy.profile();
        let classifier =
            EnergyClassifier::new(flat_curve(5.0, 0.2), profile.hard_pct, profile.very_hard_pct);
        let beats = [0.0, 1.0, 2.0, 3.0, 4.0];
        let grids = TierGrids::new(&beats, profile.subdiv_hard, profile.subdiv_very_hard);
        let deriver = CandidateDeriver::new(&profile, &classifier, &grids);

        let set = deriver.derive(&[0.02, 1.01, 2.5, 3.0, 3.04], &[]);
        let times: Vec<f64> = set.taps.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(set.longs.is_empty());
    }

    #[test]
    fn test_gap_filter_compares_against_last_kept() {
        let mut profile = Difficulty::Normal.profile();
        profile.min_gap = crate::profile::PerTier::new(0.3, 0.3, 0.3);
        let classifier =
            EnergyClassifier::new(flat_curve(3.0, 0.2), profile.hard_pct, profile.very_hard_pct);
        let beats: Vec<f64> = (0..=20).map(|i| i as f64 * 0.1).collect();
        let grids = TierGrids::new(&beats, 1, 1);
        let deriver = CandidateDeriver::new(&profile, &classifier, &grids);

        // 0.2 is rejected (0.2 < 0.3 after 0.0); 0.4 is measured from 0.0, not 0.2
        let set = deriver.derive(&[0.0, 0.2, 0.4, 0.5, 0.8], &[]);
        let times: Vec<f64> = set.taps.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0.0, 0.4, 0.8]);
    }

    #[test]
    fn test_long_swallows_taps_and_short_longs_are_dropped() {
        let profile = Difficulty::Easy.profile();
        let classifier =
            EnergyClassifier::new(flat_curve(5.0, 0.2), profile.hard_pct, profile.very_hard_pct);
        let grids = TierGrids::new(&[0.0, 1.0, 2.0, 3.0, 4.0], 1, 1);
        let deriver = CandidateDeriver::new(&profile, &classifier, &grids);

        let sustains = [
            SustainSegment { start: 1.0, end: 2.2 },
            // both ends snap to 3.0
            SustainSegment { start: 2.9, end: 3.2 },
        ];
        let set = deriver.derive(&[0.0, 1.0, 1.5, 2.0, 3.0], &sustains);

        assert_eq!(set.longs.len(), 1);
        assert_eq!(set.longs[0].time, 1.0);
        assert_eq!(set.longs[0].end(), Some(2.0));
        let times: Vec<f64> = set.taps.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0.0, 3.0]);
    }

    #[test]
    fn test_offset_clamps_and_merges() {
        let set = CandidateSet {
            taps: vec![
                Candidate::tap(0.0, EnergyTier::Easy),
                Candidate::tap(0.05, EnergyTier::Easy),
                Candidate::tap(1.0, EnergyTier::Easy),
            ],
            longs: vec![
                Candidate::sustain(0.05, 0.3, EnergyTier::Easy),
                Candidate::sustain(2.0, 3.0, EnergyTier::Easy),
            ],
        };

        let shifted = set.with_offset(-0.1, 0.35);
        let times: Vec<f64> = shifted.taps.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0.0, 0.9]);
        assert_eq!(shifted.longs.len(), 1);
        assert_eq!(shifted.longs[0].time, 1.9);
        assert_eq!(shifted.longs[0].end(), Some(2.9));
    }
}

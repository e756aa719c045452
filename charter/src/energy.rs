use serde::Serialize;

/// Spread below which a curve is considered flat.
const FLAT_EPSILON: f64 = 1e-12;

/// Energy samples over time, ordered by timestamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnergyCurve {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl EnergyCurve {
    pub fn from_samples(samples: &[(f64, f64)]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, values) = sorted.into_iter().unzip();
        EnergyCurve { times, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the sample closest to `time`, earliest on ties.
    pub fn nearest_index(&self, time: f64) -> Option<usize> {
        if self.times.is_empty() {
            return None;
        }
        let idx = self.times.partition_point(|&t| t < time);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.times.len() {
            return Some(idx - 1);
        }
        if (time - self.times[idx - 1]).abs() <= (self.times[idx] - time).abs() {
            Some(idx - 1)
        } else {
            Some(idx)
        }
    }

    /// Sample spacing, taken from the first two samples.
    pub fn hop(&self) -> Option<f64> {
        match self.times.as_slice() {
            [a, b, ..] if b > a => Some(b - a),
            _ => None,
        }
    }

    /// True for an empty curve or one with no spread between samples.
    pub fn is_flat(&self) -> bool {
        let max = self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = self.values.iter().cloned().fold(f64::INFINITY, f64::min);
        self.values.is_empty() || max - min < FLAT_EPSILON
    }
}

/// Percentile with linear interpolation between closest ranks. `pct` is in
/// `[0, 100]`. Returns 0 for empty input.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Local intensity class of a moment in the song.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyTier {
    Easy,
    Hard,
    VeryHard,
}

/// Classifies timestamps against percentile thresholds of the smoothed curve.
#[derive(Clone, Debug)]
pub struct EnergyClassifier {
    curve: EnergyCurve,
    hard_threshold: f64,
    very_hard_threshold: f64,
    flat: bool,
}

impl EnergyClassifier {
    pub fn new(curve: EnergyCurve, hard_pct: f64, very_hard_pct: f64) -> Self {
        let hard_threshold = percentile(&curve.values, hard_pct);
        let very_hard_threshold = percentile(&curve.values, very_hard_pct);
        let flat = curve.is_flat();
        if flat {
            log::warn!("Energy curve is flat or empty, classifying every moment as easy");
        }
        log::debug!(
            "Energy thresholds: hard={:.5} (p{}), very_hard={:.5} (p{})",
            hard_threshold,
            hard_pct,
            very_hard_threshold,
            very_hard_pct
        );
        EnergyClassifier {
            curve,
            hard_threshold,
            very_hard_threshold,
            flat,
        }
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.hard_threshold, self.very_hard_threshold)
    }

    pub fn curve(&self) -> &EnergyCurve {
        &self.curve
    }

    pub fn tier_at(&self, time: f64) -> EnergyTier {
        if self.flat {
            return EnergyTier::Easy;
        }
        let Some(idx) = self.curve.nearest_index(time) else {
            return EnergyTier::Easy;
        };
        let e = self.curve.values[idx];
        if e >= self.very_hard_threshold {
            EnergyTier::VeryHard
        } else if e >= self.hard_threshold {
            EnergyTier::Hard
        } else {
            EnergyTier::Easy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> EnergyCurve {
        EnergyCurve {
            times: (0..n).map(|i| i as f64 * 0.1).collect(),
            values: (0..n).map(|i| i as f64).collect(),
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 87.5) - 4.5).abs() < 1e-9);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_thresholds_are_monotonic() {
        let curve = EnergyCurve {
            times: (0..50).map(|i| i as f64).collect(),
            values: (0..50).map(|i| ((i * 37) % 11) as f64 * 0.3).collect(),
        };
        for (hard, very_hard) in [(87.0, 93.0), (70.0, 81.0), (60.0, 70.0), (52.0, 62.0)] {
            let classifier = EnergyClassifier::new(curve.clone(), hard, very_hard);
            let (h, vh) = classifier.thresholds();
            assert!(vh >= h);
        }
    }

    #[test]
    fn test_tier_uses_nearest_sample() {
        // values 0..=99, hard >= 60, very_hard >= 70 (approximately)
        let classifier = EnergyClassifier::new(ramp(100), 60.0, 70.0);
        assert_eq!(classifier.tier_at(0.0), EnergyTier::Easy);
        assert_eq!(classifier.tier_at(6.5), EnergyTier::Hard);
        assert_eq!(classifier.tier_at(9.0), EnergyTier::VeryHard);
        assert_eq!(classifier.tier_at(500.0), EnergyTier::VeryHard);
    }

    #[test]
    fn test_flat_curve_is_easy_everywhere() {
        let curve = EnergyCurve {
            times: vec![0.0, 1.0, 2.0],
            values: vec![0.4, 0.4, 0.4],
        };
        let classifier = EnergyClassifier::new(curve, 87.0, 93.0);
        assert_eq!(classifier.tier_at(1.0), EnergyTier::Easy);

        let empty = EnergyClassifier::new(EnergyCurve::default(), 87.0, 93.0);
        assert_eq!(empty.tier_at(1.0), EnergyTier::Easy);
    }

    #[test]
    fn test_nearest_index_ties_to_earlier() {
        let curve = ramp(3);
        assert_eq!(curve.nearest_index(0.05), Some(0));
        assert_eq!(curve.nearest_index(0.06), Some(1));
        assert_eq!(curve.nearest_index(-1.0), Some(0));
        assert_eq!(EnergyCurve::default().nearest_index(1.0), None);
    }
}

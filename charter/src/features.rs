use crate::energy::EnergyCurve;
use crate::error::{ChartError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spacing of the synthesized beat grid used when extraction found too few beats.
pub const FALLBACK_BEAT_SPACING: f64 = 0.5;

/// Width (in samples) of the moving average applied to the raw energy curve.
pub const SMOOTHING_WINDOW: usize = 6;

/// Longest song accepted, in seconds.
pub const MAX_DURATION_SEC: f64 = 24.0 * 60.0 * 60.0;

/// Features produced by the extraction service for a single song.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    pub beat_timestamps: Vec<f64>,
    #[serde(default)]
    pub onset_timestamps: Vec<f64>,
    /// Smoothed energy curve as `(time, magnitude)` pairs
    #[serde(default)]
    pub energy_curve: Vec<(f64, f64)>,
    /// Unsmoothed energy curve, used for sustain detection
    #[serde(default)]
    pub raw_energy_curve: Vec<(f64, f64)>,
    pub duration: f64,
    pub tempo: f64,
}

impl FeatureSet {
    /// Load and validate a feature file written by the extraction service.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ChartError::MissingFeatures { path: path.to_path_buf() }
            } else {
                ChartError::Io { path: path.to_path_buf(), source }
            }
        })?;

        let features: FeatureSet = serde_json::from_str(&content).map_err(|source| {
            ChartError::MalformedFeatures { path: path.to_path_buf(), source }
        })?;

        features.validate()?;
        log::debug!(
            "Loaded features from {}: {} beats, {} onsets, {} energy samples",
            path.display(),
            features.beat_timestamps.len(),
            features.onset_timestamps.len(),
            features.energy_curve.len().max(features.raw_energy_curve.len()),
        );
        Ok(features)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ChartError::InvalidFeatures(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration
            )));
        }
        if self.duration > MAX_DURATION_SEC {
            return Err(ChartError::InvalidFeatures(format!(
                "duration {}s exceeds the {}s limit",
                self.duration, MAX_DURATION_SEC
            )));
        }
        if !self.tempo.is_finite() || self.tempo < 0.0 {
            return Err(ChartError::InvalidFeatures(format!(
                "tempo must be a non-negative number, got {}",
                self.tempo
            )));
        }
        check_times("beatTimestamps", &self.beat_timestamps)?;
        check_times("onsetTimestamps", &self.onset_timestamps)?;
        check_curve("energyCurve", &self.energy_curve)?;
        check_curve("rawEnergyCurve", &self.raw_energy_curve)?;
        Ok(())
    }

    /// Sorted, de-duplicated beat grid. Falls back to a synthesized grid at
    /// [`FALLBACK_BEAT_SPACING`] when fewer than two beats were extracted.
    pub fn beat_grid(&self) -> Vec<f64> {
        let mut beats = self.beat_timestamps.clone();
        beats.sort_by(|a, b| a.total_cmp(b));
        beats.dedup();

        if beats.len() < 2 {
            log::warn!(
                "Only {} beat(s) extracted, synthesizing a {}s grid over {:.1}s",
                beats.len(),
                FALLBACK_BEAT_SPACING,
                self.duration
            );
            return synthesize_beats(self.duration);
        }
        beats
    }

    /// The smoothed curve used for tier classification and preview search.
    /// Derived from the raw curve when extraction did not supply one.
    pub fn smoothed_curve(&self) -> EnergyCurve {
        if !self.energy_curve.is_empty() {
            return EnergyCurve::from_samples(&self.energy_curve);
        }
        let raw = EnergyCurve::from_samples(&self.raw_energy_curve);
        let values = smooth_curve(&raw.values, SMOOTHING_WINDOW);
        EnergyCurve { times: raw.times, values }
    }

    /// The unsmoothed curve used for sustain detection. Empty when extraction
    /// did not supply one, so the chart gets no long notes.
    pub fn raw_curve(&self) -> EnergyCurve {
        if self.raw_energy_curve.is_empty() {
            log::warn!("No raw energy curve supplied, skipping long notes");
        }
        EnergyCurve::from_samples(&self.raw_energy_curve)
    }
}

fn check_times(name: &str, times: &[f64]) -> Result<()> {
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(ChartError::InvalidFeatures(format!("{name} contains non-finite value {t}")));
    }
    Ok(())
}

fn check_curve(name: &str, curve: &[(f64, f64)]) -> Result<()> {
    for &(t, m) in curve {
        if !t.is_finite() || !m.is_finite() {
            return Err(ChartError::InvalidFeatures(format!(
                "{name} contains non-finite sample ({t}, {m})"
            )));
        }
        if m < 0.0 {
            return Err(ChartError::InvalidFeatures(format!(
                "{name} contains negative magnitude {m} at {t}s"
            )));
        }
    }
    Ok(())
}

/// Uniform beat grid over `[0, duration)`.
pub fn synthesize_beats(duration: f64) -> Vec<f64> {
    let count = (duration / FALLBACK_BEAT_SPACING).ceil().max(0.0) as usize;
    (0..count)
        .map(|i| i as f64 * FALLBACK_BEAT_SPACING)
        .filter(|&t| t < duration)
        .collect()
}

/// Smooth curve using a centered moving average that shrinks at the edges.
pub fn smooth_curve(data: &[f64], window_size: usize) -> Vec<f64> {
    if data.is_empty() || window_size == 0 {
        return data.to_vec();
    }

    let half_window = window_size / 2;
    let mut smoothed = Vec::with_capacity(data.len());

    for i in 0..data.len() {
        let start = i.saturating_sub(half_window);
        let end = (i + window_size - half_window).min(data.len());

        let avg = data[start..end].iter().sum::<f64>() / (end - start) as f64;
        smoothed.push(avg);
    }

    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn features(beats: Vec<f64>, duration: f64) -> FeatureSet {
        FeatureSet {
            beat_timestamps: beats,
            duration,
            tempo: 120.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_beat_falls_back_to_synthesized_grid() {
        let grid = features(vec![1.3], 3.0).beat_grid();
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_beat_grid_is_sorted_and_deduplicated() {
        let grid = features(vec![2.0, 1.0, 1.0, 3.0], 4.0).beat_grid();
        assert_eq!(grid, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_smooth_curve_flattens_spike() {
        let data = vec![0.0, 0.0, 0.0, 6.0, 0.0, 0.0, 0.0];
        let smoothed = smooth_curve(&data, SMOOTHING_WINDOW);
        assert_eq!(smoothed.len(), data.len());
        assert!((smoothed[3] - 1.0).abs() < 1e-9);
        assert!(smoothed.iter().all(|&v| v < 2.0));
    }

    #[test]
    fn test_smoothed_curve_derived_from_raw_when_missing() {
        let mut f = features(vec![0.0, 1.0], 2.0);
        f.raw_energy_curve = (0..10)
            .map(|i| (i as f64 * 0.1, if i == 5 { 1.0 } else { 0.0 }))
            .collect();
        let curve = f.smoothed_curve();
        assert_eq!(curve.len(), 10);
        assert!(curve.values[5] < 1.0);
        assert!(curve.values[5] > 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_duration_and_negative_energy() {
        let f = features(vec![0.0, 1.0], 0.0);
        assert!(matches!(f.validate(), Err(ChartError::InvalidFeatures(_))));

        let mut f = features(vec![0.0, 1.0], 2.0);
        f.energy_curve = vec![(0.0, -1.0)];
        assert!(matches!(f.validate(), Err(ChartError::InvalidFeatures(_))));
    }

    #[test]
    fn test_validate_rejects_absurd_duration() {
        let f = features(vec![0.0, 1.0], 1e20);
        let err = f.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_features");

        assert!(features(vec![0.0, 1.0], MAX_DURATION_SEC).validate().is_ok());
    }

    #[test]
    fn test_raw_curve_never_borrows_smoothed_curve() {
        let mut f = features(vec![0.0, 1.0], 2.0);
        f.energy_curve = vec![(0.0, 0.1), (1.0, 0.9)];
        assert!(f.raw_curve().is_empty());

        f.raw_energy_curve = vec![(1.0, 0.3), (0.0, 0.2)];
        assert_eq!(f.raw_curve().times, vec![0.0, 1.0]);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = FeatureSet::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.code(), "missing_features");
        assert!(err.to_string().contains("here.json"));
    }

    #[test]
    fn test_load_reads_camel_case_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"beatTimestamps":[0,1,2],"onsetTimestamps":[0.5],
                "energyCurve":[[0,0.1],[1,0.2]],"rawEnergyCurve":[[0,0.1],[1,0.3]],
                "duration":3.0,"tempo":60.0}}"#
        )
        .unwrap();

        let f = FeatureSet::load(file.path()).unwrap();
        assert_eq!(f.beat_timestamps, vec![0.0, 1.0, 2.0]);
        assert_eq!(f.raw_energy_curve[1], (1.0, 0.3));
        assert_eq!(f.tempo, 60.0);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = FeatureSet::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "malformed_features");
    }
}

pub mod candidates;
pub mod chart;
pub mod density;
pub mod energy;
pub mod error;
pub mod exporter;
pub mod features;
pub mod grid;
pub mod lane_assigner;
pub mod preview;
pub mod profile;
pub mod sanitizer;

use candidates::{detect_sustains, CandidateDeriver};
use chart::Chart;
use density::DensityRegulator;
use energy::EnergyClassifier;
use error::Result;
use features::FeatureSet;
use grid::TierGrids;
use lane_assigner::LaneAssigner;
use preview::{find_preview_start, PreviewConfig};
use profile::{Difficulty, DifficultyProfile};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sanitizer::sanitize;
use std::path::Path;

/// Seed used when the caller does not ask for a fresh one.
pub const DEFAULT_SEED: u64 = 42;

/// Per-request charter configuration
#[derive(Clone, Debug, PartialEq)]
pub struct CharterConfig {
    pub seed: Option<u64>,   // None draws a fresh seed per chart
    pub offset_sec: f64,     // added to every note time, clamped at 0
    pub preview: PreviewConfig,
}

impl Default for CharterConfig {
    fn default() -> Self {
        CharterConfig {
            seed: Some(DEFAULT_SEED),
            offset_sec: 0.0,
            preview: PreviewConfig::default(),
        }
    }
}

/// Turns extracted features into charts
pub struct Charter {
    config: CharterConfig,
}

impl Charter {
    pub fn new(config: CharterConfig) -> Self {
        Charter { config }
    }

    pub fn config(&self) -> &CharterConfig {
        &self.config
    }

    /// Load a feature file and chart it at the requested difficulty
    /// (case-insensitive, unknown names fall back to easy).
    pub fn generate_from_file(&self, features_path: &Path, difficulty: &str) -> Result<Chart> {
        let features = FeatureSet::load(features_path)?;
        self.generate(&features, Difficulty::parse(difficulty))
    }

    /// Generate a single difficulty chart
    pub fn generate(&self, features: &FeatureSet, difficulty: Difficulty) -> Result<Chart> {
        features.validate()?;
        let mut rng = self.rng();
        Ok(self.generate_chart(features, &difficulty.profile(), &mut rng))
    }

    /// Generate charts for every difficulty, each with its own generator
    pub fn generate_all(&self, features: &FeatureSet) -> Result<Vec<Chart>> {
        features.validate()?;
        Ok(Difficulty::ALL
            .iter()
            .map(|difficulty| {
                let mut rng = self.rng();
                self.generate_chart(features, &difficulty.profile(), &mut rng)
            })
            .collect())
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::seed_from_u64(rand::random()),
        }
    }

    fn generate_chart(
        &self,
        features: &FeatureSet,
        profile: &DifficultyProfile,
        rng: &mut ChaCha8Rng,
    ) -> Chart {
        log::info!("Generating {} chart ({:.1}s)", profile.difficulty, features.duration);

        let beats = features.beat_grid();
        let classifier = EnergyClassifier::new(
            features.smoothed_curve(),
            profile.hard_pct,
            profile.very_hard_pct,
        );
        let grids = TierGrids::new(&beats, profile.subdiv_hard, profile.subdiv_very_hard);

        let sustains = detect_sustains(
            &features.raw_curve(),
            profile.long_threshold_pct,
            profile.long_min_sec,
        );
        let candidates = CandidateDeriver::new(profile, &classifier, &grids)
            .derive(&features.onset_timestamps, &sustains);
        let candidates =
            DensityRegulator::new(profile, &classifier, &beats).regulate(candidates, rng);
        let candidates = candidates.with_offset(self.config.offset_sec, profile.long_snap_min_sec);

        let notes = LaneAssigner::new(profile).assign_lanes(&candidates, rng);
        let notes = sanitize(notes);

        let preview_start_sec =
            find_preview_start(classifier.curve(), features.duration, &self.config.preview);

        let chart = Chart {
            difficulty: profile.difficulty,
            tempo: features.tempo,
            duration: features.duration,
            preview_start_sec,
            preview_duration_sec: self.config.preview.window_sec,
            notes,
        };
        log::info!(
            "{} chart: {} notes ({} tap, {} long), preview at {}s",
            chart.difficulty,
            chart.notes.len(),
            chart.tap_count(),
            chart.long_count(),
            chart.preview_start_sec
        );
        chart
    }
}

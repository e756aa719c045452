use crate::energy::EnergyTier;
use serde::Serialize;
use std::fmt;

/// The enumerated set of chart difficulties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Hell,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Hell,
    ];

    /// Case-insensitive lookup. Anything unrecognized falls back to easy.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "normal" => Difficulty::Normal,
            "hard" => Difficulty::Hard,
            "hell" => Difficulty::Hell,
            other => {
                log::warn!("Unknown difficulty '{}', using easy", other);
                Difficulty::Easy
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Hell => "hell",
        }
    }

    pub fn profile(&self) -> DifficultyProfile {
        DifficultyProfile::for_difficulty(*self)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value per energy tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerTier<T> {
    pub easy: T,
    pub hard: T,
    pub very_hard: T,
}

impl<T: Copy> PerTier<T> {
    pub const fn new(easy: T, hard: T, very_hard: T) -> Self {
        PerTier { easy, hard, very_hard }
    }

    pub fn get(&self, tier: EnergyTier) -> T {
        match tier {
            EnergyTier::Easy => self.easy,
            EnergyTier::Hard => self.hard,
            EnergyTier::VeryHard => self.very_hard,
        }
    }
}

/// Probabilistic thinning plus a notes-per-second cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thinning {
    pub keep_probability: f64,
    pub max_notes_per_second: usize,
}

/// Extra taps added on a fine grid inside very-hard sections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Injection {
    pub subdiv: u8,
    pub probability: f64,
}

/// Every tunable of a chart difficulty. Passed by reference through the whole
/// pipeline and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyProfile {
    pub difficulty: Difficulty,
    /// Percentiles of the smoothed curve that start the hard / very-hard tiers
    pub hard_pct: f64,
    pub very_hard_pct: f64,
    pub subdiv_hard: u8,
    pub subdiv_very_hard: u8,
    pub min_gap: PerTier<f64>,
    pub chord_probability: PerTier<f64>,
    pub chord_min_distance: u8,
    /// Percentile of the raw curve a sustain must reach
    pub long_threshold_pct: f64,
    pub long_min_sec: f64,
    pub long_snap_min_sec: f64,
    pub jump_strength: PerTier<f64>,
    /// Snap every onset to the base beat grid regardless of energy
    pub snap_to_beats_only: bool,
    pub thinning: Option<Thinning>,
    pub injection: Option<Injection>,
}

impl DifficultyProfile {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyProfile {
                difficulty,
                hard_pct: 87.0,
                very_hard_pct: 93.0,
                subdiv_hard: 1,
                subdiv_very_hard: 1,
                min_gap: PerTier::new(0.10, 0.092, 0.084),
                chord_probability: PerTier::new(0.0, 0.0, 0.0),
                chord_min_distance: 2,
                long_threshold_pct: 45.0,
                long_min_sec: 0.7,
                long_snap_min_sec: 0.35,
                jump_strength: PerTier::new(0.15, 0.25, 0.28),
                snap_to_beats_only: true,
                thinning: Some(Thinning {
                    keep_probability: 0.70,
                    max_notes_per_second: 3,
                }),
                injection: None,
            },
            Difficulty::Normal => DifficultyProfile {
                difficulty,
                hard_pct: 70.0,
                very_hard_pct: 81.0,
                subdiv_hard: 2,
                subdiv_very_hard: 2,
                min_gap: PerTier::new(0.09, 0.08, 0.075),
                chord_probability: PerTier::new(0.015, 0.025, 0.033),
                chord_min_distance: 2,
                long_threshold_pct: 53.0,
                long_min_sec: 0.45,
                long_snap_min_sec: 0.35,
                jump_strength: PerTier::new(0.25, 0.35, 0.38),
                snap_to_beats_only: false,
                thinning: None,
                injection: None,
            },
            Difficulty::Hard => DifficultyProfile {
                difficulty,
                hard_pct: 60.0,
                very_hard_pct: 70.0,
                subdiv_hard: 2,
                subdiv_very_hard: 2,
                min_gap: PerTier::new(0.072, 0.062, 0.060),
                chord_probability: PerTier::new(0.019, 0.037, 0.045),
                chord_min_distance: 3,
                long_threshold_pct: 55.0,
                long_min_sec: 0.388,
                long_snap_min_sec: 0.35,
                jump_strength: PerTier::new(0.30, 0.51, 0.59),
                snap_to_beats_only: false,
                thinning: None,
                injection: Some(Injection {
                    subdiv: 2,
                    probability: 0.25,
                }),
            },
            Difficulty::Hell => DifficultyProfile {
                difficulty,
                hard_pct: 52.0,
                very_hard_pct: 62.0,
                subdiv_hard: 2,
                subdiv_very_hard: 4,
                min_gap: PerTier::new(0.065, 0.055, 0.050),
                chord_probability: PerTier::new(0.025, 0.050, 0.065),
                chord_min_distance: 3,
                long_threshold_pct: 58.0,
                long_min_sec: 0.35,
                long_snap_min_sec: 0.30,
                jump_strength: PerTier::new(0.35, 0.60, 0.68),
                snap_to_beats_only: false,
                thinning: None,
                injection: Some(Injection {
                    subdiv: 4,
                    probability: 0.35,
                }),
            },
        }
    }

    /// Snap grid tier for an onset at a given energy tier.
    pub fn snap_tier(&self, tier: EnergyTier) -> EnergyTier {
        if self.snap_to_beats_only {
            EnergyTier::Easy
        } else {
            tier
        }
    }
}

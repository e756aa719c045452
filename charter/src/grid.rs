use crate::energy::EnergyTier;

/// Subdivisions a profile may request per beat.
pub const VALID_SUBDIVISIONS: [u8; 4] = [1, 2, 4, 6];

/// Split every beat interval into `subdiv` equal steps.
///
/// The result contains every original beat. A grid with fewer than two beats
/// has no intervals to split and is returned unchanged.
pub fn make_subgrid(beats: &[f64], subdiv: u8) -> Vec<f64> {
    if beats.len() < 2 || subdiv <= 1 {
        return beats.to_vec();
    }

    let steps = subdiv as usize;
    let mut grid = Vec::with_capacity((beats.len() - 1) * steps + 1);
    for pair in beats.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        for k in 0..steps {
            grid.push(a + (b - a) * (k as f64 / subdiv as f64));
        }
    }
    if let Some(&last) = beats.last() {
        grid.push(last);
    }
    grid
}

/// Snap a time to the nearest grid point. Ties go to the earlier point and an
/// empty grid leaves the time untouched.
pub fn snap_to_grid(time: f64, grid: &[f64]) -> f64 {
    if grid.is_empty() {
        return time;
    }

    let idx = grid.partition_point(|&g| g < time);
    let after = grid.get(idx).copied();
    let before = idx.checked_sub(1).map(|i| grid[i]);

    match (before, after) {
        (Some(b), Some(a)) => {
            if (time - b).abs() <= (a - time).abs() {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => time,
    }
}

/// The three snap grids of one difficulty profile.
#[derive(Clone, Debug)]
pub struct TierGrids {
    pub beats: Vec<f64>,
    pub hard: Vec<f64>,
    pub very_hard: Vec<f64>,
}

impl TierGrids {
    pub fn new(beats: &[f64], subdiv_hard: u8, subdiv_very_hard: u8) -> Self {
        TierGrids {
            beats: beats.to_vec(),
            hard: make_subgrid(beats, subdiv_hard),
            very_hard: make_subgrid(beats, subdiv_very_hard),
        }
    }

    pub fn for_tier(&self, tier: EnergyTier) -> &[f64] {
        match tier {
            EnergyTier::Easy => &self.beats,
            EnergyTier::Hard => &self.hard,
            EnergyTier::VeryHard => &self.very_hard,
        }
    }
}

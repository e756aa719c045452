use crate::energy::EnergyCurve;

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewConfig {
    /// Seconds at the start of the song never used for the preview
    pub intro_skip_sec: f64,
    /// Seconds at the end of the song never used for the preview
    pub outro_skip_sec: f64,
    pub window_sec: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            intro_skip_sec: 10.0,
            outro_skip_sec: 10.0,
            window_sec: 10.0,
        }
    }
}

/// Start of the loudest `window_sec` stretch of the song, rounded to the
/// nearest half second. Returns 0 when no window fits between the margins.
pub fn find_preview_start(curve: &EnergyCurve, duration: f64, config: &PreviewConfig) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let earliest = config.intro_skip_sec;
    let latest = duration - config.outro_skip_sec - config.window_sec;
    if latest < earliest {
        log::debug!(
            "No preview window fits in {:.1}s with {}s/{}s margins",
            duration,
            config.intro_skip_sec,
            config.outro_skip_sec
        );
        return 0.0;
    }

    let width = match curve.hop() {
        Some(hop) => ((config.window_sec / hop).round() as usize).clamp(1, curve.len()),
        None => 1,
    };

    let mut prefix = Vec::with_capacity(curve.len() + 1);
    prefix.push(0.0);
    for &v in &curve.values {
        prefix.push(prefix[prefix.len() - 1] + v);
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, &t) in curve.times.iter().enumerate() {
        if t < earliest || t > latest {
            continue;
        }
        let end = i.saturating_add(width).min(curve.len());
        let sum = prefix[end] - prefix[i];
        if best.map_or(true, |(_, best_sum)| sum > best_sum) {
            best = Some((i, sum));
        }
    }

    match best {
        Some((i, _)) => (curve.times[i] * 2.0).round() / 2.0,
        None => 0.0,
    }
}

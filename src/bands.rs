//! Frequency band math shared by the equalizer and the visualizer:
//! logarithmic band edges, dB/linear conversions and gain interpolation.

/// Center frequencies of the ten equalizer bands, in Hz.
pub const EQ_BAND_HZ: [f32; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Audible range used for visualization band edges.
pub const VIZ_MIN_HZ: f32 = 20.0;
pub const VIZ_MAX_HZ: f32 = 20_000.0;

/// Floor added before taking a logarithm of a magnitude.
pub const DB_EPSILON: f32 = 1e-10;

pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Magnitude to dB with the epsilon floor, so a zero magnitude stays finite.
pub fn magnitude_db(value: f32) -> f32 {
    20.0 * (value + DB_EPSILON).log10()
}

/// `count` half-open `[low, high)` intervals, logarithmically spaced
/// between `min_hz` and `max_hz`.
pub fn log_spaced_edges(min_hz: f32, max_hz: f32, count: usize) -> Vec<(f32, f32)> {
    if count == 0 {
        return Vec::new();
    }
    let lo = min_hz.max(1.0).log10();
    let hi = max_hz.max(min_hz).log10();
    let step = (hi - lo) / count as f32;
    (0..count)
        .map(|i| {
            let a = 10.0_f32.powf(lo + step * i as f32);
            let b = 10.0_f32.powf(lo + step * (i + 1) as f32);
            (a, b)
        })
        .collect()
}

/// Linear interpolation of a dB gain table over center frequencies.
///
/// Frequencies below the first or above the last center clamp to that
/// band's gain; there is no extrapolation beyond the table.
pub fn interp_gain_db(freq: f32, centers: &[f32], gains_db: &[f32]) -> f32 {
    debug_assert_eq!(centers.len(), gains_db.len());
    let n = centers.len();
    if n == 0 {
        return 0.0;
    }
    if freq <= centers[0] {
        return gains_db[0];
    }
    if freq >= centers[n - 1] {
        return gains_db[n - 1];
    }
    // centers are sorted ascending; find the surrounding pair
    let mut hi = 1;
    while centers[hi] < freq {
        hi += 1;
    }
    let lo = hi - 1;
    let span = centers[hi] - centers[lo];
    if span <= 0.0 {
        return gains_db[lo];
    }
    let t = (freq - centers[lo]) / span;
    gains_db[lo] + (gains_db[hi] - gains_db[lo]) * t
}

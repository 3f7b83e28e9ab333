use crate::bands::{self, VIZ_MAX_HZ, VIZ_MIN_HZ};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::collections::VecDeque;

/// Frames of mono history kept for temporal smoothing.
const HISTORY_LEN: usize = 10;

/// Assumed dynamic range for normalization: -60 dB maps to 0.0,
/// 0 dB maps to 1.0.
const DB_FLOOR: f32 = -60.0;

pub const SENSITIVITY_MIN: f32 = 0.1;
pub const SENSITIVITY_MAX: f32 = 100.0;

/// One visualization result: per-channel normalized band magnitudes
/// in [0, 1], plus the sample rate they were computed against. The
/// mono vector is temporally smoothed over the history window.
#[derive(Debug, Clone, PartialEq)]
pub struct VizFrame {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub mono: Vec<f32>,
    pub sample_rate: u32,
}

impl VizFrame {
    fn silent(bars: usize, sample_rate: u32) -> Self {
        Self {
            left: vec![0.0; bars],
            right: vec![0.0; bars],
            mono: vec![0.0; bars],
            sample_rate,
        }
    }
}

/// Spectrum visualizer: log-spaced bands over 20 Hz..20 kHz, per-band
/// RMS magnitude mapped through dB normalization, adjacent-band and
/// temporal smoothing.
pub struct VisualizerEngine {
    bars: usize,
    sample_rate: u32,
    edges: Vec<(f32, f32)>,
    history: VecDeque<Vec<f32>>,
    sensitivity: f32,
    planner: FftPlanner<f32>,
    scratch: Vec<Complex<f32>>,
    mags: Vec<f32>,
}

impl VisualizerEngine {
    pub fn new(bars: usize, sample_rate: u32) -> Self {
        Self {
            bars,
            sample_rate,
            edges: bands::log_spaced_edges(VIZ_MIN_HZ, VIZ_MAX_HZ, bars),
            history: VecDeque::with_capacity(HISTORY_LEN),
            sensitivity: 1.0,
            planner: FftPlanner::new(),
            scratch: Vec::new(),
            mags: Vec::new(),
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Nudge the input scale; clamped to [0.1, 100.0].
    pub fn set_sensitivity(&mut self, delta: f32) {
        self.sensitivity = (self.sensitivity + delta).clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
    }

    pub fn reset_sensitivity(&mut self) {
        self.sensitivity = 1.0;
    }

    /// Reinstate a persisted sensitivity value.
    pub fn restore_sensitivity(&mut self, value: f32) {
        self.sensitivity = value.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
    }

    /// Clears the temporal history only; band configuration stays.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Process an interleaved chunk. Empty input returns an all-zero
    /// frame without touching the history. A channel count of 0 or 1
    /// is treated as mono; counts above 2 use the first two channels.
    pub fn process(
        &mut self,
        samples: &[f32],
        channels: usize,
        sample_rate: Option<u32>,
    ) -> VizFrame {
        if let Some(sr) = sample_rate {
            if sr > 0 {
                self.sample_rate = sr;
            }
        }
        if samples.is_empty() {
            return VizFrame::silent(self.bars, self.sample_rate);
        }

        let channels = channels.max(1);
        let frames = samples.len() / channels;
        if frames == 0 {
            return VizFrame::silent(self.bars, self.sample_rate);
        }

        let sens = self.sensitivity;
        let (left, right): (Vec<f32>, Option<Vec<f32>>) = if channels == 1 {
            (samples.iter().map(|s| s * sens).collect(), None)
        } else {
            let mut l = Vec::with_capacity(frames);
            let mut r = Vec::with_capacity(frames);
            for frame in samples.chunks_exact(channels) {
                l.push(frame[0] * sens);
                r.push(frame[1] * sens);
            }
            (l, Some(r))
        };

        let left_bars = self.channel_bands(&left);
        let right_bars = match &right {
            Some(r) => self.channel_bands(r),
            None => left_bars.clone(),
        };

        let mono: Vec<f32> = left_bars
            .iter()
            .zip(&right_bars)
            .map(|(l, r)| (l + r) * 0.5)
            .collect();

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(mono);

        // Temporal smoothing: arithmetic mean over the history window.
        let mut smoothed = vec![0.0f32; self.bars];
        for past in &self.history {
            for (acc, v) in smoothed.iter_mut().zip(past) {
                *acc += v;
            }
        }
        let inv = 1.0 / self.history.len() as f32;
        for v in &mut smoothed {
            *v *= inv;
        }

        VizFrame {
            left: left_bars,
            right: right_bars,
            mono: smoothed,
            sample_rate: self.sample_rate,
        }
    }

    /// Band magnitudes for one channel: FFT magnitude spectrum, RMS
    /// per band, dB normalization to [0, 1], then a [0.2, 0.6, 0.2]
    /// kernel across adjacent bands with edge replication.
    fn channel_bands(&mut self, chan: &[f32]) -> Vec<f32> {
        let n = chan.len();
        let fft = self.planner.plan_fft_forward(n);
        self.scratch.clear();
        self.scratch
            .extend(chan.iter().map(|&s| Complex { re: s, im: 0.0 }));
        fft.process(&mut self.scratch);

        let half = n / 2 + 1;
        self.mags.clear();
        self.mags.extend(
            self.scratch
                .iter()
                .take(half)
                .map(|c| (c.re * c.re + c.im * c.im).sqrt()),
        );

        let bin_hz = self.sample_rate as f32 / n as f32;
        let mut out = vec![0.0f32; self.bars];
        for (i, &(low, high)) in self.edges.iter().enumerate() {
            let mut acc = 0.0f32;
            let mut count = 0u32;
            for (k, &m) in self.mags.iter().enumerate() {
                let f = k as f32 * bin_hz;
                if f >= low && f < high {
                    acc += m * m;
                    count += 1;
                }
            }
            // Band value is the RMS of its bins, or 0 with no bins in range.
            let rms = if count > 0 {
                (acc / count as f32).sqrt()
            } else {
                0.0
            };
            let db = bands::magnitude_db(rms);
            out[i] = ((db - DB_FLOOR) / -DB_FLOOR).clamp(0.0, 1.0);
        }

        smooth_adjacent(&out)
    }
}

fn smooth_adjacent(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let prev = values[i.saturating_sub(1)];
            let next = values[(i + 1).min(n.saturating_sub(1))];
            0.2 * prev + 0.6 * values[i] + 0.2 * next
        })
        .collect()
}

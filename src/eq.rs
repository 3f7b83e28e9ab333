use crate::bands::{self, EQ_BAND_HZ};
use arc_swap::ArcSwap;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::sync::Arc;

pub const BAND_COUNT: usize = 10;
pub const GAIN_DB_MIN: f32 = -12.0;
pub const GAIN_DB_MAX: f32 = 12.0;

/// Name under which a hand-edited gain vector is stored.
pub const CUSTOM_PRESET: &str = "custom";

/// Immutable equalizer state published to the realtime callback.
/// Replaced wholesale on every control-side edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqSnapshot {
    pub enabled: bool,
    pub gains_db: [f32; BAND_COUNT],
}

impl EqSnapshot {
    pub fn flat() -> Self {
        Self {
            enabled: true,
            gains_db: [0.0; BAND_COUNT],
        }
    }
}

/// FFT transform state for equalization: planner plus reusable
/// scratch, so repeated calls at the device block size do not allocate
/// after the first pass. Owned by whichever thread runs the transform.
pub struct EqProcessor {
    planner: FftPlanner<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Default for EqProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EqProcessor {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            scratch: Vec::new(),
        }
    }

    /// Apply the gain table to an interleaved chunk in place, each
    /// channel independently: forward FFT, per-bin linear gain
    /// interpolated from the band table, inverse FFT back to the
    /// original length. Pure with respect to everything but `samples`.
    pub fn process(
        &mut self,
        samples: &mut [f32],
        channels: usize,
        sample_rate: u32,
        gains_db: &[f32; BAND_COUNT],
    ) {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        if frames == 0 || sample_rate == 0 {
            return;
        }

        let forward = self.planner.plan_fft_forward(frames);
        let inverse = self.planner.plan_fft_inverse(frames);
        self.scratch.resize(frames, Complex { re: 0.0, im: 0.0 });
        let norm = 1.0 / frames as f32;
        let bin_hz = sample_rate as f32 / frames as f32;

        for ch in 0..channels {
            for i in 0..frames {
                self.scratch[i] = Complex {
                    re: samples[i * channels + ch],
                    im: 0.0,
                };
            }
            forward.process(&mut self.scratch);

            // Real input: scale bin k and its conjugate mirror with the
            // same gain so the inverse transform stays real.
            let half = frames / 2;
            for k in 0..=half {
                let freq = k as f32 * bin_hz;
                let gain =
                    bands::db_to_linear(bands::interp_gain_db(freq, &EQ_BAND_HZ, gains_db));
                self.scratch[k] *= gain;
                let mirror = frames - k;
                if k != 0 && mirror != k && mirror < frames {
                    self.scratch[mirror] *= gain;
                }
            }

            inverse.process(&mut self.scratch);
            for i in 0..frames {
                samples[i * channels + ch] = self.scratch[i].re * norm;
            }
        }
    }
}

/// Control-side equalizer: named presets over ten fixed bands, a
/// synthesized "custom" preset for manual edits, and an enabled flag.
/// Every mutation republishes an [`EqSnapshot`] for the audio thread.
pub struct EqualizerEngine {
    presets: Vec<(String, [f32; BAND_COUNT])>,
    active: usize,
    enabled: bool,
    shared: Arc<ArcSwap<EqSnapshot>>,
    processor: EqProcessor,
}

impl Default for EqualizerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EqualizerEngine {
    pub fn new() -> Self {
        let presets: Vec<(String, [f32; BAND_COUNT])> = builtin_presets()
            .iter()
            .map(|(name, gains)| (name.to_string(), *gains))
            .collect();
        let engine = Self {
            presets,
            active: 0,
            enabled: true,
            shared: Arc::new(ArcSwap::from_pointee(EqSnapshot::flat())),
            processor: EqProcessor::new(),
        };
        engine.publish();
        engine
    }

    /// Handle for the realtime callback; always holds the latest
    /// consistent snapshot.
    pub fn shared(&self) -> Arc<ArcSwap<EqSnapshot>> {
        Arc::clone(&self.shared)
    }

    pub fn get_preset_names(&self) -> Vec<&str> {
        self.presets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn current_preset(&self) -> &str {
        &self.presets[self.active].0
    }

    pub fn get_current_bands(&self) -> [f32; BAND_COUNT] {
        self.presets[self.active].1
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.publish();
        self.enabled
    }

    /// Activate a preset by name. Unknown names leave the state
    /// unchanged and return false.
    pub fn set_preset(&mut self, name: &str) -> bool {
        match self.presets.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                self.active = idx;
                self.publish();
                true
            }
            None => false,
        }
    }

    /// Edit one band. Clones the active gains into the "custom"
    /// preset (creating or overwriting it), clamps the new gain, and
    /// activates "custom". Out-of-range indices are a no-op, so the
    /// built-in presets are never mutated.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        if index >= BAND_COUNT {
            return;
        }
        let mut gains = self.get_current_bands();
        gains[index] = gain_db.clamp(GAIN_DB_MIN, GAIN_DB_MAX);

        match self
            .presets
            .iter()
            .position(|(n, _)| n == CUSTOM_PRESET)
        {
            Some(idx) => {
                self.presets[idx].1 = gains;
                self.active = idx;
            }
            None => {
                self.presets.push((CUSTOM_PRESET.to_string(), gains));
                self.active = self.presets.len() - 1;
            }
        }
        self.publish();
    }

    /// Reinstate persisted settings: custom gains (if any), then the
    /// active preset, then the enabled flag.
    pub fn restore(&mut self, preset: &str, custom_gains: Option<[f32; BAND_COUNT]>, enabled: bool) {
        if let Some(gains) = custom_gains {
            let clamped = gains.map(|g| g.clamp(GAIN_DB_MIN, GAIN_DB_MAX));
            match self.presets.iter().position(|(n, _)| n == CUSTOM_PRESET) {
                Some(idx) => self.presets[idx].1 = clamped,
                None => self.presets.push((CUSTOM_PRESET.to_string(), clamped)),
            }
        }
        if !self.set_preset(preset) {
            self.set_preset("flat");
        }
        self.enabled = enabled;
        self.publish();
    }

    /// Control-side processing with the engine's own transform state;
    /// returns the input unchanged when disabled or empty.
    pub fn process(&mut self, samples: &mut [f32], channels: usize, sample_rate: u32) {
        if !self.enabled || samples.is_empty() {
            return;
        }
        let gains = self.get_current_bands();
        self.processor
            .process(samples, channels, sample_rate, &gains);
    }

    fn publish(&self) {
        self.shared.store(Arc::new(EqSnapshot {
            enabled: self.enabled,
            gains_db: self.get_current_bands(),
        }));
    }
}

fn builtin_presets() -> &'static [(&'static str, [f32; BAND_COUNT])] {
    &[
        ("flat", [0.0; BAND_COUNT]),
        (
            "pop",
            [3.0, 2.0, 0.5, 1.0, 2.5, 3.5, 3.0, 2.0, 1.0, 0.5],
        ),
        (
            "rock",
            [5.0, 3.5, 2.5, 1.0, 0.5, 0.0, 0.5, 2.0, 3.0, 4.0],
        ),
        (
            "jazz",
            [1.0, 2.0, 2.5, 3.0, 2.5, 2.0, 1.0, 0.5, 0.0, 0.0],
        ),
        (
            "classical",
            [0.5, 1.0, 2.0, 2.5, 3.0, 3.0, 2.5, 2.0, 1.0, 0.5],
        ),
        (
            "bass_boost",
            [6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        (
            "treble_boost",
            [0.0, 0.0, 0.0, 0.0, 1.0, 2.5, 3.5, 5.0, 6.0, 6.0],
        ),
        (
            "vocal_boost",
            [0.0, 0.0, 0.0, 3.0, 4.0, 6.0, 4.0, 3.0, 0.0, 0.0],
        ),
    ]
}

use std::path::PathBuf;
use thiserror::Error;

/// Native encoding of the source samples. Only used to pick the
/// divisor that maps native amplitude to the [-1, 1] float range the
/// output device expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    I16,
    I32,
    F32,
}

impl SampleEncoding {
    /// `2^(bits-1)` for integer encodings, pass-through for float.
    pub fn divisor(self) -> f32 {
        match self {
            Self::I16 => 32768.0,
            Self::I32 => 2_147_483_648.0,
            Self::F32 => 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("buffer has zero channels")]
    ZeroChannels,
    #[error("buffer has {0} channels; only mono and stereo are supported")]
    TooManyChannels(usize),
    #[error("buffer has zero sample rate")]
    ZeroSampleRate,
    #[error("sample count {samples} is not a whole number of {channels}-channel frames")]
    RaggedFrames { samples: usize, channels: usize },
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unrecognized audio format: {0}")]
    Probe(String),
    #[error("file contains no decodable audio track")]
    NoAudioTrack,
    #[error("audio track does not declare a sample rate")]
    UnknownSampleRate,
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Decoded audio, immutable after construction. Samples are stored
/// interleaved as f32 at native amplitude (an i16 source keeps its
/// +-32768 scale); `encoding` selects the normalization divisor at
/// playback time.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    encoding: SampleEncoding,
}

impl PcmBuffer {
    pub fn new(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
        encoding: SampleEncoding,
    ) -> Result<Self, LoadError> {
        if channels == 0 {
            return Err(LoadError::ZeroChannels);
        }
        if channels > 2 {
            return Err(LoadError::TooManyChannels(channels));
        }
        if sample_rate == 0 {
            return Err(LoadError::ZeroSampleRate);
        }
        if samples.len() % channels != 0 {
            return Err(LoadError::RaggedFrames {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
            encoding,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Interleaved slice for frames `[start, end)`. Caller guarantees
    /// the range is within `frame_count`.
    pub fn frames(&self, start: usize, end: usize) -> &[f32] {
        &self.samples[start * self.channels..end * self.channels]
    }
}

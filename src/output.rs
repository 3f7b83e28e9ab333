use crate::eq::EqProcessor;
use crate::player::PlayerShared;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use ringbuf::traits::{Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;

/// Capacity of the callback-to-control visualization ring, in
/// interleaved samples. Roughly a third of a second of stereo audio
/// at 44.1 kHz; the control loop drains it every tick.
const VIZ_RING_SAMPLES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no default output device")]
    NoOutputDevice,
    #[error("no default input device")]
    NoInputDevice,
    #[error("no input device matching \"{0}\"")]
    NoMatchingInput(String),
    #[error("cannot query device configurations: {0}")]
    Configs(String),
    #[error("output device does not support {channels} channel(s) at {sample_rate} Hz")]
    NoMatchingConfig { channels: usize, sample_rate: u32 },
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("failed to build stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start stream: {0}")]
    Start(#[from] cpal::PlayStreamError),
}

/// A running output stream pulling from a [`PlayerShared`]. Dropping
/// it tears the device stream down.
pub struct OutputStream {
    _stream: cpal::Stream,
    /// Channel layout the device actually negotiated.
    pub channels: usize,
}

impl OutputStream {
    /// Open the default output device at the track's sample rate and
    /// channel count (stereo fallback for mono tracks) and start
    /// pulling. Returns the consumer side of the visualization ring;
    /// the producer side lives inside the callback.
    pub fn start(
        shared: Arc<PlayerShared>,
        src_channels: usize,
        sample_rate: u32,
    ) -> Result<(Self, HeapCons<f32>), DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoOutputDevice)?;

        let (config, sample_format) = select_output_config(&device, src_channels, sample_rate)?;
        let out_channels = config.channels as usize;

        let ring = HeapRb::<f32>::new(VIZ_RING_SAMPLES);
        let (prod, cons) = ring.split();

        let stream = match sample_format {
            SampleFormat::F32 => build_output::<f32>(&device, &config, shared, prod)?,
            SampleFormat::I16 => build_output::<i16>(&device, &config, shared, prod)?,
            SampleFormat::U16 => build_output::<u16>(&device, &config, shared, prod)?,
            fmt => return Err(DeviceError::UnsupportedFormat(fmt)),
        };
        stream.play()?;

        Ok((
            Self {
                _stream: stream,
                channels: out_channels,
            },
            cons,
        ))
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<PlayerShared>,
    mut prod: HeapProd<f32>,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample + FromSample<f32>,
{
    let out_channels = config.channels as usize;
    // Callback-owned working set; grows once to the device block size
    // and is reused on every pull thereafter.
    let mut eq = EqProcessor::new();
    let mut scratch: Vec<f32> = Vec::with_capacity(8192);
    let mut block: Vec<f32> = Vec::with_capacity(8192);

    let err_fn = |err| log::warn!("output stream error: {err}");
    let stream = device.build_output_stream(
        config,
        move |out: &mut [T], _| {
            block.resize(out.len(), 0.0);
            shared.fill(&mut block, out_channels, &mut eq, Some(&mut prod), &mut scratch);
            for (dst, src) in out.iter_mut().zip(&block) {
                *dst = T::from_sample(*src);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Prefer an exact channel/rate match in f32, then any format at the
/// right rate, then a stereo fallback for mono sources.
fn select_output_config(
    device: &cpal::Device,
    src_channels: usize,
    sample_rate: u32,
) -> Result<(StreamConfig, SampleFormat), DeviceError> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| DeviceError::Configs(e.to_string()))?
        .collect::<Vec<_>>();

    let mut best: Option<(StreamConfig, SampleFormat, u32)> = None;
    for range in &ranges {
        let channels = range.channels() as usize;
        let rate_ok =
            sample_rate >= range.min_sample_rate().0 && sample_rate <= range.max_sample_rate().0;
        if !rate_ok {
            continue;
        }
        // Rank: exact channel match beats stereo fallback beats anything
        // else; f32 beats integer formats at the same rank.
        let mut score = match channels {
            c if c == src_channels => 4,
            2 => 2,
            _ => 1,
        };
        if range.sample_format() == SampleFormat::F32 {
            score += 1;
        }
        if best.as_ref().is_none_or(|(_, _, s)| score > *s) {
            best = Some((
                StreamConfig {
                    channels: range.channels(),
                    sample_rate: SampleRate(sample_rate),
                    buffer_size: BufferSize::Default,
                },
                range.sample_format(),
                score,
            ));
        }
    }

    best.map(|(config, fmt, _)| (config, fmt))
        .ok_or(DeviceError::NoMatchingConfig {
            channels: src_channels,
            sample_rate,
        })
}

/// A running capture stream for system-audio visualization. Frames
/// are pushed interleaved (at most two channels) into its ring; a
/// full ring drops the incoming data rather than blocking the device
/// callback.
pub struct CaptureStream {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub channels: usize,
    pub device_name: String,
}

impl CaptureStream {
    pub fn start(device_query: Option<&str>) -> Result<(Self, HeapCons<f32>), DeviceError> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let supported = device
            .default_input_config()
            .map_err(|e| DeviceError::Configs(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let src_channels = supported.channels() as usize;
        let channels = src_channels.min(2).max(1);
        let config: StreamConfig = supported.clone().into();

        let ring = HeapRb::<f32>::new((sample_rate as usize).saturating_mul(2 * channels));
        let (mut prod, cons) = ring.split();

        let err_fn = |err| log::warn!("capture stream error: {err}");
        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_capture(data, src_channels, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_capture(data, src_channels, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_capture(data, src_channels, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(DeviceError::UnsupportedFormat(fmt)),
        };
        stream.play()?;

        Ok((
            Self {
                _stream: stream,
                sample_rate,
                channels,
                device_name,
            },
            cons,
        ))
    }
}

/// Interleave the first `keep_channels` of every frame into the ring.
/// Frames land whole or not at all: a partial push would shift the
/// channel pairing of everything drained after it.
pub fn push_capture<T: Sample<Float = f32> + Copy>(
    data: &[T],
    src_channels: usize,
    keep_channels: usize,
    prod: &mut HeapProd<f32>,
) {
    let src_channels = src_channels.max(1);
    for frame in data.chunks_exact(src_channels) {
        if prod.vacant_len() < keep_channels {
            break;
        }
        for s in frame.iter().take(keep_channels) {
            let _ = prod.try_push((*s).to_float_sample());
        }
    }
}

pub fn input_device_names() -> Result<Vec<String>, DeviceError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| DeviceError::Configs(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// `--list-devices`: print playback and capture devices.
pub fn list_devices() -> Result<(), DeviceError> {
    let host = cpal::default_host();
    let mut out = io::stdout();

    let _ = writeln!(out, "Output devices:");
    if let Ok(devices) = host.output_devices() {
        for dev in devices {
            let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
            let _ = writeln!(out, "  - {name}");
        }
    }

    let _ = writeln!(out, "Input devices:");
    for name in input_device_names()? {
        let _ = writeln!(out, "  - {name}");
    }
    Ok(())
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> Result<cpal::Device, DeviceError> {
    let devices = host
        .input_devices()
        .map_err(|e| DeviceError::Configs(e.to_string()))?
        .collect::<Vec<_>>();

    if let Some(want) = device_query.map(|s| s.to_lowercase()) {
        return devices
            .into_iter()
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&want))
                    .unwrap_or(false)
            })
            .ok_or(DeviceError::NoMatchingInput(want));
    }

    host.default_input_device()
        .ok_or(DeviceError::NoInputDevice)
}

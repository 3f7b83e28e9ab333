use crate::pcm::{LoadError, PcmBuffer, SampleEncoding};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file into an interleaved f32 [`PcmBuffer`].
///
/// Mono and stereo sources keep their layout; wider sources fold to
/// stereo by averaging the extra channels into the first two.
pub fn decode_file(path: &Path) -> Result<PcmBuffer, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(LoadError::NoAudioTrack)?;

    let track_id = track.id;
    let src_channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(LoadError::UnknownSampleRate)?;
    let out_channels = src_channels.min(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Malformed packets are skipped, not fatal.
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let interleaved = sample_buf.samples();

        if src_channels <= 2 {
            samples.extend_from_slice(interleaved);
        } else {
            for frame in interleaved.chunks(src_channels) {
                samples.push(fold_channel(frame, 0));
                samples.push(fold_channel(frame, 1));
            }
        }
    }

    log::info!(
        "decoded {}: {} frames, {} ch, {} Hz ({:.1}s)",
        path.display(),
        samples.len() / out_channels.max(1),
        out_channels,
        sample_rate,
        samples.len() as f32 / (out_channels.max(1) as f32 * sample_rate as f32),
    );

    PcmBuffer::new(samples, out_channels, sample_rate, SampleEncoding::F32)
}

/// Fold a >2-channel frame onto output channel `side` (0 = left,
/// 1 = right): the matching front channel plus an equal share of the
/// remaining channels.
fn fold_channel(frame: &[f32], side: usize) -> f32 {
    let front = frame[side];
    let extra = &frame[2..];
    if extra.is_empty() {
        return front;
    }
    let spill: f32 = extra.iter().sum::<f32>() / extra.len() as f32;
    (front + spill) * 0.5
}

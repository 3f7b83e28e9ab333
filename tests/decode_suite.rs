use std::path::PathBuf;
use tui_player::decode::decode_file;
use tui_player::pcm::{LoadError, SampleEncoding};

/// Minimal 16-bit PCM WAV writer. Mono and stereo use the plain PCM
/// fmt chunk; wider layouts need WAVE_FORMAT_EXTENSIBLE with a
/// channel mask.
fn wav_bytes(channels: u16, sample_rate: u32, interleaved: &[i16]) -> Vec<u8> {
    let block_align = channels * 2;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = (interleaved.len() * 2) as u32;
    let extensible = channels > 2;
    let fmt_len: u32 = if extensible { 40 } else { 16 };

    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(4 + 8 + fmt_len + 8 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&fmt_len.to_le_bytes());
    let format_tag: u16 = if extensible { 0xFFFE } else { 0x0001 };
    out.extend_from_slice(&format_tag.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    if extensible {
        out.extend_from_slice(&22u16.to_le_bytes()); // cbSize
        out.extend_from_slice(&16u16.to_le_bytes()); // valid bits
        // FL | FR | BL | BR
        out.extend_from_slice(&0x0000_0033u32.to_le_bytes());
        // KSDATAFORMAT_SUBTYPE_PCM
        out.extend_from_slice(&[
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38,
            0x9B, 0x71,
        ]);
    }

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in interleaved {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tui_player_{}_{name}", std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn decodes_a_mono_wav() {
    let samples: Vec<i16> = vec![0, 8_192, -8_192, 16_384, -16_384, 32_767];
    let path = temp_file("mono.wav", &wav_bytes(1, 44_100, &samples));
    let pcm = decode_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(pcm.channels(), 1);
    assert_eq!(pcm.sample_rate(), 44_100);
    assert_eq!(pcm.frame_count(), samples.len());
    assert_eq!(pcm.encoding(), SampleEncoding::F32);
    for (got, want) in pcm.samples().iter().zip(&samples) {
        assert!((got - f32::from(*want) / 32_768.0).abs() < 1e-4);
    }
}

#[test]
fn stereo_keeps_its_layout() {
    // Distinct channels so an interleave slip would show.
    let samples: Vec<i16> = vec![8_192, -8_192, 16_384, -16_384];
    let path = temp_file("stereo.wav", &wav_bytes(2, 48_000, &samples));
    let pcm = decode_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(pcm.channels(), 2);
    assert_eq!(pcm.sample_rate(), 48_000);
    assert_eq!(pcm.frame_count(), 2);
    assert!((pcm.samples()[0] - 0.25).abs() < 1e-4);
    assert!((pcm.samples()[1] + 0.25).abs() < 1e-4);
    assert!((pcm.samples()[2] - 0.5).abs() < 1e-4);
    assert!((pcm.samples()[3] + 0.5).abs() < 1e-4);
}

#[test]
fn quad_source_folds_to_stereo() {
    // One frame: FL 0.5, FR -0.5, rears both 0.25. Each side becomes
    // the mean of the front channel and the rear average.
    let samples: Vec<i16> = vec![16_384, -16_384, 8_192, 8_192];
    let path = temp_file("quad.wav", &wav_bytes(4, 44_100, &samples));
    let pcm = decode_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(pcm.channels(), 2);
    assert_eq!(pcm.frame_count(), 1);
    assert!((pcm.samples()[0] - 0.375).abs() < 1e-4);
    assert!((pcm.samples()[1] + 0.125).abs() < 1e-4);
}

#[test]
fn truncated_data_yields_the_frames_present() {
    // The data chunk declares more audio than the file holds. Hitting
    // end of file mid-stream terminates the decode with the complete
    // packets already read, it does not fail it.
    let samples = vec![0i16; 100_000]; // 50k stereo frames
    let mut bytes = wav_bytes(2, 44_100, &samples);
    bytes.truncate(bytes.len() - 10);
    let path = temp_file("truncated.wav", &bytes);
    let result = decode_file(&path);
    let _ = std::fs::remove_file(&path);

    let pcm = result.unwrap();
    assert_eq!(pcm.channels(), 2);
    assert!(pcm.frame_count() > 0);
    assert!(pcm.frame_count() < 50_000);
}

#[test]
fn garbage_is_a_probe_error() {
    let path = temp_file("garbage.wav", b"this is not an audio container");
    let result = decode_file(&path);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(result, Err(LoadError::Probe(_))));
}

#[test]
fn missing_file_is_an_open_error() {
    let path = std::env::temp_dir().join("tui_player_no_such_file.wav");
    let _ = std::fs::remove_file(&path);
    assert!(matches!(
        decode_file(&path),
        Err(LoadError::Open { .. })
    ));
}

use arc_swap::ArcSwap;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Observer as _, Split as _};
use std::sync::Arc;
use tui_player::eq::{EqProcessor, EqSnapshot};
use tui_player::pcm::{PcmBuffer, SampleEncoding};
use tui_player::player::{Player, PlayerState};

fn eq_shared(enabled: bool) -> Arc<ArcSwap<EqSnapshot>> {
    Arc::new(ArcSwap::from_pointee(EqSnapshot {
        enabled,
        gains_db: [0.0; 10],
    }))
}

fn mono(samples: Vec<f32>, rate: u32) -> PcmBuffer {
    PcmBuffer::new(samples, 1, rate, SampleEncoding::F32).unwrap()
}

fn stereo(samples: Vec<f32>, rate: u32) -> PcmBuffer {
    PcmBuffer::new(samples, 2, rate, SampleEncoding::F32).unwrap()
}

fn pull(player: &Player, out: &mut [f32], out_channels: usize) {
    let mut eq = EqProcessor::new();
    let mut scratch = Vec::new();
    player
        .shared()
        .fill(out, out_channels, &mut eq, None, &mut scratch);
}

#[test]
fn starts_stopped_with_default_volume() {
    let player = Player::new(eq_shared(false));
    assert_eq!(player.state(), PlayerState::Stopped);
    assert!(!player.has_track());
    assert!((player.volume() - 0.7).abs() < 1e-6);
    assert_eq!(player.get_duration(), 0.0);
    assert_eq!(player.get_current_time(), 0.0);
}

#[test]
fn play_without_track_is_a_no_op() {
    let player = Player::new(eq_shared(false));
    player.play();
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn play_on_empty_buffer_is_a_no_op() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(Vec::new(), 44_100));
    player.play();
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn transport_state_machine() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.0; 44_100], 44_100));
    assert_eq!(player.state(), PlayerState::Stopped);

    // Pause from Stopped has no effect.
    player.pause();
    assert_eq!(player.state(), PlayerState::Stopped);

    player.play();
    assert_eq!(player.state(), PlayerState::Playing);
    player.pause();
    assert_eq!(player.state(), PlayerState::Paused);
    player.play();
    assert_eq!(player.state(), PlayerState::Playing);
    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.get_current_time(), 0.0);

    // Stop is idempotent.
    player.stop();
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn loading_forces_stopped_and_resets_position() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.1; 8_820], 44_100));
    player.play();
    player.seek(0.1);
    player.load(mono(vec![0.2; 4_410], 44_100));
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.get_current_time(), 0.0);
    assert!((player.get_duration() - 0.1).abs() < 1e-9);
}

#[test]
fn seek_clamps_to_track_bounds() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.0; 44_100], 44_100));

    player.seek(0.5);
    assert!((player.get_current_time() - 0.5).abs() < 1e-6);

    player.seek(-3.0);
    assert_eq!(player.get_current_time(), 0.0);

    player.seek(99.0);
    assert!((player.get_current_time() - 1.0).abs() < 1e-9);
}

#[test]
fn seek_without_track_is_a_no_op() {
    let player = Player::new(eq_shared(false));
    player.seek(5.0);
    assert_eq!(player.get_current_time(), 0.0);
}

#[test]
fn fill_is_silent_unless_playing() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.5; 4_410], 44_100));

    let mut out = vec![1.0f32; 512];
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(player.get_current_time(), 0.0);

    player.play();
    player.pause();
    out.fill(1.0);
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(player.get_current_time(), 0.0);
}

#[test]
fn fill_applies_volume() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![1.0; 4_410], 44_100));
    player.set_volume(0.5);
    player.play();

    let mut out = vec![0.0f32; 256];
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn zero_volume_plays_silence_but_advances() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![1.0; 4_410], 44_100));
    player.set_volume(0.0);
    player.play();

    let mut out = vec![1.0f32; 256];
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| s == 0.0));
    // The cursor still moves; silence is a gain, not a pause.
    assert!(player.get_current_time() > 0.0);
}

#[test]
fn fill_normalizes_integer_amplitude() {
    // Samples stored at native i16 scale come out divided by 32768.
    let pcm = PcmBuffer::new(vec![16_384.0; 1_024], 1, 44_100, SampleEncoding::I16).unwrap();
    let mut player = Player::new(eq_shared(false));
    player.load(pcm);
    player.set_volume(1.0);
    player.play();

    let mut out = vec![0.0f32; 256];
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn short_tail_is_zero_padded_and_then_stops() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![1.0; 100], 44_100));
    player.set_volume(1.0);
    player.play();

    let mut out = vec![9.0f32; 256];
    pull(&player, &mut out, 1);
    assert!(out[..100].iter().all(|&s| (s - 1.0).abs() < 1e-6));
    assert!(out[100..].iter().all(|&s| s == 0.0));
    assert_eq!(player.state(), PlayerState::Playing);

    // Cursor is now at the end; the next pull reports end of stream.
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.get_current_time(), 0.0);
}

#[test]
fn stereo_folds_to_mono_output() {
    let mut frames = Vec::new();
    for _ in 0..64 {
        frames.extend_from_slice(&[0.2, 0.6]);
    }
    let mut player = Player::new(eq_shared(false));
    player.load(stereo(frames, 44_100));
    player.set_volume(1.0);
    player.play();

    let mut out = vec![0.0f32; 64];
    pull(&player, &mut out, 1);
    assert!(out.iter().all(|&s| (s - 0.4).abs() < 1e-6));
}

#[test]
fn mono_duplicates_to_stereo_output() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.25; 64], 44_100));
    player.set_volume(1.0);
    player.play();

    let mut out = vec![0.0f32; 128];
    pull(&player, &mut out, 2);
    assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
}

#[test]
fn mute_restores_previous_volume() {
    let mut player = Player::new(eq_shared(false));
    player.set_volume(0.8);

    assert!(player.toggle_mute());
    assert!(player.muted());
    // Effective volume is zero, the dialed-in value is retained.
    assert_eq!(player.shared().volume(), 0.0);
    assert!((player.volume() - 0.8).abs() < 1e-6);

    // Adjusting while muted only moves the restore point.
    player.set_volume(0.3);
    assert_eq!(player.shared().volume(), 0.0);

    assert!(!player.toggle_mute());
    assert!((player.volume() - 0.3).abs() < 1e-6);
    assert!((player.shared().volume() - 0.3).abs() < 1e-6);
}

#[test]
fn volume_is_clamped() {
    let mut player = Player::new(eq_shared(false));
    player.set_volume(3.0);
    assert_eq!(player.volume(), 1.0);
    player.set_volume(-1.0);
    assert_eq!(player.volume(), 0.0);
}

#[test]
fn published_eq_snapshot_shapes_the_output() {
    let eq = eq_shared(true);
    let mut player = Player::new(Arc::clone(&eq));
    // 100 Hz tone, attenuated 12 dB in the lowest bands.
    let samples: Vec<f32> = (0..4_410)
        .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44_100.0).sin())
        .collect();
    let in_rms = rms(&samples);
    player.load(mono(samples, 44_100));
    player.set_volume(1.0);
    player.play();

    eq.store(Arc::new(EqSnapshot {
        enabled: true,
        gains_db: [-12.0, -12.0, -12.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    }));

    let mut out = vec![0.0f32; 4_410];
    pull(&player, &mut out, 1);
    let expected = in_rms * 10.0_f32.powf(-12.0 / 20.0);
    assert!((rms(&out) - expected).abs() / expected < 0.02);
}

#[test]
fn viz_ring_receives_the_padded_chunk() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![1.0; 100], 44_100));
    player.set_volume(0.5);
    player.play();

    let (mut prod, mut cons) = HeapRb::<f32>::new(1_024).split();
    let mut out = vec![0.0f32; 256];
    let mut eq = EqProcessor::new();
    let mut scratch = Vec::new();
    player
        .shared()
        .fill(&mut out, 1, &mut eq, Some(&mut prod), &mut scratch);

    // Whole block length, volume applied, tail padded.
    assert_eq!(cons.occupied_len(), 256);
    let mut delivered = vec![0.0f32; 256];
    cons.pop_slice(&mut delivered);
    assert!(delivered[..100].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    assert!(delivered[100..].iter().all(|&s| s == 0.0));
    assert_eq!(player.viz_drops(), 0);
}

#[test]
fn full_viz_ring_drops_the_whole_chunk() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![1.0; 44_100], 44_100));
    player.play();

    let (mut prod, cons) = HeapRb::<f32>::new(64).split();
    let mut out = vec![0.0f32; 256];
    let mut eq = EqProcessor::new();
    let mut scratch = Vec::new();
    player
        .shared()
        .fill(&mut out, 1, &mut eq, Some(&mut prod), &mut scratch);

    // Chunk did not fit: nothing partial lands, the counter ticks.
    assert_eq!(cons.occupied_len(), 0);
    assert_eq!(player.viz_drops(), 1);

    player
        .shared()
        .fill(&mut out, 1, &mut eq, Some(&mut prod), &mut scratch);
    assert_eq!(player.viz_drops(), 2);
}

#[test]
fn playback_runs_to_completion() {
    let mut player = Player::new(eq_shared(false));
    player.load(mono(vec![0.0; 2_048], 44_100));
    player.play();

    let mut out = vec![0.0f32; 1_024];
    for _ in 0..3 {
        pull(&player, &mut out, 1);
    }
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.get_current_time(), 0.0);
    assert!(player.has_track());
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

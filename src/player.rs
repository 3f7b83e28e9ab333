use crate::eq::{EqProcessor, EqSnapshot};
use crate::pcm::PcmBuffer;
use arc_swap::{ArcSwap, ArcSwapOption};
use ringbuf::HeapProd;
use ringbuf::traits::{Observer as _, Producer as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};

const STATE_STOPPED: u8 = 0;
const STATE_PLAYING: u8 = 1;
const STATE_PAUSED: u8 = 2;

pub const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl PlayerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            STATE_PLAYING => Self::Playing,
            STATE_PAUSED => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// A loaded buffer and its playback cursor, published as one unit so
/// the callback can never pair a buffer with a cursor from a
/// different load. The cursor only advances from the realtime pull;
/// control-side writes are seek and the resets on stop/load.
struct Track {
    pcm: PcmBuffer,
    cursor: AtomicUsize,
}

/// State shared between the control thread and the realtime output
/// callback. Control publishes replacements (volume bits, equalizer
/// snapshot, whole track); the callback only reads the latest
/// publication and owns cursor advancement.
pub struct PlayerShared {
    state: AtomicU8,
    volume_bits: AtomicU32,
    eq: Arc<ArcSwap<EqSnapshot>>,
    track: ArcSwapOption<Track>,
    viz_drops: AtomicU64,
}

impl PlayerShared {
    fn new(eq: Arc<ArcSwap<EqSnapshot>>) -> Self {
        Self {
            state: AtomicU8::new(STATE_STOPPED),
            volume_bits: AtomicU32::new(DEFAULT_VOLUME.to_bits()),
            eq,
            track: ArcSwapOption::const_empty(),
            viz_drops: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PlayerState {
        PlayerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Chunks rejected because the visualization ring was full.
    pub fn viz_drops(&self) -> u64 {
        self.viz_drops.load(Ordering::Relaxed)
    }

    /// The realtime pull: fill `out` (interleaved, `out_channels`
    /// wide) with the next block of audio.
    ///
    /// Reads the published track/volume/equalizer state, equalizes
    /// and scales the chunk, normalizes native amplitude to [-1, 1],
    /// zero-pads a short tail, forwards the source-layout chunk to
    /// the visualization ring, and advances the cursor by the source
    /// frames consumed. Emits silence (and transitions to Stopped)
    /// once the cursor reaches the end. Never blocks; `scratch` and
    /// the ring are the only buffers it touches and both are
    /// preallocated by the caller.
    pub fn fill(
        &self,
        out: &mut [f32],
        out_channels: usize,
        eq: &mut EqProcessor,
        viz: Option<&mut HeapProd<f32>>,
        scratch: &mut Vec<f32>,
    ) {
        out.fill(0.0);
        if self.state.load(Ordering::Acquire) != STATE_PLAYING {
            return;
        }
        let Some(track) = self.track.load_full() else {
            return;
        };

        let pcm = &track.pcm;
        let src_channels = pcm.channels();
        let total = pcm.frame_count();
        let cursor = track.cursor.load(Ordering::Acquire);
        if cursor >= total {
            // Natural end of stream: silence now, Stopped from here on.
            track.cursor.store(0, Ordering::Release);
            self.state.store(STATE_STOPPED, Ordering::Release);
            return;
        }

        let out_channels = out_channels.max(1);
        let out_frames = out.len() / out_channels;
        let take = (total - cursor).min(out_frames);

        scratch.clear();
        scratch.extend_from_slice(pcm.frames(cursor, cursor + take));

        let snap = **self.eq.load();
        if snap.enabled {
            eq.process(scratch, src_channels, pcm.sample_rate(), &snap.gains_db);
        }

        // Volume, then native-amplitude normalization, in one scale.
        let gain = self.volume() / pcm.encoding().divisor();
        for s in scratch.iter_mut() {
            *s *= gain;
        }

        // Zero-pad the tail so the delivered chunk is shape-preserving
        // at the full block length.
        scratch.resize(out_frames * src_channels, 0.0);

        if let Some(prod) = viz {
            if prod.vacant_len() >= scratch.len() {
                prod.push_slice(scratch);
            } else {
                self.viz_drops.fetch_add(1, Ordering::Relaxed);
            }
        }

        if src_channels == out_channels {
            out.copy_from_slice(scratch);
        } else if src_channels == 2 && out_channels == 1 {
            for (f, frame) in scratch.chunks_exact(2).enumerate() {
                out[f] = (frame[0] + frame[1]) * 0.5;
            }
        } else {
            // Mono to stereo (or wider): repeat source channels round-robin.
            for f in 0..out_frames {
                for c in 0..out_channels {
                    out[f * out_channels + c] = scratch[f * src_channels + (c % src_channels)];
                }
            }
        }

        track.cursor.store(cursor + take, Ordering::Release);
    }
}

/// Control-thread handle over the playback engine. Owns the mute
/// bookkeeping; everything the callback needs lives in [`PlayerShared`].
pub struct Player {
    shared: Arc<PlayerShared>,
    muted: bool,
    saved_volume: f32,
}

impl Player {
    pub fn new(eq: Arc<ArcSwap<EqSnapshot>>) -> Self {
        Self {
            shared: Arc::new(PlayerShared::new(eq)),
            muted: false,
            saved_volume: DEFAULT_VOLUME,
        }
    }

    pub fn shared(&self) -> Arc<PlayerShared> {
        Arc::clone(&self.shared)
    }

    /// Replace the active buffer. The swap installs the new buffer
    /// with a zeroed cursor as a single unit and forces Stopped.
    /// Malformed input is rejected earlier, at [`PcmBuffer::new`], so
    /// a failed load never reaches this point and the previous track
    /// stays active.
    pub fn load(&mut self, pcm: PcmBuffer) {
        self.shared.track.store(Some(Arc::new(Track {
            pcm,
            cursor: AtomicUsize::new(0),
        })));
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
    }

    /// Start or resume. No-op without a loaded, non-empty buffer.
    pub fn play(&self) {
        let Some(track) = self.shared.track.load_full() else {
            return;
        };
        if track.pcm.frame_count() == 0 {
            return;
        }
        self.shared.state.store(STATE_PLAYING, Ordering::Release);
    }

    /// Suspend the stream, cursor retained. Only valid from Playing.
    pub fn pause(&self) {
        let _ = self.shared.state.compare_exchange(
            STATE_PLAYING,
            STATE_PAUSED,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    /// Halt and rewind. Idempotent.
    pub fn stop(&self) {
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
        if let Some(track) = self.shared.track.load_full() {
            track.cursor.store(0, Ordering::Release);
        }
    }

    /// Position the cursor at `seconds`, silently clamped to the
    /// track bounds. No-op with no buffer loaded.
    pub fn seek(&self, seconds: f64) {
        let Some(track) = self.shared.track.load_full() else {
            return;
        };
        let frames = track.pcm.frame_count();
        let target = (seconds.max(0.0) * track.pcm.sample_rate() as f64).round() as usize;
        track.cursor.store(target.min(frames), Ordering::Release);
    }

    /// Clamped to [0, 1]. While muted only the restore value changes.
    pub fn set_volume(&mut self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        if self.muted {
            self.saved_volume = clamped;
        } else {
            self.shared
                .volume_bits
                .store(clamped.to_bits(), Ordering::Relaxed);
        }
    }

    /// The volume the user dialed in, regardless of mute.
    pub fn volume(&self) -> f32 {
        if self.muted {
            self.saved_volume
        } else {
            self.shared.volume()
        }
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Mute drops the effective volume to zero and remembers the
    /// previous setting; unmute restores it.
    pub fn toggle_mute(&mut self) -> bool {
        if self.muted {
            self.muted = false;
            self.shared
                .volume_bits
                .store(self.saved_volume.to_bits(), Ordering::Relaxed);
        } else {
            self.saved_volume = self.shared.volume();
            self.muted = true;
            self.shared
                .volume_bits
                .store(0.0_f32.to_bits(), Ordering::Relaxed);
        }
        self.muted
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    pub fn has_track(&self) -> bool {
        self.shared.track.load().is_some()
    }

    /// Channel count of the loaded track, 0 when nothing is loaded.
    pub fn channels(&self) -> usize {
        self.shared
            .track
            .load()
            .as_ref()
            .map_or(0, |t| t.pcm.channels())
    }

    /// Sample rate of the loaded track, 0 when nothing is loaded.
    pub fn sample_rate(&self) -> u32 {
        self.shared
            .track
            .load()
            .as_ref()
            .map_or(0, |t| t.pcm.sample_rate())
    }

    pub fn get_current_time(&self) -> f64 {
        self.shared.track.load().as_ref().map_or(0.0, |t| {
            t.cursor.load(Ordering::Acquire) as f64 / t.pcm.sample_rate() as f64
        })
    }

    pub fn get_duration(&self) -> f64 {
        self.shared
            .track
            .load()
            .as_ref()
            .map_or(0.0, |t| t.pcm.duration_seconds())
    }

    pub fn viz_drops(&self) -> u64 {
        self.shared.viz_drops()
    }
}

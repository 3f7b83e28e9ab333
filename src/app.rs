use crate::config::{Config, VizSource};
use crate::decode;
use crate::eq::EqualizerEngine;
use crate::output::{self, CaptureStream, OutputStream};
use crate::player::{Player, PlayerState};
use crate::prefs::{PlayerPrefs, prefs_storage_path};
use crate::render;
use crate::terminal::TerminalGuard;
use crate::viz::{VisualizerEngine, VizFrame};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::{
    QueueableCommand, cursor,
    style::Print,
    terminal::{Clear, ClearType},
};
use ringbuf::HeapCons;
use ringbuf::traits::{Consumer as _, Observer as _};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const SEEK_STEP_SECONDS: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;
const GAIN_STEP_DB: f32 = 1.0;
const SENSITIVITY_STEP: f32 = 0.1;

/// Everything the control loop mutates in response to a key press.
struct Session {
    player: Player,
    eq: EqualizerEngine,
    viz: VisualizerEngine,
    mode: VizSource,
    output: Option<(OutputStream, HeapCons<f32>)>,
    capture: Option<(CaptureStream, HeapCons<f32>)>,
    track_path: Option<PathBuf>,
    selected_band: usize,
    status: String,
    quit: bool,
}

impl Session {
    fn load_track(&mut self, path: &Path) {
        // Tear the old stream down before swapping the buffer; the new
        // track may need a different rate or channel layout.
        self.output = None;
        match decode::decode_file(path) {
            Ok(pcm) => {
                self.player.load(pcm);
                self.viz.reset();
                self.track_path = Some(path.to_path_buf());
                self.status = format!("loaded {}", display_name(path));
                self.open_output();
            }
            Err(err) => {
                log::warn!("load failed for {}: {err}", path.display());
                self.status = format!("load failed: {err}");
            }
        }
    }

    fn open_output(&mut self) {
        if !self.player.has_track() {
            return;
        }
        match OutputStream::start(
            self.player.shared(),
            self.player.channels(),
            self.player.sample_rate(),
        ) {
            Ok((stream, cons)) => self.output = Some((stream, cons)),
            Err(err) => {
                log::warn!("output device unavailable: {err}");
                self.status = format!("output device unavailable: {err}");
            }
        }
    }

    fn toggle_viz_mode(&mut self, device_query: Option<&str>) {
        match self.mode {
            VizSource::Playback => match CaptureStream::start(device_query) {
                Ok((stream, cons)) => {
                    self.status = format!("visualizing capture: {}", stream.device_name);
                    self.capture = Some((stream, cons));
                    self.mode = VizSource::System;
                    self.viz.reset();
                    self.viz.reset_sensitivity();
                }
                Err(err) => {
                    log::warn!("capture unavailable: {err}");
                    self.status = format!("capture unavailable: {err}");
                }
            },
            VizSource::System => {
                // Old stream is fully stopped by the drop before the
                // visualizer switches back to playback chunks.
                self.capture = None;
                self.mode = VizSource::Playback;
                self.viz.reset();
                self.viz.reset_sensitivity();
                self.status = "visualizing playback".to_string();
            }
        }
    }

    fn cycle_capture_device(&mut self) {
        if self.mode != VizSource::System {
            return;
        }
        let names = match output::input_device_names() {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => {
                self.status = "no input devices found".to_string();
                return;
            }
            Err(err) => {
                self.status = format!("cannot list input devices: {err}");
                return;
            }
        };
        let current = self
            .capture
            .as_ref()
            .map(|(s, _)| s.device_name.clone())
            .unwrap_or_default();
        let pos = names.iter().position(|n| *n == current);
        let next = &names[pos.map_or(0, |p| (p + 1) % names.len())];

        // No overlap window: drop the old stream before opening the next.
        self.capture = None;
        match CaptureStream::start(Some(next)) {
            Ok((stream, cons)) => {
                self.status = format!("capture device: {}", stream.device_name);
                self.capture = Some((stream, cons));
                self.viz.reset();
            }
            Err(err) => {
                log::warn!("capture device switch failed: {err}");
                self.status = format!("capture device failed: {err}");
            }
        }
    }

    /// Capture levels cover a much wider range than decoded audio,
    /// so system mode takes coarser sensitivity steps.
    fn sensitivity_step(&self) -> f32 {
        match self.mode {
            VizSource::Playback => SENSITIVITY_STEP,
            VizSource::System => SENSITIVITY_STEP * 10.0,
        }
    }

    fn cycle_preset(&mut self) {
        let names: Vec<String> = self
            .eq
            .get_preset_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let current = self.eq.current_preset().to_string();
        let pos = names.iter().position(|n| *n == current).unwrap_or(0);
        let next = &names[(pos + 1) % names.len()];
        self.eq.set_preset(next);
        self.status = format!("preset: {next}");
    }

    fn nudge_band(&mut self, delta_db: f32) {
        let gains = self.eq.get_current_bands();
        self.eq
            .set_band_gain(self.selected_band, gains[self.selected_band] + delta_db);
    }

    fn handle_key(&mut self, code: KeyCode, device_query: Option<&str>) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char(' ') => {
                if self.player.state() == PlayerState::Playing {
                    self.player.pause();
                    self.status = "paused".to_string();
                } else {
                    self.player.play();
                    if self.player.state() == PlayerState::Playing {
                        self.status = "playing".to_string();
                    }
                }
            }
            KeyCode::Char('s') => {
                self.player.stop();
                self.viz.reset();
                self.status = "stopped".to_string();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.player
                    .seek(self.player.get_current_time() - SEEK_STEP_SECONDS);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.player
                    .seek(self.player.get_current_time() + SEEK_STEP_SECONDS);
            }
            KeyCode::Char('-') => {
                let v = self.player.volume() - VOLUME_STEP;
                self.player.set_volume(v);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let v = self.player.volume() + VOLUME_STEP;
                self.player.set_volume(v);
            }
            KeyCode::Char('m') => {
                let muted = self.player.toggle_mute();
                self.status = if muted { "muted" } else { "unmuted" }.to_string();
            }
            KeyCode::Char('e') => {
                let on = self.eq.toggle();
                self.status = format!("equalizer {}", if on { "on" } else { "off" });
            }
            KeyCode::Char('p') => self.cycle_preset(),
            KeyCode::Tab => {
                self.selected_band = (self.selected_band + 1) % crate::eq::BAND_COUNT;
            }
            KeyCode::BackTab => {
                self.selected_band =
                    (self.selected_band + crate::eq::BAND_COUNT - 1) % crate::eq::BAND_COUNT;
            }
            KeyCode::Up => self.nudge_band(GAIN_STEP_DB),
            KeyCode::Down => self.nudge_band(-GAIN_STEP_DB),
            KeyCode::Char('v') => self.toggle_viz_mode(device_query),
            KeyCode::Char('i') => self.cycle_capture_device(),
            KeyCode::Char('[') => self.viz.set_sensitivity(-self.sensitivity_step()),
            KeyCode::Char(']') => self.viz.set_sensitivity(self.sensitivity_step()),
            _ => {}
        }
    }

    fn prefs(&self) -> PlayerPrefs {
        PlayerPrefs {
            volume: self.player.volume(),
            muted: self.player.muted(),
            preset: self.eq.current_preset().to_string(),
            custom_gains: if self.eq.current_preset() == crate::eq::CUSTOM_PRESET {
                Some(self.eq.get_current_bands())
            } else {
                None
            },
            eq_enabled: self.eq.enabled(),
            sensitivity: self.viz.sensitivity(),
            last_track: self.track_path.clone(),
            last_position: self.player.get_current_time(),
        }
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let prefs_path = if cfg.no_prefs {
        None
    } else {
        cfg.prefs_file.clone().or_else(prefs_storage_path)
    };
    let prefs = match PlayerPrefs::load(prefs_path.as_deref()) {
        Ok(p) => p,
        Err(err) => {
            log::warn!("prefs unreadable, using defaults: {err}");
            PlayerPrefs::default()
        }
    };

    let mut eq = EqualizerEngine::new();
    eq.restore(&prefs.preset, prefs.custom_gains, prefs.eq_enabled);

    let mut player = Player::new(eq.shared());
    player.set_volume(prefs.volume);
    if prefs.muted {
        player.toggle_mute();
    }

    let mut viz = VisualizerEngine::new(cfg.bars.max(1), 44_100);
    viz.restore_sensitivity(prefs.sensitivity);

    let mut session = Session {
        player,
        eq,
        viz,
        mode: VizSource::Playback,
        output: None,
        capture: None,
        track_path: None,
        selected_band: 0,
        status: "ready".to_string(),
        quit: false,
    };

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    // Initial track: command line wins over the remembered one.
    let initial = cfg.file.clone().or_else(|| prefs.last_track.clone());
    if let Some(path) = initial {
        session.load_track(&path);
        if session.player.has_track() && prefs.last_position > 0.0 && cfg.file.is_none() {
            session.player.seek(prefs.last_position);
            session.status = format!(
                "{} (resumed at {:.0}s)",
                session.status, prefs.last_position
            );
        }
    }
    if cfg.viz_source == VizSource::System {
        session.toggle_viz_mode(cfg.device.as_deref());
    }

    let tick = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
    let mut chunk: Vec<f32> = Vec::new();
    let mut last_frame = VizFrame {
        left: vec![0.0; session.viz.bar_count()],
        right: vec![0.0; session.viz.bar_count()],
        mono: vec![0.0; session.viz.bar_count()],
        sample_rate: 44_100,
    };
    let mut prev_state = session.player.state();

    while !session.quit {
        let started = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Release {
                    session.handle_key(k.code, cfg.device.as_deref());
                }
            }
        }

        // End of stream is observed here: the callback has already
        // flipped the state to Stopped and rewound the cursor.
        let state = session.player.state();
        if state == PlayerState::Stopped && prev_state == PlayerState::Playing {
            session.viz.reset();
            session.status = "end of track".to_string();
        }
        prev_state = state;

        // Drain whichever source feeds the visualizer this tick.
        chunk.clear();
        let (channels, sample_rate) = match session.mode {
            VizSource::Playback => {
                if let Some((_, cons)) = session.output.as_mut() {
                    drain_ring(cons, &mut chunk);
                }
                (session.player.channels(), session.player.sample_rate())
            }
            VizSource::System => {
                if let Some((stream, cons)) = session.capture.as_mut() {
                    let params = (stream.channels, stream.sample_rate);
                    drain_ring(cons, &mut chunk);
                    params
                } else {
                    (0, 0)
                }
            }
        };
        if !chunk.is_empty() {
            last_frame = session.viz.process(
                &chunk,
                channels,
                if sample_rate > 0 { Some(sample_rate) } else { None },
            );
        } else if state == PlayerState::Stopped && session.mode == VizSource::Playback {
            last_frame = session.viz.process(&[], channels, None);
        }

        draw(&mut out, &session, &last_frame).context("draw frame")?;

        let elapsed = started.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }

    if let Err(err) = session.prefs().save(prefs_path.as_deref()) {
        log::warn!("could not save prefs: {err}");
    }
    Ok(())
}

fn drain_ring(cons: &mut HeapCons<f32>, chunk: &mut Vec<f32>) {
    let available = cons.occupied_len();
    chunk.reserve(available);
    for _ in 0..available {
        match cons.try_pop() {
            Some(s) => chunk.push(s),
            None => break,
        }
    }
}

fn draw(
    out: &mut BufWriter<std::io::Stdout>,
    session: &Session,
    frame: &VizFrame,
) -> anyhow::Result<()> {
    let (cols, _rows) = crossterm::terminal::size()?;
    let width = cols as usize;

    let title = match &session.track_path {
        Some(p) => format!("tui-player :: {}", display_name(p)),
        None => "tui-player :: no track".to_string(),
    };
    let mode_line = match session.mode {
        VizSource::Playback => format!("viz: playback   sens {:.1}x", session.viz.sensitivity()),
        VizSource::System => {
            let device = session
                .capture
                .as_ref()
                .map(|(s, _)| s.device_name.as_str())
                .unwrap_or("-");
            format!(
                "viz: system ({device})   sens {:.1}x   [i] cycles device",
                session.viz.sensitivity()
            )
        }
    };

    let mut lines: Vec<String> = Vec::with_capacity(render::BAR_ROWS + 8);
    lines.push(title);
    lines.push(mode_line);
    lines.extend(render::bar_grid(frame, width));
    lines.push(render::vu_meter(frame));
    lines.push(render::eq_line(
        session.eq.enabled(),
        session.eq.current_preset(),
        &session.eq.get_current_bands(),
        session.selected_band,
    ));
    lines.push(render::eq_band_labels(session.selected_band));
    lines.push(render::transport_line(
        session.player.state(),
        session.player.get_current_time(),
        session.player.get_duration(),
        session.player.volume(),
        session.player.muted(),
        session.player.viz_drops(),
    ));
    lines.push(format!("> {}", session.status));
    lines.push(
        "space play/pause  s stop  h/l seek  +/- vol  m mute  e eq  p preset  tab band  \
         up/down gain  v viz mode  i device  [/] sens  q quit"
            .to_string(),
    );

    for (row, line) in lines.iter().enumerate() {
        // Clip by characters; the bar glyphs are multi-byte.
        let clipped: String = line.chars().take(width.max(1)).collect();
        out.queue(cursor::MoveTo(0, row as u16))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(Print(clipped))?;
    }
    out.flush()?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

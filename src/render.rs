use crate::bands::EQ_BAND_HZ;
use crate::eq::BAND_COUNT;
use crate::player::PlayerState;
use crate::viz::VizFrame;

/// Glyph ramp for sub-cell bar resolution, empty to full.
const BAR_RAMP: [char; 9] = [
    ' ', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}',
    '\u{2588}',
];

/// Rows of the bar grid.
pub const BAR_ROWS: usize = 10;

/// Render the smoothed mono band vector as a column chart,
/// `BAR_ROWS` lines, top row first. Values are expected in [0, 1].
pub fn bar_grid(frame: &VizFrame, width: usize) -> Vec<String> {
    let bars = frame.mono.len().min(width.saturating_sub(1).max(1) / 2);
    let mut lines = Vec::with_capacity(BAR_ROWS);
    for row in (0..BAR_ROWS).rev() {
        let mut line = String::with_capacity(bars * 2);
        for &v in frame.mono.iter().take(bars) {
            let level = (v.clamp(0.0, 1.0) * BAR_ROWS as f32 * 8.0) as usize;
            let cell_floor = row * 8;
            let glyph = if level >= cell_floor + 8 {
                BAR_RAMP[8]
            } else if level > cell_floor {
                BAR_RAMP[level - cell_floor]
            } else {
                BAR_RAMP[0]
            };
            line.push(glyph);
            line.push(' ');
        }
        lines.push(line);
    }
    lines
}

/// Stereo VU line from the per-channel band vectors.
pub fn vu_meter(frame: &VizFrame) -> String {
    let l = channel_level(&frame.left);
    let r = channel_level(&frame.right);
    format!("L: [{}] R: [{}]", level_cells(l), level_cells(r))
}

fn channel_level(bands: &[f32]) -> f32 {
    if bands.is_empty() {
        return 0.0;
    }
    let sq: f32 = bands.iter().map(|v| v * v).sum();
    (sq / bands.len() as f32).sqrt()
}

fn level_cells(level: f32) -> String {
    let filled = ((level * 12.0) as usize).min(10);
    let mut s = String::with_capacity(10);
    for i in 0..10 {
        s.push(if i < filled { '\u{2588}' } else { ' ' });
    }
    s
}

/// One line per equalizer state: enabled flag, preset name, and the
/// ten gains with the selected band bracketed.
pub fn eq_line(
    enabled: bool,
    preset: &str,
    gains: &[f32; BAND_COUNT],
    selected: usize,
) -> String {
    let mut s = format!("EQ [{}] {:<12} ", if enabled { "on " } else { "off" }, preset);
    for (i, g) in gains.iter().enumerate() {
        if i == selected {
            s.push_str(&format!("[{:+.0}]", g));
        } else {
            s.push_str(&format!(" {:+.0} ", g));
        }
    }
    s
}

/// Frequency labels aligned under the EQ gain columns.
pub fn eq_band_labels(selected: usize) -> String {
    let mut s = " ".repeat(17);
    for (i, hz) in EQ_BAND_HZ.iter().enumerate() {
        let label = if *hz >= 1000.0 {
            format!("{}k", (hz / 1000.0) as u32)
        } else {
            format!("{}", *hz as u32)
        };
        if i == selected {
            s.push_str(&format!("[{label:^3}]"));
        } else {
            s.push_str(&format!(" {label:^3} "));
        }
    }
    s
}

/// Transport line: state, position/duration, volume, drop counter.
pub fn transport_line(
    state: PlayerState,
    position: f64,
    duration: f64,
    volume: f32,
    muted: bool,
    viz_drops: u64,
) -> String {
    let state_label = match state {
        PlayerState::Stopped => "stopped",
        PlayerState::Playing => "playing",
        PlayerState::Paused => "paused ",
    };
    let vol = if muted {
        "muted".to_string()
    } else {
        format!("{:>3.0}%", volume * 100.0)
    };
    let mut s = format!(
        "{}  {} / {}  vol {}",
        state_label,
        clock(position),
        clock(duration),
        vol
    );
    if viz_drops > 0 {
        s.push_str(&format!("  (viz drops: {viz_drops})"));
    }
    s
}

fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

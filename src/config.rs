use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tui-player",
    version,
    about = "Terminal music player with 10-band EQ and spectrum visualizer"
)]
pub struct Config {
    /// Audio file to load on startup (mp3/flac/ogg/aac/wav).
    pub file: Option<PathBuf>,

    /// Visualization source: the player's own output, or a capture device.
    #[arg(long, value_enum, default_value_t = VizSource::Playback)]
    pub viz_source: VizSource,

    /// Number of spectrum bars.
    #[arg(long, default_value_t = 20)]
    pub bars: usize,

    /// Control/UI tick rate.
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Substring match for the capture device (system mode).
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Override the prefs file location.
    #[arg(long)]
    pub prefs_file: Option<PathBuf>,

    /// Skip loading and saving prefs entirely.
    #[arg(long, default_value_t = false)]
    pub no_prefs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VizSource {
    #[value(alias = "file")]
    Playback,
    #[value(alias = "capture")]
    System,
}

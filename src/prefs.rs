use crate::eq::BAND_COUNT;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings persisted between sessions. The engines accept these as
/// initial values and report current values back for saving; all file
/// I/O stays here, outside the audio core.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPrefs {
    pub volume: f32,
    pub muted: bool,
    pub preset: String,
    pub custom_gains: Option<[f32; BAND_COUNT]>,
    pub eq_enabled: bool,
    pub sensitivity: f32,
    pub last_track: Option<PathBuf>,
    pub last_position: f64,
}

impl Default for PlayerPrefs {
    fn default() -> Self {
        Self {
            volume: 0.7,
            muted: false,
            preset: "flat".to_string(),
            custom_gains: None,
            eq_enabled: true,
            sensitivity: 1.0,
            last_track: None,
            last_position: 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl PlayerPrefs {
    /// Load from a `key=value` file. A missing file (or no path at
    /// all) yields defaults; unknown keys are ignored so older files
    /// keep working.
    pub fn load(path: Option<&Path>) -> Result<Self, PrefsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(PrefsError::Io(err.to_string())),
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, PrefsError> {
        let mut prefs = Self::default();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(PrefsError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let key = key_raw.trim();
            let value = value_raw.trim();
            match key {
                "volume" => {
                    prefs.volume = parse_float(value, line_no, "volume")?.clamp(0.0, 1.0);
                }
                "muted" => {
                    prefs.muted = parse_bool(value).ok_or_else(|| PrefsError::Parse {
                        line: line_no,
                        message: "muted must be true/false".to_string(),
                    })?;
                }
                "preset" => {
                    prefs.preset = value.to_string();
                }
                "custom_gains" => {
                    prefs.custom_gains = Some(parse_gains(value, line_no)?);
                }
                "eq_enabled" => {
                    prefs.eq_enabled = parse_bool(value).ok_or_else(|| PrefsError::Parse {
                        line: line_no,
                        message: "eq_enabled must be true/false".to_string(),
                    })?;
                }
                "sensitivity" => {
                    prefs.sensitivity = parse_float(value, line_no, "sensitivity")?;
                }
                "last_track" => {
                    if !value.is_empty() {
                        prefs.last_track = Some(PathBuf::from(value));
                    }
                }
                "last_position" => {
                    prefs.last_position =
                        f64::from(parse_float(value, line_no, "last_position")?).max(0.0);
                }
                _ => {}
            }
        }
        Ok(prefs)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), PrefsError> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrefsError::Io(e.to_string()))?;
        }
        let body = self.to_text();
        // Write-then-rename so a crash mid-save never truncates the file.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &body).map_err(|e| PrefsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PrefsError::Io(e.to_string()))
    }

    pub fn to_text(&self) -> String {
        let mut body = String::from("# tui_player runtime prefs v1\n");
        body.push_str(&format!("volume={}\n", self.volume));
        body.push_str(&format!("muted={}\n", self.muted));
        body.push_str(&format!("preset={}\n", self.preset));
        if let Some(gains) = &self.custom_gains {
            let joined = gains
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join(",");
            body.push_str(&format!("custom_gains={joined}\n"));
        }
        body.push_str(&format!("eq_enabled={}\n", self.eq_enabled));
        body.push_str(&format!("sensitivity={}\n", self.sensitivity));
        if let Some(track) = &self.last_track {
            body.push_str(&format!("last_track={}\n", track.display()));
        }
        body.push_str(&format!("last_position={}\n", self.last_position));
        body
    }
}

pub fn prefs_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("tui_player").join("prefs.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("tui_player")
            .join("prefs.txt"),
    )
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_float(raw: &str, line: usize, key: &str) -> Result<f32, PrefsError> {
    raw.parse::<f32>().map_err(|_| PrefsError::Parse {
        line,
        message: format!("{key} must be a number"),
    })
}

fn parse_gains(raw: &str, line: usize) -> Result<[f32; BAND_COUNT], PrefsError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != BAND_COUNT {
        return Err(PrefsError::Parse {
            line,
            message: format!("custom_gains must have {BAND_COUNT} comma-separated values"),
        });
    }
    let mut gains = [0.0f32; BAND_COUNT];
    for (slot, part) in gains.iter_mut().zip(&parts) {
        *slot = part.parse::<f32>().map_err(|_| PrefsError::Parse {
            line,
            message: format!("invalid gain value: {part}"),
        })?;
    }
    Ok(gains)
}

use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";

fn default_toasts() -> bool {
    true
}

fn default_toast_duration() -> f32 {
    3.5
}

fn default_marker_size() -> i32 {
    40
}

fn default_track_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug
    /// level. Defaults to `false` when the field is missing.
    #[serde(default)]
    pub debug_logging: bool,
    /// Enable toast notifications in the UI.
    #[serde(default = "default_toasts")]
    pub enable_toasts: bool,
    /// Duration of toast notifications in seconds.
    #[serde(default = "default_toast_duration")]
    pub toast_duration: f32,
    /// Edge length of the square pushpin marker, in pixels.
    #[serde(default = "default_marker_size")]
    pub marker_size: i32,
    /// Cadence of the marker position tracking, in milliseconds.
    #[serde(default = "default_track_interval")]
    pub track_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            enable_toasts: default_toasts(),
            toast_duration: default_toast_duration(),
            marker_size: default_marker_size(),
            track_interval_ms: default_track_interval(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DEBOUNCE_MS: u64 = 3000;

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveSettings {
    /// Background persistence while typing
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Quiet period before a pending change is written
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Directory holding one JSON file per content record
    pub dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./content_drafts/"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub autosave: AutosaveSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

fn default_enabled() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

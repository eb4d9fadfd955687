//! Settings loading: optional TOML file, then `DRAFTCTL_*` environment.
//!
//! Nested keys use a double underscore, e.g.
//! `DRAFTCTL_AUTOSAVE__DEBOUNCE_MS=500` or `DRAFTCTL_STORE__DIR=/tmp/drafts`.

use config::{Config, Environment, File, FileFormat};
use domain::setting::Settings;
use std::path::Path;

use crate::error::Result;

pub const ENV_PREFIX: &str = "DRAFTCTL";

#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<Settings> {
    let file = File::from(path).format(FileFormat::Toml).required(false);
    let cfg = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings: Settings = cfg.try_deserialize()?;
    tracing::debug!(?settings, "settings loaded");
    Ok(settings)
}

use domain::DraftError;
use std::io;
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("draft error: {0}")]
    Draft(#[from] DraftError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("script error: {0:#}")]
    Script(anyhow::Error),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("expected a JSON object in {0}")]
    NotAnObject(String),

    #[error("either --step or --all is required")]
    MissingStep,
}

pub type Result<T> = std::result::Result<T, CliError>;

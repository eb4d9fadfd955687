//! Scripted draft sessions.
//!
//! A script is a JSON array of steps replayed in order against one
//! `DraftSession`:
//!
//! ```json
//! [
//!   {"op": "initialize", "userId": "u1", "type": "promotion"},
//!   {"op": "update", "key": "title", "value": "Back to School"},
//!   {"op": "wait_ms", "ms": 3500},
//!   {"op": "next", "data": {"promotionType": "discount"}},
//!   {"op": "publish"}
//! ]
//! ```

use anyhow::Context;
use domain::{ContentType, DraftError, Fields};
use engine::DraftSession;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::path::Path;
use std::time::Duration;
use store::ContentId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    #[serde(rename_all = "camelCase")]
    Initialize {
        user_id: String,
        #[serde(rename = "type")]
        kind: String,
    },
    Resume {
        id: String,
    },
    Update {
        key: String,
        value: Json,
    },
    Next {
        #[serde(default)]
        data: Fields,
    },
    Back,
    Save,
    Publish,
    WaitMs {
        ms: u64,
    },
}

impl ScriptStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptStep::Initialize { .. } => "initialize",
            ScriptStep::Resume { .. } => "resume",
            ScriptStep::Update { .. } => "update",
            ScriptStep::Next { .. } => "next",
            ScriptStep::Back => "back",
            ScriptStep::Save => "save",
            ScriptStep::Publish => "publish",
            ScriptStep::WaitMs { .. } => "wait_ms",
        }
    }
}

/// Outcome of one replayed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn parse(text: &str) -> anyhow::Result<Vec<ScriptStep>> {
    serde_json::from_str(text).context("script must be a JSON array of steps")
}

pub fn load(path: &Path) -> anyhow::Result<Vec<ScriptStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read script {}", path.display()))?;
    parse(&text).with_context(|| format!("parse script {}", path.display()))
}

/// Replay `steps` in order. With `strict`, stop at the first failing step.
#[tracing::instrument(skip_all, fields(steps = steps.len()))]
pub async fn replay(session: &DraftSession, steps: Vec<ScriptStep>, strict: bool) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(steps.len());
    for (index, step) in steps.into_iter().enumerate() {
        let op = step.name();
        let result = run_step(session, step).await;
        if let Err(err) = &result {
            tracing::warn!(index, op, error = %err, "script step failed");
        }
        let failed = result.is_err();
        outcomes.push(StepOutcome {
            index,
            op,
            error: result.err().map(|e| describe(&e)),
        });
        if strict && failed {
            break;
        }
    }
    outcomes
}

async fn run_step(session: &DraftSession, step: ScriptStep) -> Result<(), DraftError> {
    match step {
        ScriptStep::Initialize { user_id, kind } => {
            let kind: ContentType = kind.parse()?;
            session.initialize(&user_id, kind).await.map(|_| ())
        }
        ScriptStep::Resume { id } => session.resume(&ContentId::new(id)).await,
        ScriptStep::Update { key, value } => session.update_field(&key, value),
        ScriptStep::Next { data } => session.next(data).await,
        ScriptStep::Back => session.back(),
        ScriptStep::Save => session.save_draft().await,
        ScriptStep::Publish => session.publish().await,
        ScriptStep::WaitMs { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        }
    }
}

fn describe(err: &DraftError) -> String {
    match err {
        DraftError::Validation(report) => report.to_string(),
        other => other.to_string(),
    }
}

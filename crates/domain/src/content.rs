// crates/domain/src/content.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::DraftError;
use crate::validate::rules::{self, Rule};

/// The kind of marketing content a draft produces.
///
/// Fixed for the lifetime of a draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Promotion,
    Job,
    Event,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [ContentType::Promotion, ContentType::Job, ContentType::Event];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Promotion => "promotion",
            ContentType::Job => "job",
            ContentType::Event => "event",
        }
    }

    /// Number of wizard steps for this kind. Single source of truth.
    pub fn max_steps(&self) -> u8 {
        max_steps(*self)
    }

    /// Every step descriptor of this kind, in wizard order.
    pub fn steps(&self) -> impl Iterator<Item = StepDescriptor> {
        let kind = *self;
        (1..=kind.max_steps()).map(move |step| StepDescriptor { kind, step })
    }
}

pub fn max_steps(kind: ContentType) -> u8 {
    match kind {
        ContentType::Promotion => 5,
        ContentType::Job => 5,
        // The header component advertises 3; the step components go to 5.
        ContentType::Event => 5,
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "promotion" => Ok(ContentType::Promotion),
            "job" => Ok(ContentType::Job),
            "event" => Ok(ContentType::Event),
            _ => Err(DraftError::InvalidType(s.to_string())),
        }
    }
}

/// Publication status of a content record. Monotonic: `Draft` → `Published`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Published,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Published)
    }
}

/// A position in a specific kind's wizard, e.g. `{promotion, 2}`.
///
/// Only constructible for `1..=max_steps(kind)`, so rule lookup is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StepDescriptor {
    kind: ContentType,
    step: u8,
}

impl StepDescriptor {
    pub fn new(kind: ContentType, step: u8) -> Option<Self> {
        (1..=kind.max_steps())
            .contains(&step)
            .then_some(Self { kind, step })
    }

    pub fn kind(&self) -> ContentType {
        self.kind
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn is_last(&self) -> bool {
        self.step == self.kind.max_steps()
    }

    /// Gate rules checked before leaving this step.
    pub fn rules(&self) -> &'static [Rule] {
        rules::for_step(self.kind, self.step)
    }
}

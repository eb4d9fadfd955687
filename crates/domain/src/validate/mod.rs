// crates/domain/src/validate/mod.rs

//! StepValidator: pure, side-effect free checks for wizard data.
//!
//! - `validate_step` gates a single step before the wizard advances.
//! - `validate_all` re-checks every required field before publishing.
//! - `check_shape` is the lenient mode used by autosave: it only rejects
//!   values that would corrupt the record, not missing ones.
//!
//! Errors are keyed by field name so callers can route them to inputs.

pub mod rules;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, sync::Arc};

use crate::content::{ContentType, StepDescriptor};
use crate::fields::{is_reserved, Fields};

use rules::field_specs;

// ─────────────────────────────────────────────────────────────────────────────
// Time source
// ─────────────────────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Useful for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Report types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered field errors; order follows the rule tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    /// Message for a field, if it failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_messages(self) -> Vec<String> {
        self.errors.into_iter().map(|e| e.message).collect()
    }

    fn push(&mut self, err: FieldError) {
        // one message per field
        if self.get(&err.field).is_none() {
            self.errors.push(err);
        }
    }
}

impl From<Vec<FieldError>> for ValidationReport {
    fn from(errors: Vec<FieldError>) -> Self {
        let mut report = ValidationReport::default();
        for e in errors {
            report.push(e);
        }
        report
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pure checks (explicit `now`)
// ─────────────────────────────────────────────────────────────────────────────

pub fn validate_step_at(
    kind: ContentType,
    step: u8,
    data: &Fields,
    now: DateTime<Utc>,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Some(desc) = StepDescriptor::new(kind, step) else {
        report.push(FieldError::new(
            "step",
            format!("{kind} has no step {step} (1-{})", kind.max_steps()),
        ));
        return report;
    };
    for rule in desc.rules() {
        if let Some(err) = rule.check(data, now) {
            report.push(err);
        }
    }
    report
}

pub fn validate_all_at(kind: ContentType, data: &Fields, now: DateTime<Utc>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for desc in kind.steps() {
        for rule in desc.rules() {
            if let Some(err) = rule.check(data, now) {
                report.push(err);
            }
        }
    }
    report
}

/// Lenient check: every present key must belong to `kind` and fit its shape.
pub fn check_shape(kind: ContentType, data: &Fields) -> ValidationReport {
    let specs = field_specs(kind);
    let mut report = ValidationReport::default();
    for (key, value) in data {
        if is_reserved(key) {
            report.push(FieldError::new(key.as_str(), format!("{key} is managed by the system")));
            continue;
        }
        match specs.iter().find(|(name, _)| name == key) {
            Some((_, shape)) => {
                if let Some(err) = shape.check(key, value) {
                    report.push(err);
                }
            }
            None => report.push(FieldError::new(
                key.as_str(),
                format!("{key} is not a {kind} field"),
            )),
        }
    }
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Injectable validator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StepValidator {
    clock: Arc<dyn Clock>,
}

impl Default for StepValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl StepValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[tracing::instrument(skip_all, fields(kind = %kind, step = step))]
    pub fn validate_step(&self, kind: ContentType, step: u8, data: &Fields) -> ValidationReport {
        validate_step_at(kind, step, data, self.now())
    }

    #[tracing::instrument(skip_all, fields(kind = %kind))]
    pub fn validate_all(&self, kind: ContentType, data: &Fields) -> ValidationReport {
        validate_all_at(kind, data, self.now())
    }

    /// Like `validate_step` for an untyped content tag. An unknown tag
    /// yields a single `type` error.
    pub fn validate_tagged(&self, tag: &str, step: u8, data: &Fields) -> ValidationReport {
        match tag.parse::<ContentType>() {
            Ok(kind) => self.validate_step(kind, step, data),
            Err(err) => ValidationReport::from(vec![FieldError::new("type", err.to_string())]),
        }
    }

    pub fn check_shape(&self, kind: ContentType, data: &Fields) -> ValidationReport {
        check_shape(kind, data)
    }
}

// crates/domain/src/validate/rules.rs

//! Declarative rule tables per content kind and step, plus the field shapes
//! used by the lenient (autosave) check.

use chrono::{DateTime, Utc};
use serde_json::Value as Json;

use crate::content::ContentType;
use crate::date;
use crate::fields::Fields;

use super::FieldError;

pub const PROMOTION_TYPES: &[&str] = &["discount", "offer", "event"];
pub const PROMOTION_LOCATIONS: &[&str] = &["store", "online", "both"];

/// A single gate check on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text with at least one non-whitespace character.
    Text(&'static str),
    /// Required selector restricted to a fixed set of values.
    OneOf(&'static str, &'static [&'static str]),
    /// `{start, end}` object; both dates valid and `end` strictly after `start`.
    Period(&'static str),
    /// Date strictly after the validation time.
    FutureDate(&'static str),
    /// Array with at least one non-empty entry.
    NonEmptyList(&'static str),
}

impl Rule {
    pub fn field(&self) -> &'static str {
        match self {
            Rule::Text(f)
            | Rule::OneOf(f, _)
            | Rule::Period(f)
            | Rule::FutureDate(f)
            | Rule::NonEmptyList(f) => f,
        }
    }

    pub fn check(&self, data: &Fields, now: DateTime<Utc>) -> Option<FieldError> {
        let field = self.field();
        let value = data.get(field).filter(|v| !v.is_null());
        let label = label(field);

        match *self {
            Rule::Text(_) => match value.and_then(Json::as_str) {
                Some(s) if !s.trim().is_empty() => None,
                _ => Some(FieldError::new(field, format!("{label} is required"))),
            },
            Rule::OneOf(_, allowed) => match value.and_then(Json::as_str).map(str::trim) {
                None | Some("") => Some(FieldError::new(field, format!("{label} is required"))),
                Some(s) if allowed.contains(&s) => None,
                Some(_) => Some(FieldError::new(
                    field,
                    format!("{label} must be one of: {}", allowed.join(", ")),
                )),
            },
            Rule::Period(_) => {
                let Some(obj) = value.and_then(Json::as_object) else {
                    return Some(FieldError::new(field, format!("{label} is required")));
                };
                let start = obj.get("start").and_then(Json::as_str);
                let end = obj.get("end").and_then(Json::as_str);
                match (start, end) {
                    (Some(s), Some(e)) if !s.trim().is_empty() && !e.trim().is_empty() => {
                        match (date::parse(s), date::parse(e)) {
                            (Some(s), Some(e)) if e > s => None,
                            (Some(_), Some(_)) => Some(FieldError::new(
                                field,
                                format!("{label} end must be after its start"),
                            )),
                            _ => Some(FieldError::new(
                                field,
                                format!("{label} contains an invalid date"),
                            )),
                        }
                    }
                    _ => Some(FieldError::new(
                        field,
                        format!("{label} needs a start and an end date"),
                    )),
                }
            }
            Rule::FutureDate(_) => match value.and_then(Json::as_str).map(str::trim) {
                None | Some("") => Some(FieldError::new(field, format!("{label} is required"))),
                Some(s) => match date::parse(s) {
                    Some(d) if d > now => None,
                    Some(_) => Some(FieldError::new(
                        field,
                        format!("{label} must be in the future"),
                    )),
                    None => Some(FieldError::new(field, format!("{label} is not a valid date"))),
                },
            },
            Rule::NonEmptyList(_) => {
                let has_entry = value.and_then(Json::as_array).is_some_and(|items| {
                    items.iter().any(|item| match item {
                        Json::String(s) => !s.trim().is_empty(),
                        Json::Null => false,
                        _ => true,
                    })
                });
                if has_entry {
                    None
                } else {
                    Some(FieldError::new(
                        field,
                        format!("{label} needs at least one entry"),
                    ))
                }
            }
        }
    }
}

const PROMOTION_BASICS: &[Rule] = &[
    Rule::Text("title"),
    Rule::OneOf("promotionType", PROMOTION_TYPES),
    Rule::OneOf("location", PROMOTION_LOCATIONS),
    Rule::Period("validityPeriod"),
];
const JOB_BASICS: &[Rule] = &[
    Rule::Text("title"),
    Rule::Text("jobType"),
    Rule::Text("jobLocation"),
    Rule::FutureDate("applicationDeadline"),
];
const EVENT_BASICS: &[Rule] = &[
    Rule::Text("title"),
    Rule::Text("eventType"),
    Rule::Text("eventLocation"),
    Rule::FutureDate("eventDate"),
    Rule::Text("venue"),
];
const AUDIENCE: &[Rule] = &[Rule::NonEmptyList("targetAudience")];
const REQUIREMENTS: &[Rule] = &[Rule::NonEmptyList("requirements")];
const DESCRIPTION: &[Rule] = &[Rule::Text("description")];

/// Gate rules for one step. Steps 4 (media) and 5 (review) gate nothing.
pub fn for_step(kind: ContentType, step: u8) -> &'static [Rule] {
    match (kind, step) {
        (ContentType::Promotion, 1) => PROMOTION_BASICS,
        (ContentType::Job, 1) => JOB_BASICS,
        (ContentType::Event, 1) => EVENT_BASICS,
        (ContentType::Promotion | ContentType::Event, 2) => AUDIENCE,
        (ContentType::Job, 2) => REQUIREMENTS,
        (_, 3) => DESCRIPTION,
        _ => &[],
    }
}

/// Shape of a field value, checked leniently while a draft is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    Enum(&'static [&'static str]),
    Date,
    Period,
    TextList,
    Any,
}

pub type FieldSpec = (&'static str, Shape);

const PROMOTION_FIELDS: &[FieldSpec] = &[
    ("title", Shape::Text),
    ("promotionType", Shape::Enum(PROMOTION_TYPES)),
    ("location", Shape::Enum(PROMOTION_LOCATIONS)),
    ("validityPeriod", Shape::Period),
    ("targetAudience", Shape::TextList),
    ("description", Shape::Text),
    ("coverImage", Shape::Text),
];
const JOB_FIELDS: &[FieldSpec] = &[
    ("title", Shape::Text),
    ("jobType", Shape::Text),
    ("jobLocation", Shape::Text),
    ("requirements", Shape::TextList),
    ("applicationDeadline", Shape::Date),
    ("description", Shape::Text),
    ("salary", Shape::Any),
    ("benefits", Shape::Any),
    ("coverImage", Shape::Text),
];
const EVENT_FIELDS: &[FieldSpec] = &[
    ("title", Shape::Text),
    ("eventType", Shape::Text),
    ("eventLocation", Shape::Text),
    ("eventDate", Shape::Date),
    ("venue", Shape::Text),
    ("targetAudience", Shape::TextList),
    ("description", Shape::Text),
    ("speakers", Shape::Any),
    ("agenda", Shape::Any),
    ("coverImage", Shape::Text),
];

pub fn field_specs(kind: ContentType) -> &'static [FieldSpec] {
    match kind {
        ContentType::Promotion => PROMOTION_FIELDS,
        ContentType::Job => JOB_FIELDS,
        ContentType::Event => EVENT_FIELDS,
    }
}

impl Shape {
    /// `None` when `value` fits. `null` and empty strings always fit.
    pub fn check(&self, field: &str, value: &Json) -> Option<FieldError> {
        if value.is_null() {
            return None;
        }
        let label = label(field);
        let fits = match self {
            Shape::Any => true,
            Shape::Text => value.is_string(),
            Shape::Enum(allowed) => value
                .as_str()
                .map(str::trim)
                .is_some_and(|s| s.is_empty() || allowed.contains(&s)),
            Shape::Date => value.as_str().is_some_and(is_blank_or_date),
            Shape::Period => value.as_object().is_some_and(|obj| {
                obj.iter().all(|(k, v)| {
                    matches!(k.as_str(), "start" | "end")
                        && (v.is_null() || v.as_str().is_some_and(is_blank_or_date))
                })
            }),
            Shape::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Json::is_string)),
        };
        (!fits).then(|| FieldError::new(field, format!("{label} has an unexpected value")))
    }
}

fn is_blank_or_date(s: &str) -> bool {
    s.trim().is_empty() || date::parse(s).is_some()
}

/// `promotionType` → `Promotion type`.
pub fn label(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for (i, ch) in field.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            out.push(' ');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

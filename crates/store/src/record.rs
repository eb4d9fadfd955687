use chrono::{DateTime, Utc};
use domain::{ContentType, Fields, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque record id assigned by the store on first persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Payload for `ContentStore::create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub status: Status,
    pub step: u8,
    pub fields: Fields,
}

impl NewRecord {
    pub fn draft(user_id: impl Into<String>, kind: ContentType) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            status: Status::Draft,
            step: 1,
            fields: Fields::new(),
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
}

impl RecordPatch {
    pub fn fields(fields: Fields) -> Self {
        Self {
            fields: Some(fields),
            ..Self::default()
        }
    }

    pub fn with_step(mut self, step: u8) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_publish_date(mut self, at: DateTime<Utc>) -> Self {
        self.publish_date = Some(at);
        self
    }
}

/// A stored content record: the draft's fields flattened next to the
/// record-owned keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub status: Status,
    pub user_id: String,
    pub step: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl ContentRecord {
    pub fn from_new(id: ContentId, new: NewRecord, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: new.kind,
            status: new.status,
            user_id: new.user_id,
            step: new.step,
            publish_date: None,
            created_at: now,
            updated_at: now,
            fields: new.fields,
        }
    }

    /// Apply a partial update. Field keys are replaced one by one.
    pub fn apply(&mut self, patch: RecordPatch, now: DateTime<Utc>) {
        if let Some(fields) = patch.fields {
            for (k, v) in fields {
                self.fields.insert(k, v);
            }
        }
        if let Some(step) = patch.step {
            self.step = step;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(at) = patch.publish_date {
            self.publish_date = Some(at);
        }
        self.updated_at = now;
    }
}

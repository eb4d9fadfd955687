// crates/domain/src/fields.rs

//! Field data accumulated by the wizard.
//!
//! Fields are an ordered JSON object keyed by the names the form inputs use
//! (`title`, `validityPeriod`, `targetAudience`, ...). Steps contribute
//! partial objects which are deep-merged, never replaced.

use serde_json::{Map, Value as Json};

pub type Fields = Map<String, Json>;

/// Keys owned by the content record itself. Never valid as field keys.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "type",
    "status",
    "step",
    "userId",
    "createdAt",
    "updatedAt",
    "publishDate",
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Deep-merge `patch` into `into`.
///
/// Nested objects merge key by key; scalars and arrays are replaced.
/// Keys are never removed: an explicit `null` overwrites but keeps the key.
pub fn merge(into: &mut Fields, patch: Fields) {
    for (key, incoming) in patch {
        match (into.get_mut(&key), incoming) {
            (Some(Json::Object(existing)), Json::Object(nested)) => merge(existing, nested),
            (_, value) => {
                into.insert(key, value);
            }
        }
    }
}

/// Look up a dotted path, e.g. `validityPeriod.start`.
pub fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Json> {
    let mut parts = path.split('.');
    let mut cur = fields.get(parts.next()?)?;
    for part in parts {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// The top-level field a dotted path belongs to.
pub fn root_key(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

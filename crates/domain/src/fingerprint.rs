// crates/domain/src/fingerprint.rs

//! Stable content fingerprints used to skip redundant writes.
//!
//! The canonical form sorts keys and rewrites every date-like string as an
//! RFC 3339 UTC timestamp, so `2030-05-01` and `2030-05-01T00:00:00Z`
//! fingerprint the same.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::date;
use crate::fields::Fields;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(fields: &Fields) -> Self {
        let canonical = canonicalize(&Json::Object(fields.clone()));
        // serde_json::Map is a BTreeMap here, so key order is stable
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        Fingerprint(sha256_hex(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonicalize(value: &Json) -> Json {
    match value {
        Json::String(s) => match date::parse(s) {
            Some(dt) => Json::String(date::canonical(&dt)),
            None => Json::String(s.clone()),
        },
        Json::Array(items) => Json::Array(items.iter().map(canonicalize).collect()),
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

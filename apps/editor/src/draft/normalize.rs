use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{CvDraft, CvId};

/// Keys a server may use for the CV identifier, in order of preference.
const ID_KEYS: [&str; 3] = ["_id", "id", "insertedId"];

/// Coerces a possibly partial CV record into a complete draft.
///
/// - `basic` / `layout` that are missing or not objects fall back to defaults.
/// - List sections that are missing or not arrays become empty; entries that
///   are not objects are dropped.
/// - Unknown keys at any level are carried through.
///
/// Idempotent: normalizing the JSON of a normalized draft yields the same draft.
pub fn normalize(raw: &Value) -> CvDraft {
    let mut rest = match raw {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let id = take_id(&mut rest);
    let basic = take_record(&mut rest, "basic");
    let education = take_list(&mut rest, "education");
    let experience = take_list(&mut rest, "experience");
    let projects = take_list(&mut rest, "projects");
    let skills = take_list(&mut rest, "skills");
    let social = take_list(&mut rest, "social");
    let layout = take_record(&mut rest, "layout");
    let updated_at = take_timestamp(&mut rest, "updatedAt");

    CvDraft {
        id,
        basic,
        education,
        experience,
        projects,
        skills,
        social,
        layout,
        updated_at,
        extra: rest,
    }
}

impl<'de> Deserialize<'de> for CvDraft {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

fn take_id(map: &mut Map<String, Value>) -> Option<CvId> {
    let mut found = None;
    for key in ID_KEYS {
        if let Some(value) = map.remove(key) {
            if found.is_none() {
                found = id_from_value(&value);
            }
        }
    }
    found
}

fn id_from_value(value: &Value) -> Option<CvId> {
    match value {
        Value::String(s) => CvId::new(s.as_str()),
        Value::Number(n) => CvId::new(n.to_string()),
        // Extended JSON: {"$oid": "..."}
        Value::Object(obj) => obj.get("$oid").and_then(Value::as_str).and_then(CvId::new),
        _ => None,
    }
}

fn take_record<T: DeserializeOwned + Default>(map: &mut Map<String, Value>, key: &str) -> T {
    match map.remove(key) {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Discarding malformed `{key}` section: {e}");
            T::default()
        }),
        Some(Value::Null) | None => T::default(),
        Some(other) => {
            debug!("`{key}` is not an object ({other}); using defaults");
            T::default()
        }
    }
}

fn take_list<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Vec<T> {
    match map.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(_) => serde_json::from_value(item).ok(),
                other => {
                    debug!("Dropping non-object entry in `{key}`: {other}");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

// Unparseable timestamps stay in the pass-through map untouched.
fn take_timestamp(map: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let parsed = map
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))?;
    map.remove(key);
    Some(parsed)
}

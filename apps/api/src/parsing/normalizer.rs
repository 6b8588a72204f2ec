//! Response Normalizer: turns whatever the model replied into a
//! `CandidateRecord`.
//!
//! Normalization never fails. Strict JSON is tried first, then the outermost
//! `{...}` span (models like to wrap JSON in prose or code fences), and as a
//! last resort the whole reply becomes the introduction so the upload is not
//! lost. Identity fields (`candidate_id`, `created_at`) are never taken from
//! the model.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::candidate::{CandidateRecord, Education, Experience};

/// `created_at` is the candidate's creation time, carried through unchanged.
pub fn normalize(raw: &str, candidate_id: Uuid, created_at: DateTime<Utc>) -> CandidateRecord {
    let mut record = CandidateRecord::empty(candidate_id, created_at);

    let Some(object) = parse_object(raw) else {
        warn!(
            "Model reply for candidate {candidate_id} is not JSON ({} chars); keeping it as introduction",
            raw.len()
        );
        record.introduction = raw.to_string();
        return record;
    };

    for (key, value) in &object {
        match key.as_str() {
            "introduction" => record.introduction = scalar_string(value),
            "education" => record.education = education(value),
            "experience" => record.experience = experience(value),
            "skills" => record.skills = dedup_preserving_order(string_list(value)),
            "hobbies" => record.hobbies = string_list(value),
            "certifications" => record.certifications = string_list(value),
            "projects" => record.projects = string_list(value),
            other => debug!("Discarding unrecognized key '{other}' from model reply"),
        }
    }

    record
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return Some(map);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Coerces any JSON value into a single string.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Coerces a JSON value into a list of non-blank strings.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            let s = scalar_string(value);
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s]
            }
        }
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn member(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).map(scalar_string).unwrap_or_default()
}

fn education(value: &Value) -> Education {
    match value {
        Value::Object(object) => Education {
            degree: member(object, "degree"),
            institution: member(object, "institution"),
            field: member(object, "field"),
            year: member(object, "year"),
        },
        _ => Education::default(),
    }
}

fn experience(value: &Value) -> Experience {
    match value {
        Value::Object(object) => Experience {
            total_years: member(object, "total_years"),
            companies: member(object, "companies"),
            positions: member(object, "positions"),
        },
        _ => Experience::default(),
    }
}

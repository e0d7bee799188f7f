//! Lenient decoding of generation responses.
//!
//! The service answers with the artifact as a JSON object, as a string that
//! contains JSON, or as a string with the JSON inside a ```json fence.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::GeneratorError;
use crate::models::{Analysis, CoursePlan, Syllabus};
use crate::pipeline::ObjectiveMap;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());

static CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F-\x9F]").unwrap());

/// Remove a surrounding markdown code fence, if any.
pub fn strip_fence(text: &str) -> &str {
    match FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Undo the escaping the objectives endpoint applies to its JSON text.
pub fn clean_json_text(text: &str) -> String {
    let unescaped = text
        .replace("\\\"", "\"")
        .replace("\\n", " ")
        .replace("\\t", " ")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ");
    CONTROL.replace_all(&unescaped, "").into_owned()
}

/// Turn a response body into a JSON object, unwrapping string encodings.
fn unwrap_body(body: Value) -> Result<Value, GeneratorError> {
    match body {
        Value::Object(_) => Ok(body),
        Value::String(text) => {
            let inner = strip_fence(&text);
            let parsed: Value = serde_json::from_str(inner)
                .or_else(|_| serde_json::from_str(&clean_json_text(inner)))
                .map_err(|e| GeneratorError::Malformed(format!("embedded JSON: {e}")))?;
            match parsed {
                Value::Object(_) => Ok(parsed),
                Value::String(_) => unwrap_body(parsed),
                other => Err(GeneratorError::Malformed(format!(
                    "expected an object, got {}",
                    json_kind(&other)
                ))),
            }
        }
        other => Err(GeneratorError::Malformed(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn decode_json<T: DeserializeOwned>(body: Value) -> Result<T, GeneratorError> {
    let object = unwrap_body(body)?;
    serde_json::from_value(object).map_err(|e| GeneratorError::Malformed(e.to_string()))
}

pub fn decode_analysis(body: Value) -> Result<Analysis, GeneratorError> {
    let analysis: Analysis = decode_json(body)?;
    if analysis.main_topics.is_empty() {
        return Err(GeneratorError::Malformed("analysis lists no topics".into()));
    }
    Ok(analysis)
}

pub fn decode_syllabus(body: Value) -> Result<Syllabus, GeneratorError> {
    let syllabus: Syllabus = decode_json(body)?;
    if syllabus.is_empty() {
        return Err(GeneratorError::Malformed("syllabus has no content".into()));
    }
    Ok(syllabus)
}

pub fn decode_course_plan(body: Value) -> Result<CoursePlan, GeneratorError> {
    let plan: CoursePlan = decode_json(body)?;
    if plan.is_empty() {
        return Err(GeneratorError::Malformed("course plan has no lectures".into()));
    }
    Ok(plan)
}

/// Objectives per level. Non-string entries are skipped; a bare string
/// counts as a one-item list.
pub fn decode_objectives(body: Value) -> Result<ObjectiveMap, GeneratorError> {
    let object = unwrap_body(body)?;
    let Value::Object(map) = object else {
        return Err(GeneratorError::Malformed("expected an object".into()));
    };

    let mut objectives = ObjectiveMap::new();
    for (level, entries) in map {
        let items: Vec<String> = match entries {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => continue,
        };
        objectives.insert(level, items);
    }
    Ok(objectives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn syllabus_object() -> Value {
        json!({
            "CourseTitle": "Intro to Biology",
            "CourseDescription": "Cells and life",
            "LearningOutcomes": ["Describe a cell"],
            "CourseGoals": [],
            "CourseTopics": [{"Topic": "Cells", "Description": "Units"}],
            "Prerequisites": []
        })
    }

    #[test]
    fn decodes_object_body() {
        let syllabus = decode_syllabus(syllabus_object()).unwrap();
        assert_eq!(syllabus.course_title, "Intro to Biology");
    }

    #[test]
    fn decodes_string_encoded_body() {
        let body = Value::String(syllabus_object().to_string());
        assert_eq!(decode_syllabus(body).unwrap().course_topics[0].topic, "Cells");
    }

    #[test]
    fn decodes_fenced_body() {
        let body = Value::String(format!("```json\n{}\n```", syllabus_object()));
        assert_eq!(
            decode_syllabus(body).unwrap().learning_outcomes,
            vec!["Describe a cell"]
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert!(decode_syllabus(json!([1, 2])).unwrap_err().is_malformed());
        assert!(decode_syllabus(json!("not json at all")).unwrap_err().is_malformed());
        assert!(decode_syllabus(json!({})).unwrap_err().is_malformed());
        assert!(decode_course_plan(json!({"Plan": []})).unwrap_err().is_malformed());
    }

    #[test]
    fn analysis_needs_topics() {
        let ok = decode_analysis(json!({
            "Language": "English",
            "MainTopics": [{"Topic": "Cells", "Description": ""}],
            "Prompt": "internal"
        }))
        .unwrap();
        assert_eq!(ok.prompt.as_deref(), Some("internal"));
        assert!(decode_analysis(json!({"Language": "English", "MainTopics": []})).is_err());
    }

    #[test]
    fn strip_fence_leaves_plain_text() {
        assert_eq!(strip_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn clean_removes_escapes_and_controls() {
        let raw = "{\\\"Remembering\\\": [\\\"Name\\tparts\\\"]}\n\u{7}";
        assert_eq!(clean_json_text(raw), "{\"Remembering\": [\"Name parts\"]} ");
    }

    #[test]
    fn objectives_from_escaped_string() {
        let raw = "{\\\"Remembering\\\": [\\\"Name organelles\\\"],\\n \\\"Applying\\\": \\\"Use a microscope\\\"}";
        let map = decode_objectives(Value::String(raw.into())).unwrap();
        assert_eq!(map["Remembering"], vec!["Name organelles"]);
        assert_eq!(map["Applying"], vec!["Use a microscope"]);
    }

    #[test]
    fn objectives_skip_bad_entries() {
        let map = decode_objectives(json!({
            "Remembering": ["ok", 3, ""],
            "Understanding": null
        }))
        .unwrap();
        assert_eq!(map["Remembering"], vec!["ok"]);
        assert!(!map.contains_key("Understanding"));
    }
}

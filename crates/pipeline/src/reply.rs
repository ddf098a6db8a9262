//! Recovery of a JSON object from free-form model reply text.
//!
//! Models are asked for a bare JSON object but routinely wrap it in a fenced
//! code block or surround it with prose. [`extract_json_object`] is the single
//! place that copes with that; everything downstream sees a decoded map.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{AnalysisError, ReplyError};

/// Extracts the first JSON object embedded in `text`.
///
/// 1. Surrounding whitespace is trimmed and a leading ```` ``` ```` / ```` ```json ````
///    fence with its closing ```` ``` ```` is stripped.
/// 2. Balanced top-level `{...}` spans are located (braces inside JSON strings
///    are ignored) and tried in order; the first that decodes as an object wins.
///
/// Returns [`ReplyError::NoJsonObject`] when no span exists, or
/// [`ReplyError::Malformed`] with the decoder message of the first span when
/// none decodes.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ReplyError> {
    let body = strip_code_fence(text);
    let mut first_error = None;

    for span in object_spans(body) {
        match serde_json::from_str::<Map<String, Value>>(span) {
            Ok(object) => return Ok(object),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping brace span that is not a JSON object");
                first_error.get_or_insert_with(|| err.to_string());
            }
        }
    }

    Err(match first_error {
        Some(message) => ReplyError::Malformed { message },
        None => ReplyError::NoJsonObject,
    })
}

/// Extracts the reply object and decodes it into `T`.
///
/// Extraction failures become [`AnalysisError::Unparseable`] and shape mismatches
/// become [`AnalysisError::Shape`]; both carry the raw reply.
pub fn decode_reply<T: DeserializeOwned>(text: &str) -> Result<T, AnalysisError> {
    let object = extract_json_object(text).map_err(|source| AnalysisError::Unparseable {
        source,
        raw: text.to_string(),
    })?;

    serde_json::from_value(Value::Object(object)).map_err(|err| AnalysisError::Shape {
        reason: err.to_string(),
        raw: text.to_string(),
    })
}

/// Accepts a string, a number, or `null`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts a list of strings, a single string, or `null`. Models sometimes
/// answer "main concerns (if any)" with a sentence instead of a list.
pub(crate) fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    })
}

/// Accepts a number, a numeric string, or anything else (read as `None`).
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(number_from_value))
}

/// Accepts a map of label to number; entries whose value is not numeric are
/// dropped, as is anything that is not a map.
pub(crate) fn lenient_number_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Object(map)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(label, value)| number_from_value(&value).map(|n| (label, n)))
        .collect())
}

/// Reads a finite number from a JSON number or numeric string.
pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if depth > 0 && in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=idx]);
                }
            }
            '"' if depth > 0 => in_string = true,
            _ => {}
        }
    }

    spans
}

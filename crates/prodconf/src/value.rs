//! value bridge
//!
//! Documents are JSON ([serde_json::Value]); expressions are evaluated by [hcl::eval] which has its
//! own value model ([hcl::Value]). Both models have the same shape:
//! - null
//! - boolean (true/false)
//! - number (integer or decimal)
//! - string (utf-8)
//! - array
//! - object (order-preserving map with string keys)
//!
//! so conversion is lossless in both directions except for non-finite decimals, which JSON cannot
//! represent and which become `null`.
use serde_json::Value as Json;

pub fn to_hcl(value: &Json) -> hcl::Value {
    match value {
        Json::Null => hcl::Value::Null,
        Json::Bool(bool) => hcl::Value::Bool(*bool),
        Json::Number(num) => number_to_hcl(num),
        Json::String(s) => hcl::Value::String(s.clone()),
        Json::Array(array) => hcl::Value::Array(array.iter().map(to_hcl).collect()),
        Json::Object(object) => hcl::Value::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), to_hcl(value)))
                .collect(),
        ),
    }
}

fn number_to_hcl(num: &serde_json::Number) -> hcl::Value {
    if let Some(int) = num.as_i64() {
        return hcl::Value::Number(int.into());
    }
    if let Some(int) = num.as_u64() {
        return hcl::Value::Number(int.into());
    }

    num.as_f64()
        .and_then(hcl::Number::from_f64)
        .map_or(hcl::Value::Null, hcl::Value::Number)
}

pub fn to_json(value: &hcl::Value) -> Json {
    match value {
        hcl::Value::Null => Json::Null,
        hcl::Value::Bool(bool) => Json::Bool(*bool),
        hcl::Value::Number(num) => number_to_json(num),
        hcl::Value::String(s) => Json::String(s.clone()),
        hcl::Value::Array(array) => Json::Array(array.iter().map(to_json).collect()),
        hcl::Value::Object(object) => Json::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
    }
}

fn number_to_json(num: &hcl::Number) -> Json {
    if let Some(int) = num.as_i64() {
        return Json::from(int);
    }
    if let Some(int) = num.as_u64() {
        return Json::from(int);
    }

    num.as_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Json::Null, Json::Number)
}

/// Text that replaces an `[eval:...]` span
///
/// Returns `None` for `null`, which is how an expression reports an undefined result.
pub fn render(value: &hcl::Value) -> Option<String> {
    match value {
        hcl::Value::Null => None,
        hcl::Value::Bool(bool) => Some(bool.to_string()),
        hcl::Value::Number(num) => Some(num.to_string()),
        hcl::Value::String(s) => Some(s.clone()),
        hcl::Value::Array(_) | hcl::Value::Object(_) => serde_json::to_string(&to_json(value)).ok(),
    }
}

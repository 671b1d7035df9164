//! Typed accessors over loosely typed rows.
//!
//! Rows come either from the CSV parser (already coerced) or straight from a
//! JSON body, so every accessor accepts both the coerced and the textual form.

use serde_json::Value;
use uuid::Uuid;

use crate::import::{Row, RowError};

/// A field is present when it holds anything other than null or blank text.
pub fn present(row: &Row, key: &str) -> bool {
    match row.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Scalar field rendered as trimmed text. Arrays and objects yield `None`.
pub fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn required_text(row: &Row, key: &str) -> Result<String, RowError> {
    text(row, key).ok_or_else(|| RowError::Invalid(format!("{key} is required")))
}

/// Like [`required_text`], but only a JSON string is accepted. Numbers and
/// booleans are refused instead of being rendered back into text.
pub fn required_string(row: &Row, key: &str) -> Result<String, RowError> {
    match row.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(RowError::Invalid(format!("{key} is required")))
        }
        Some(_) => Err(RowError::Invalid(format!("{key} must be text"))),
    }
}

pub fn uuid(row: &Row, key: &str) -> Result<Option<Uuid>, RowError> {
    match text(row, key) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|_| RowError::Invalid(format!("{key} '{raw}' is not a valid UUID"))),
    }
}

pub fn number(row: &Row, key: &str) -> Result<Option<f64>, RowError> {
    let invalid = |raw: &dyn std::fmt::Display| {
        RowError::Invalid(format!("{key} '{raw}' is not a number"))
    };
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(s)),
        Some(other) => Err(invalid(other)),
    }
}

pub fn integer(row: &Row, key: &str) -> Result<Option<i32>, RowError> {
    let value = number(row, key)?;
    match value {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
            Ok(Some(v as i32))
        }
        Some(v) => Err(RowError::Invalid(format!("{key} '{v}' is not a whole number"))),
    }
}

pub fn boolean(row: &Row, key: &str) -> Result<Option<bool>, RowError> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(Some(true)),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(Some(false)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(RowError::Invalid(format!("{key} '{s}' is not a boolean"))),
        },
        Some(other) => Err(RowError::Invalid(format!("{key} '{other}' is not a boolean"))),
    }
}

/// List of strings from a JSON array, a JSON-looking string or a
/// semicolon-separated string.
pub fn string_list(row: &Row, key: &str) -> Result<Vec<String>, RowError> {
    fn from_array(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect()
    }

    match row.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(from_array(items)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Array(items)) => return Ok(from_array(&items)),
                    _ => {
                        return Err(RowError::Invalid(format!(
                            "{key} is not a valid JSON array"
                        )));
                    }
                }
            }
            Ok(trimmed
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect())
        }
        Some(other) => Ok(vec![other.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn presence_ignores_null_and_blank_text() {
        let r = row(json!({"a": null, "b": "  ", "c": 0, "d": false, "e": "x"}));
        assert!(!present(&r, "a"));
        assert!(!present(&r, "b"));
        assert!(present(&r, "c"));
        assert!(present(&r, "d"));
        assert!(present(&r, "e"));
        assert!(!present(&r, "missing"));
    }

    #[test]
    fn numeric_text_fields_are_rendered_back() {
        let r = row(json!({"name": 2024, "title": " Intro "}));
        assert_eq!(text(&r, "name").as_deref(), Some("2024"));
        assert_eq!(text(&r, "title").as_deref(), Some("Intro"));
    }

    #[test]
    fn required_strings_refuse_coerced_scalars() {
        let r = row(json!({"a": " 0012345678 ", "b": 12345678, "c": true, "d": ""}));
        assert_eq!(required_string(&r, "a").unwrap(), "0012345678");
        assert_eq!(
            required_string(&r, "b").unwrap_err().to_string(),
            "b must be text"
        );
        assert!(required_string(&r, "c").is_err());
        assert_eq!(
            required_string(&r, "d").unwrap_err().to_string(),
            "d is required"
        );
        assert!(required_string(&r, "missing").is_err());
    }

    #[test]
    fn integers_accept_strings_and_reject_fractions() {
        let r = row(json!({"a": "12", "b": 3.0, "c": 2.5, "d": "abc"}));
        assert_eq!(integer(&r, "a").unwrap(), Some(12));
        assert_eq!(integer(&r, "b").unwrap(), Some(3));
        assert!(integer(&r, "c").is_err());
        assert!(integer(&r, "d").is_err());
    }

    #[test]
    fn string_lists_come_from_arrays_or_separators() {
        let r = row(json!({
            "a": ["Rust", 2],
            "b": "one; two ;",
            "c": "[\"x\",\"y\"]",
            "d": "[broken"
        }));
        assert_eq!(string_list(&r, "a").unwrap(), vec!["Rust", "2"]);
        assert_eq!(string_list(&r, "b").unwrap(), vec!["one", "two"]);
        assert_eq!(string_list(&r, "c").unwrap(), vec!["x", "y"]);
        assert!(string_list(&r, "d").is_err());
        assert!(string_list(&r, "missing").unwrap().is_empty());
    }

    #[test]
    fn uuid_errors_name_the_field() {
        let r = row(json!({"course_id": "not-a-uuid"}));
        let err = uuid(&r, "course_id").unwrap_err();
        assert_eq!(err.to_string(), "course_id 'not-a-uuid' is not a valid UUID");
    }
}

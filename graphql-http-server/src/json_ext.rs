//! Performance oriented JSON manipulation.

use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Parses a JSON text which must be an object, or `null`.
///
/// `null` is returned as `Ok(None)`.
pub(crate) fn parse_object(text: &str) -> Result<Option<Object>, serde_json::Error> {
    match serde_json::from_str::<Value>(text)? {
        Value::Null => Ok(None),
        Value::Object(object) => Ok(Some(object)),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, found {}",
            value_kind(&other)
        ))),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn parse_object_accepts_objects_and_null() {
        let object = parse_object(r#"{"episode": "JEDI"}"#).unwrap().unwrap();
        assert_eq!(object.get("episode"), Some(&json!("JEDI")));
        assert!(parse_object("null").unwrap().is_none());
    }

    #[test]
    fn parse_object_rejects_other_values() {
        let err = parse_object("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, found an array"));
        assert!(parse_object("not-json").is_err());
    }
}

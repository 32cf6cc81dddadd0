// JSON/TOML/YAML helpers shared by the transcoders and the formatter.
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{ErrorKind, ParseError, Position, SerializeError};

/// Parses JSON text, reporting the line/column of the first error.
///
/// # Example
/// ```
/// use devkit_core::convert::json_utils::parse_json;
/// let value = parse_json("{\"id\":1}")?;
/// assert_eq!(value["id"], 1);
/// # Ok::<(), devkit_core::error::ParseError>(())
/// ```
pub fn parse_json(input: &str) -> Result<Value, ParseError> {
    serde_json::from_str(input).map_err(|err| {
        let position = Position {
            line: err.line(),
            column: err.column(),
        };
        // serde_json appends "at line X column Y"; keep the bare reason.
        let message = err.to_string();
        let message = message
            .rsplit_once(" at line ")
            .map(|(head, _)| head.to_string())
            .unwrap_or(message);
        ParseError::new(ErrorKind::InvalidJson, message).at(position)
    })
}

/// Encodes a JSON value. `indent == 0` produces the compact form, otherwise
/// nested levels are indented by `indent` spaces.
///
/// # Example
/// ```
/// use serde_json::json;
/// use devkit_core::convert::json_utils::encode_json;
/// assert_eq!(encode_json(&json!({"a":1}), 0)?, "{\"a\":1}");
/// assert_eq!(encode_json(&json!({"a":1}), 4)?, "{\n    \"a\": 1\n}");
/// # Ok::<(), devkit_core::error::SerializeError>(())
/// ```
pub fn encode_json(value: &Value, indent: usize) -> Result<String, SerializeError> {
    let to_err = |err: serde_json::Error| {
        SerializeError::new(ErrorKind::UnsupportedOperation, err.to_string())
    };
    if indent == 0 {
        return serde_json::to_string(value).map_err(to_err);
    }
    let pad = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(pad.as_bytes()));
    value.serialize(&mut ser).map_err(to_err)?;
    String::from_utf8(buf)
        .map_err(|err| SerializeError::new(ErrorKind::InvalidEncoding, err.to_string()))
}

/// Short name of a value's kind, used in error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a scalar as bare text; containers fall back to compact JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts a TOML value into JSON so other converters can reuse the same pipeline.
pub fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(Number::from(i)),
        toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let mut obj = Map::new();
            for (k, v) in table {
                obj.insert(k, toml_to_json(v));
            }
            Value::Object(obj)
        }
    }
}

/// Converts JSON into TOML. TOML has no null, so nulls become empty strings.
pub fn json_to_toml(value: &Value) -> Result<toml::Value, SerializeError> {
    match value {
        Value::Null => Ok(toml::Value::String(String::new())),
        Value::Bool(b) => Ok(toml::Value::Boolean(*b)),
        Value::Number(num) => {
            if let Some(i) = num.as_i64() {
                Ok(toml::Value::Integer(i))
            } else if let Some(f) = num.as_f64() {
                Ok(toml::Value::Float(f))
            } else {
                Err(SerializeError::new(
                    ErrorKind::UnsupportedOperation,
                    format!("number {num} does not fit a TOML integer"),
                ))
            }
        }
        Value::String(s) => Ok(toml::Value::String(s.clone())),
        Value::Array(arr) => arr
            .iter()
            .map(json_to_toml)
            .collect::<Result<Vec<_>, _>>()
            .map(toml::Value::Array),
        Value::Object(map) => {
            let mut table = toml::value::Table::new();
            for (k, v) in map {
                table.insert(k.clone(), json_to_toml(v)?);
            }
            Ok(toml::Value::Table(table))
        }
    }
}

pub fn parse_toml(input: &str) -> Result<Value, ParseError> {
    input
        .parse::<toml::Table>()
        .map(|table| toml_to_json(toml::Value::Table(table)))
        .map_err(|err| ParseError::new(ErrorKind::StructuralViolation, err.message().to_string()))
}

pub fn encode_toml(value: &Value) -> Result<String, SerializeError> {
    match json_to_toml(value)? {
        toml::Value::Table(table) => toml::to_string(&table)
            .map_err(|err| SerializeError::new(ErrorKind::UnsupportedOperation, err.to_string())),
        _ => Err(SerializeError::new(
            ErrorKind::StructuralViolation,
            format!("TOML documents must be tables, got {}", kind_name(value)),
        )),
    }
}

pub fn encode_yaml(value: &Value) -> Result<String, SerializeError> {
    serde_yaml::to_string(value)
        .map_err(|err| SerializeError::new(ErrorKind::UnsupportedOperation, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_json_reports_position() {
        let err = parse_json("{\n  \"a\": ,\n}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidJson);
        let pos = err.position.expect("position");
        assert_eq!(pos.line, 2);
        assert!(!err.message.contains("at line"));
    }

    #[test]
    fn parse_json_preserves_key_order() {
        let value = parse_json(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn encode_json_honours_indent_width() {
        let value = json!({"a": [1, 2]});
        assert_eq!(encode_json(&value, 0).unwrap(), r#"{"a":[1,2]}"#);
        assert_eq!(
            encode_json(&value, 2).unwrap(),
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn toml_round_trips_through_json() {
        let value = parse_toml("title = \"demo\"\n[owner]\nname = \"Ada\"\nage = 36\n").unwrap();
        assert_eq!(value, json!({"title": "demo", "owner": {"name": "Ada", "age": 36}}));
        let text = encode_toml(&value).unwrap();
        assert_eq!(parse_toml(&text).unwrap(), value);
    }

    #[test]
    fn toml_rejects_non_table_roots() {
        let err = encode_toml(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
    }

    #[test]
    fn yaml_output_lists_keys() {
        let yaml = encode_yaml(&json!({"name": "Ada", "tags": ["x"]})).unwrap();
        assert!(yaml.contains("name: Ada"));
        assert!(yaml.contains("- x"));
    }
}

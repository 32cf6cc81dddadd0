// Restricted YAML reader: one flat `key: value` pair per line.
//
// Nested mappings, sequences and block scalars are rejected with a
// StructuralViolation instead of being read partially.
use serde_json::{Map, Number, Value};

use crate::error::{ErrorKind, ParseError, Position};

pub fn parse_flat_yaml(input: &str) -> Result<Value, ParseError> {
    let mut map = Map::new();
    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let violation = |message: &str| {
            ParseError::new(ErrorKind::StructuralViolation, message).at(Position {
                line: line_no,
                column: 1,
            })
        };
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "---" {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            return Err(violation("nested YAML structures are not supported"));
        }
        if trimmed == "-" || trimmed.starts_with("- ") {
            return Err(violation("YAML sequences are not supported"));
        }
        let Some((key, value)) = split_pair(trimmed) else {
            return Err(violation("expected a `key: value` pair"));
        };
        let key = strip_quotes(key.trim());
        if key.is_empty() {
            return Err(violation("empty key"));
        }
        let value = value.trim();
        if value == "|" || value == ">" || value.starts_with('&') || value.starts_with('*') {
            return Err(violation("block scalars and anchors are not supported"));
        }
        if map.contains_key(key) {
            return Err(violation(&format!("duplicate key `{key}`")));
        }
        let value = scalar(value).map_err(|message| violation(message))?;
        map.insert(key.to_string(), value);
    }
    Ok(Value::Object(map))
}

// Splits on the first `:` that is followed by whitespace or ends the line,
// so `url: http://x` keeps the scheme.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    bytes.iter().enumerate().find_map(|(idx, byte)| {
        let ends_key = *byte == b':' && bytes.get(idx + 1).is_none_or(|next| next.is_ascii_whitespace());
        ends_key.then(|| (&line[..idx], &line[idx + 1..]))
    })
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// Body of a quoted scalar. After the closing quote only whitespace or a
// `# comment` may follow.
fn quoted_body(raw: &str) -> Result<&str, &'static str> {
    let mut chars = raw.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err("empty scalar");
    };
    let mut escaped = false;
    let close = chars.find_map(|(idx, ch)| {
        if escaped {
            escaped = false;
        } else if quote == '"' && ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(idx);
        }
        None
    });
    let Some(close) = close else {
        return Err("unterminated quoted scalar");
    };
    let rest = &raw[close + 1..];
    let comment = rest.trim_start();
    if comment.is_empty() || (comment.starts_with('#') && rest.len() > comment.len()) {
        Ok(&raw[1..close])
    } else {
        Err("unexpected text after quoted scalar")
    }
}

// Quoted values stay strings; bare values get YAML's core scalar types.
fn scalar(raw: &str) -> Result<Value, &'static str> {
    if raw.starts_with(['"', '\'']) {
        return quoted_body(raw).map(|body| Value::String(body.to_string()));
    }
    let bare = raw.split_once(" #").map_or(raw, |(head, _)| head).trim_end();
    let value = match bare {
        "" | "~" | "null" | "Null" | "NULL" => Value::Null,
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        other => {
            if let Ok(int) = other.parse::<i64>() {
                return Ok(Value::Number(Number::from(int)));
            }
            let looks_numeric = other
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
            match other.parse::<f64>().ok().filter(|_| looks_numeric).and_then(Number::from_f64) {
                Some(num) => Value::Number(num),
                None => Value::String(other.to_string()),
            }
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_pairs_become_a_mapping() {
        let value = parse_flat_yaml(
            "# service config\nname: \"demo app\"\nport: 8080\nratio: 0.5\ndebug: false\nurl: http://localhost:8080 # local\nempty:\nquoted: 'yes: really'\n",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "name": "demo app",
                "port": 8080,
                "ratio": 0.5,
                "debug": false,
                "url": "http://localhost:8080",
                "empty": null,
                "quoted": "yes: really"
            })
        );
    }

    #[test]
    fn key_order_is_preserved() {
        let value = parse_flat_yaml("b: 1\na: 2\n").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn nested_structures_are_reported_not_dropped() {
        let err = parse_flat_yaml("server:\n  port: 80\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
        assert_eq!(err.position.unwrap().line, 2);
        assert!(parse_flat_yaml("- a\n- b\n").is_err());
        assert!(parse_flat_yaml("just text\n").is_err());
    }

    #[test]
    fn quoted_values_may_carry_a_comment() {
        let value = parse_flat_yaml(
            "name: \"Ada\" # note\nnick: 'A # B'   # aside\npath: \"C:\\\\tmp\\\"x\"\n",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"name": "Ada", "nick": "A # B", "path": "C:\\\\tmp\\\"x"})
        );
    }

    #[test]
    fn text_after_a_closing_quote_is_rejected() {
        for bad in ["a: \"x\" y\n", "a: \"x\"# tight\n", "a: 'open\n"] {
            let err = parse_flat_yaml(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::StructuralViolation, "{bad}");
            assert_eq!(err.position.unwrap().line, 1);
        }
    }

    #[test]
    fn duplicate_keys_are_rejected_with_their_line() {
        let err = parse_flat_yaml("name: a\nport: 1\nname: b\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
        assert_eq!(err.position.unwrap().line, 3);
        assert!(err.message.contains("name"), "{}", err.message);
    }

    #[test]
    fn empty_document_is_an_empty_mapping() {
        assert_eq!(parse_flat_yaml("# nothing\n---\n").unwrap(), json!({}));
    }
}

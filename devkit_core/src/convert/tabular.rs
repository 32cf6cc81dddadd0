// CSV ⇄ array-of-objects conversion.
use std::collections::HashSet;

use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use serde_json::{Map, Value};

use crate::convert::json_utils::{kind_name, scalar_text};
use crate::convert::SerializeOptions;
use crate::error::{ErrorKind, ParseError, Position, SerializeError};

fn violation(message: impl Into<String>) -> ParseError {
    ParseError::new(ErrorKind::StructuralViolation, message)
}

/// Parses CSV into an array of objects keyed by the header row.
///
/// Blank lines are ignored. Short rows are padded with empty strings and extra
/// trailing cells are dropped.
pub fn parse_csv(input: &str, delimiter: u8) -> Result<Value, ParseError> {
    let lines: Vec<&str> = input.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(violation("CSV needs a header row and at least one data row"));
    }
    let joined = lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .delimiter(delimiter)
        .from_reader(joined.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut seen = HashSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(violation(format!("header {} is empty", idx + 1)));
        }
        if !seen.insert(header.as_str()) {
            return Err(violation(format!("duplicate header '{header}'")));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut row = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = record.get(idx).unwrap_or_default();
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        rows.push(Value::Object(row));
    }
    if rows.is_empty() {
        return Err(violation("CSV has no data rows"));
    }
    Ok(Value::Array(rows))
}

fn csv_error(err: csv::Error) -> ParseError {
    let position = err.position().map(|pos| Position {
        line: pos.line() as usize,
        column: 1,
    });
    let parsed = violation(err.to_string());
    match position {
        Some(pos) => parsed.at(pos),
        None => parsed,
    }
}

/// Writes a non-empty array of objects as CSV. The header row is the key set
/// of the first object; keys missing from later rows become empty cells.
pub fn encode_csv(value: &Value, options: &SerializeOptions) -> Result<String, SerializeError> {
    let rows = match value {
        Value::Array(items) if !items.is_empty() => items,
        other => {
            return Err(SerializeError::new(
                ErrorKind::StructuralViolation,
                format!("CSV output needs a non-empty array of objects, got {}", kind_name(other)),
            ))
        }
    };
    if !options.csv_delimiter.is_ascii() {
        return Err(SerializeError::new(
            ErrorKind::UnsupportedOperation,
            format!("delimiter '{}' is not ASCII", options.csv_delimiter),
        ));
    }
    let headers: Vec<String> = match &rows[0] {
        Value::Object(first) => first.keys().cloned().collect(),
        other => return Err(not_an_object(0, other)),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(options.csv_delimiter as u8)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&headers).map_err(write_error)?;
    for (idx, row) in rows.iter().enumerate() {
        let Value::Object(map) = row else {
            return Err(not_an_object(idx, row));
        };
        let cells: Vec<String> = headers
            .iter()
            .map(|header| map.get(header).map(scalar_text).unwrap_or_default())
            .collect();
        writer.write_record(&cells).map_err(write_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| SerializeError::new(ErrorKind::UnsupportedOperation, err.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| SerializeError::new(ErrorKind::InvalidEncoding, err.to_string()))?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn not_an_object(idx: usize, value: &Value) -> SerializeError {
    SerializeError::new(
        ErrorKind::StructuralViolation,
        format!("row {} is {}, expected an object", idx + 1, kind_name(value)),
    )
}

fn write_error(err: csv::Error) -> SerializeError {
    SerializeError::new(ErrorKind::UnsupportedOperation, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_row_keys_every_line() {
        let value = parse_csv("name, age\n\nAda,36\nAlan,41\n", b',').unwrap();
        assert_eq!(
            value,
            json!([{"name": "Ada", "age": "36"}, {"name": "Alan", "age": "41"}])
        );
    }

    #[test]
    fn quoted_cells_and_ragged_rows() {
        let value = parse_csv("a,b,c\n\"x, y\",2\n1,2,3,4", b',').unwrap();
        assert_eq!(
            value,
            json!([{"a": "x, y", "b": "2", "c": ""}, {"a": "1", "b": "2", "c": "3"}])
        );
    }

    #[test]
    fn header_only_is_a_structural_violation() {
        let err = parse_csv("name\n", b',').unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
        let err = parse_csv("\n  \nname\n\n", b',').unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
    }

    #[test]
    fn bad_headers_are_rejected() {
        assert_eq!(parse_csv("a,,b\n1,2,3", b',').unwrap_err().kind, ErrorKind::StructuralViolation);
        assert_eq!(parse_csv("a,a\n1,2", b',').unwrap_err().kind, ErrorKind::StructuralViolation);
    }

    #[test]
    fn encode_uses_first_row_keys() {
        let csv = encode_csv(&json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]), &SerializeOptions::default()).unwrap();
        assert_eq!(csv, "a,b\n1,2\n3,4");
    }

    #[test]
    fn encode_is_permissive_about_missing_keys_and_quotes_commas() {
        let csv = encode_csv(
            &json!([{"city": "Oslo, NO", "pop": 700000}, {"pop": null, "extra": true}]),
            &SerializeOptions::default(),
        )
        .unwrap();
        assert_eq!(csv, "city,pop\n\"Oslo, NO\",700000\n,");
    }

    #[test]
    fn encode_rejects_wrong_shapes() {
        let opts = SerializeOptions::default();
        assert_eq!(encode_csv(&json!([]), &opts).unwrap_err().kind, ErrorKind::StructuralViolation);
        assert_eq!(encode_csv(&json!({"a": 1}), &opts).unwrap_err().kind, ErrorKind::StructuralViolation);
        assert_eq!(encode_csv(&json!([{"a": 1}, 2]), &opts).unwrap_err().kind, ErrorKind::StructuralViolation);
    }
}

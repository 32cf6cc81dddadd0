// XML ⇄ generic value conversion.
//
// Attributes live under `@attributes`, mixed text under `#text`, repeated
// sibling tags collapse into arrays and text-only elements into strings.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::convert::json_utils::scalar_text;
use crate::convert::SerializeOptions;
use crate::error::{ErrorKind, ParseError, Position, SerializeError};

pub const ATTRIBUTES_KEY: &str = "@attributes";
pub const TEXT_KEY: &str = "#text";

/// Parses an XML document into `{ rootName: value }`.
pub fn parse_xml(input: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    loop {
        let offset = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(tag)) => {
                let el = XmlElement::from_tag(&tag).map_err(|msg| malformed(input, offset, msg))?;
                stack.push(el);
            }
            Ok(Event::Empty(tag)) => {
                let el = XmlElement::from_tag(&tag).map_err(|msg| malformed(input, offset, msg))?;
                attach(&mut stack, &mut root, el).map_err(|msg| malformed(input, offset, msg))?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| malformed(input, offset, "closing tag without opening tag".into()))?;
                attach(&mut stack, &mut root, el).map_err(|msg| malformed(input, offset, msg))?;
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|err| malformed(input, offset, err.to_string()))?;
                match stack.last_mut() {
                    Some(current) => current.push_text(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(malformed(input, offset, "text outside the root element".into()))
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(malformed(input, reader.buffer_position(), err.to_string())),
            _ => {}
        }
    }
    if let Some(open) = stack.last() {
        return Err(malformed(
            input,
            input.len(),
            format!("element <{}> is never closed", open.name),
        ));
    }
    let root = root.ok_or_else(|| ParseError::new(ErrorKind::MalformedMarkup, "document has no root element"))?;
    let mut doc = Map::new();
    let name = root.name.clone();
    doc.insert(name, root.into_value());
    Ok(Value::Object(doc))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(el);
            Ok(())
        }
        None if root.is_some() => Err(format!("second root element <{}>", el.name)),
        None => {
            *root = Some(el);
            Ok(())
        }
    }
}

fn malformed(input: &str, offset: usize, message: String) -> ParseError {
    ParseError::new(ErrorKind::MalformedMarkup, message).at(position_at(input, offset))
}

/// Converts a byte offset into a 1-based line/column.
pub(crate) fn position_at(input: &str, offset: usize) -> Position {
    let offset = offset.min(input.len());
    let before = input.as_bytes().get(..offset).unwrap_or_default();
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let column = match before.iter().rposition(|b| *b == b'\n') {
        Some(nl) => offset - nl,
        None => offset + 1,
    };
    Position { line, column }
}

#[derive(Debug, Clone)]
struct XmlElement {
    name: String,
    attributes: Map<String, Value>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_tag(tag: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Text runs split by child elements are joined with one space.
    fn push_text(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);
    }

    fn into_value(self) -> Value {
        let text = self.text.trim().to_string();
        if self.children.is_empty() && self.attributes.is_empty() {
            return Value::String(text);
        }
        let mut obj = Map::new();
        if !self.attributes.is_empty() {
            obj.insert(ATTRIBUTES_KEY.into(), Value::Object(self.attributes));
        }
        for child in self.children {
            let name = child.name.clone();
            let value = child.into_value();
            match obj.get_mut(&name) {
                None => {
                    obj.insert(name, value);
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        if !text.is_empty() {
            obj.insert(TEXT_KEY.into(), Value::String(text));
        }
        Value::Object(obj)
    }
}

/// Renders a value as an XML document. A single-key object names the root
/// element; anything else is wrapped in `options.xml_root`.
pub fn encode_xml(value: &Value, options: &SerializeOptions) -> Result<String, SerializeError> {
    let mut writer = XmlWriter {
        out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"),
        indent: options.indent,
    };
    let named_root = match value {
        Value::Object(map) if map.len() == 1 => map
            .iter()
            .next()
            .filter(|(key, _)| *key != ATTRIBUTES_KEY && *key != TEXT_KEY),
        _ => None,
    };
    match (named_root, value) {
        (Some((key, child)), _) => writer.element(key, child, 0)?,
        (None, Value::Array(items)) => {
            let mut wrapper = Map::new();
            wrapper.insert("item".into(), Value::Array(items.clone()));
            writer.element(&options.xml_root, &Value::Object(wrapper), 0)?;
        }
        (None, other) => writer.element(&options.xml_root, other, 0)?,
    }
    if options.indent > 0 {
        writer.out.push('\n');
    }
    Ok(writer.out)
}

struct XmlWriter {
    out: String,
    indent: usize,
}

impl XmlWriter {
    fn line(&mut self, depth: usize) {
        if self.indent > 0 {
            self.out.push('\n');
            self.out.push_str(&" ".repeat(self.indent * depth));
        }
    }

    fn element(&mut self, name: &str, value: &Value, depth: usize) -> Result<(), SerializeError> {
        check_name(name)?;
        match value {
            Value::Array(items) => {
                for item in items {
                    self.element(name, item, depth)?;
                }
            }
            Value::Object(map) => {
                let mut attrs = String::new();
                if let Some(found) = map.get(ATTRIBUTES_KEY) {
                    let Value::Object(found) = found else {
                        return Err(SerializeError::new(
                            ErrorKind::StructuralViolation,
                            format!("{ATTRIBUTES_KEY} of <{name}> must be an object"),
                        ));
                    };
                    for (key, attr) in found {
                        check_name(key)?;
                        attrs.push_str(&format!(" {key}=\"{}\"", escape_attr(&scalar_text(attr))));
                    }
                }
                let text = map.get(TEXT_KEY).map(scalar_text).unwrap_or_default();
                let children: Vec<(&String, &Value)> = map
                    .iter()
                    .filter(|(key, _)| *key != ATTRIBUTES_KEY && *key != TEXT_KEY)
                    .collect();
                self.line(depth);
                if children.is_empty() {
                    if text.is_empty() {
                        self.out.push_str(&format!("<{name}{attrs}/>"));
                    } else {
                        self.out
                            .push_str(&format!("<{name}{attrs}>{}</{name}>", escape_text(&text)));
                    }
                    return Ok(());
                }
                self.out.push_str(&format!("<{name}{attrs}>"));
                if !text.is_empty() {
                    self.line(depth + 1);
                    self.out.push_str(&escape_text(&text));
                }
                for (key, child) in children {
                    self.element(key, child, depth + 1)?;
                }
                self.line(depth);
                self.out.push_str(&format!("</{name}>"));
            }
            Value::Null => {
                self.line(depth);
                self.out.push_str(&format!("<{name}/>"));
            }
            scalar => {
                self.line(depth);
                self.out.push_str(&format!(
                    "<{name}>{}</{name}>",
                    escape_text(&scalar_text(scalar))
                ));
            }
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), SerializeError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(SerializeError::new(
            ErrorKind::StructuralViolation,
            format!("'{name}' is not a valid XML name"),
        ))
    }
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(input: &str) -> String {
    escape_text(input).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_repeats_and_text_follow_convention() {
        let value = parse_xml(
            r#"<?xml version="1.0"?>
            <library city="Oslo">
              <book id="1">Dune</book>
              <book id="2">Emma</book>
              <owner>Ada</owner>
              <note>mixed <b>bold</b></note>
            </library>"#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "library": {
                    "@attributes": {"city": "Oslo"},
                    "book": [
                        {"@attributes": {"id": "1"}, "#text": "Dune"},
                        {"@attributes": {"id": "2"}, "#text": "Emma"}
                    ],
                    "owner": "Ada",
                    "note": {"b": "bold", "#text": "mixed"}
                }
            })
        );
    }

    #[test]
    fn mixed_content_text_keeps_a_separator() {
        let value = parse_xml("<p>one <b>two</b> three</p>").unwrap();
        assert_eq!(value, json!({"p": {"b": "two", "#text": "one three"}}));
        let value = parse_xml("<p>a<br/>  <br/>b<![CDATA[c]]></p>").unwrap();
        assert_eq!(value["p"]["#text"], json!("a b c"));
    }

    #[test]
    fn self_closing_and_entities() {
        let value = parse_xml("<a><b/><c>x &amp; y</c><![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(value, json!({"a": {"b": "", "c": "x & y", "#text": "<raw>"}}));
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let err = parse_xml("<a><b></a></b>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedMarkup);
        assert!(err.position.is_some());
    }

    #[test]
    fn unclosed_and_empty_documents_are_malformed() {
        assert_eq!(parse_xml("<a><b>x</b>").unwrap_err().kind, ErrorKind::MalformedMarkup);
        assert_eq!(parse_xml("   ").unwrap_err().kind, ErrorKind::MalformedMarkup);
        assert_eq!(parse_xml("<a/><b/>").unwrap_err().kind, ErrorKind::MalformedMarkup);
    }

    #[test]
    fn encode_uses_single_key_as_root() {
        let value = json!({"user": {"@attributes": {"id": "7"}, "name": "Ada", "tag": ["a", "b"], "nick": null}});
        let xml = encode_xml(&value, &SerializeOptions::default()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<user id=\"7\">\n  <name>Ada</name>\n  <tag>a</tag>\n  <tag>b</tag>\n  <nick/>\n</user>\n"
        );
    }

    #[test]
    fn encode_wraps_other_values_in_root() {
        let options = SerializeOptions {
            indent: 0,
            ..SerializeOptions::default()
        };
        let xml = encode_xml(&json!({"a": 1, "b": "x<y"}), &options).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root><a>1</a><b>x&lt;y</b></root>"
        );
        let xml = encode_xml(&json!([1, 2]), &options).unwrap();
        assert!(xml.ends_with("<root><item>1</item><item>2</item></root>"));
    }

    #[test]
    fn encode_rejects_invalid_names() {
        let err = encode_xml(&json!({"a": {"1bad": 1}}), &SerializeOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralViolation);
    }

    #[test]
    fn xml_round_trips_through_value() {
        let source = "<root a=\"1\"><item>x</item><item>y</item><name>n</name></root>";
        let value = parse_xml(source).unwrap();
        let xml = encode_xml(&value, &SerializeOptions::default()).unwrap();
        assert_eq!(parse_xml(&xml).unwrap(), value);
    }

    #[test]
    fn position_counts_lines_and_columns() {
        assert_eq!(position_at("ab\ncd", 4), Position { line: 2, column: 2 });
        assert_eq!(position_at("abc", 0), Position { line: 1, column: 1 });
    }
}

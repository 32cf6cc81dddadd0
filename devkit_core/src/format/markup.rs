// Tag-stream renderer shared by the XML and HTML formatters.
//
// XML nodes come from quick-xml, so structure errors surface. HTML nodes come
// from a lenient scanner: unknown constructs degrade to text.
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::convert::xml::position_at;
use crate::error::{ErrorKind, ParseError};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

// Elements whose body is kept byte-for-byte.
const VERBATIM_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Open { name: String, tag: String },
    Close { name: String },
    /// Self-closing and void tags, declarations, doctypes, CDATA.
    Standalone(String),
    Comment(String),
    /// Collapsed text; the flags record whether the raw run started or ended
    /// with whitespace.
    Text {
        text: String,
        space_before: bool,
        space_after: bool,
    },
    Verbatim(String),
}

pub(crate) fn xml_nodes(input: &str) -> Result<Vec<Node>, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);
    let mut nodes = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut saw_element = false;
    loop {
        let start = tag_start(input, reader.buffer_position());
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => return Err(malformed(input, reader.buffer_position(), err.to_string())),
        };
        let end = reader.buffer_position();
        let raw = input.get(start..end).unwrap_or_default().trim();
        match event {
            Event::Start(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                saw_element = true;
                open.push(name.clone());
                nodes.push(Node::Open {
                    name,
                    tag: collapse_tag(raw),
                });
            }
            Event::End(tag) => {
                open.pop();
                nodes.push(Node::Close {
                    name: String::from_utf8_lossy(tag.name().as_ref()).into_owned(),
                });
            }
            Event::Empty(_) => {
                saw_element = true;
                nodes.push(Node::Standalone(collapse_tag(raw)));
            }
            Event::Text(text) => {
                let text = String::from_utf8_lossy(&text);
                let text = text.trim();
                if !text.is_empty() {
                    nodes.push(Node::Text {
                        text: text.to_string(),
                        space_before: false,
                        space_after: false,
                    });
                }
            }
            Event::CData(_) => nodes.push(Node::Standalone(raw.to_string())),
            Event::Comment(_) => nodes.push(Node::Comment(raw.to_string())),
            Event::Eof => break,
            _ => nodes.push(Node::Standalone(collapse_tag(raw))),
        }
    }
    if let Some(name) = open.last() {
        return Err(malformed(input, input.len(), format!("element <{name}> is never closed")));
    }
    if !saw_element {
        return Err(ParseError::new(
            ErrorKind::MalformedMarkup,
            "document has no root element",
        ));
    }
    Ok(nodes)
}

// A text event consumes the `<` of the tag after it.
fn tag_start(input: &str, offset: usize) -> usize {
    if offset > 0 && input.as_bytes().get(offset - 1) == Some(&b'<') {
        offset - 1
    } else {
        offset
    }
}

fn malformed(input: &str, offset: usize, message: String) -> ParseError {
    ParseError::new(ErrorKind::MalformedMarkup, message).at(position_at(input, offset))
}

pub(crate) fn html_nodes(input: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map_or(rest.len(), |idx| idx + 3);
            nodes.push(Node::Comment(rest[..end].to_string()));
            rest = &rest[end..];
            continue;
        }
        if let Some(len) = tag_length(rest) {
            let raw = &rest[..len];
            rest = &rest[len..];
            if let Some(closing) = raw.strip_prefix("</") {
                nodes.push(Node::Close {
                    name: tag_name(closing),
                });
                continue;
            }
            let tag = collapse_tag(raw);
            if raw.starts_with("<!") || raw.starts_with("<?") {
                nodes.push(Node::Standalone(tag));
                continue;
            }
            let name = tag_name(&raw[1..]);
            if raw.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str()) {
                nodes.push(Node::Standalone(tag));
                continue;
            }
            if VERBATIM_ELEMENTS.contains(&name.as_str()) {
                let body_len = rest
                    .to_ascii_lowercase()
                    .find(&format!("</{name}"))
                    .unwrap_or(rest.len());
                nodes.push(Node::Open { name, tag });
                if body_len > 0 {
                    nodes.push(Node::Verbatim(rest[..body_len].to_string()));
                }
                rest = &rest[body_len..];
                continue;
            }
            nodes.push(Node::Open { name, tag });
            continue;
        }
        let skip = rest.chars().next().map_or(1, char::len_utf8);
        let end = rest[skip..].find('<').map_or(rest.len(), |idx| idx + skip);
        let raw = &rest[..end];
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            nodes.push(Node::Text {
                text,
                space_before: raw.starts_with(char::is_whitespace),
                space_after: raw.ends_with(char::is_whitespace),
            });
        }
        rest = &rest[end..];
    }
    nodes
}

// Length of the tag at the start of `rest`, or None when `<` does not open
// a tag (e.g. `a < b`) or the tag never terminates.
fn tag_length(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices();
    if chars.next()?.1 != '<' {
        return None;
    }
    let (_, second) = chars.next()?;
    if !(second.is_ascii_alphabetic() || matches!(second, '/' | '!' | '?')) {
        return None;
    }
    let mut quote: Option<char> = None;
    for (idx, ch) in chars {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => return Some(idx + 1),
            None => {}
        }
    }
    None
}

fn tag_name(after_bracket: &str) -> String {
    after_bracket
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect::<String>()
        .to_ascii_lowercase()
}

// Collapses whitespace runs outside quoted attribute values and removes it
// next to the brackets and around `=`.
fn collapse_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    for ch in raw.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        let after_open = out.ends_with(|c| c == '<' || c == '=');
        if pending_space && !after_open && !matches!(ch, '>' | '/' | '=') {
            out.push(' ');
        }
        pending_space = false;
        if ch == '"' || ch == '\'' {
            quote = Some(ch);
        }
        out.push(ch);
    }
    out
}

/// One node per line, children indented one level deeper. An element whose
/// only child is text (or nothing) stays on a single line.
pub(crate) fn render(nodes: &[Node], indent: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut idx = 0;
    while idx < nodes.len() {
        let pad = " ".repeat(depth * indent);
        match &nodes[idx] {
            Node::Open { name, tag } => match (nodes.get(idx + 1), nodes.get(idx + 2)) {
                (Some(Node::Close { name: closing }), _) if closing == name => {
                    lines.push(format!("{pad}{tag}</{name}>"));
                    idx += 1;
                }
                (Some(Node::Text { text, .. }), Some(Node::Close { name: closing }))
                    if closing == name =>
                {
                    lines.push(format!("{pad}{tag}{text}</{name}>"));
                    idx += 2;
                }
                (Some(Node::Verbatim(body)), next) => match next {
                    Some(Node::Close { name: closing }) if closing == name => {
                        lines.push(format!("{pad}{tag}{body}</{name}>"));
                        idx += 2;
                    }
                    _ => {
                        lines.push(format!("{pad}{tag}{body}"));
                        idx += 1;
                    }
                },
                _ => {
                    lines.push(format!("{pad}{tag}"));
                    depth += 1;
                }
            },
            Node::Close { name } => {
                depth = depth.saturating_sub(1);
                lines.push(format!("{}</{name}>", " ".repeat(depth * indent)));
            }
            Node::Standalone(text) | Node::Comment(text) | Node::Text { text, .. } => {
                lines.push(format!("{pad}{text}"));
            }
            Node::Verbatim(body) => lines.push(body.clone()),
        }
        idx += 1;
    }
    lines.join("\n")
}

pub(crate) fn minify_xml(input: &str) -> String {
    static BETWEEN_TAGS: OnceLock<Regex> = OnceLock::new();
    let re = BETWEEN_TAGS.get_or_init(|| Regex::new(r">\s+<").expect("static pattern"));
    re.replace_all(input.trim(), "><").into_owned()
}

/// Whitespace between two tags is dropped. Whitespace touching text becomes
/// one space, so inline markup keeps its word breaks.
pub(crate) fn minify_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for node in html_nodes(input) {
        let markup = match node {
            Node::Comment(_) => continue,
            Node::Text {
                text,
                space_before,
                space_after,
            } => {
                if !out.is_empty() && (pending_space || space_before) {
                    out.push(' ');
                }
                out.push_str(&text);
                pending_space = space_after;
                continue;
            }
            Node::Open { tag, .. } => tag,
            Node::Close { name } => format!("</{name}>"),
            Node::Standalone(text) | Node::Verbatim(text) => text,
        };
        if pending_space {
            out.push(' ');
        }
        out.push_str(&markup);
        pending_space = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_renders_one_element_per_line() {
        let nodes = xml_nodes(r#"<?xml version="1.0"?><root><a  x = '1'>t</a><b/><c><d>1</d></c></root>"#).unwrap();
        assert_eq!(
            render(&nodes, 2),
            "<?xml version=\"1.0\"?>\n<root>\n  <a x='1'>t</a>\n  <b/>\n  <c>\n    <d>1</d>\n  </c>\n</root>"
        );
    }

    #[test]
    fn xml_structure_errors_are_malformed_markup() {
        for bad in ["<a><b></a>", "<a>", "", "just text"] {
            let err = xml_nodes(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedMarkup, "{bad}");
        }
    }

    #[test]
    fn xml_render_is_idempotent() {
        let src = "<list>\n<!-- items -->\n<item id=\"1\">first\n  line</item><item/><![CDATA[a < b]]></list>";
        let once = render(&xml_nodes(src).unwrap(), 4);
        let twice = render(&xml_nodes(&once).unwrap(), 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn xml_minify_drops_whitespace_between_tags() {
        assert_eq!(minify_xml("<a>\n  <b> x </b>\n</a>\n"), "<a><b> x </b></a>");
    }

    #[test]
    fn html_handles_void_and_verbatim_elements() {
        let src = "<!DOCTYPE html><html><body><br><p class=\"x\">Hello   <b>world</b></p><script>if (a < b) {\n  go();\n}</script></body></html>";
        let out = render(&html_nodes(src), 2);
        assert_eq!(
            out,
            "<!DOCTYPE html>\n<html>\n  <body>\n    <br>\n    <p class=\"x\">\n      Hello\n      <b>world</b>\n    </p>\n    <script>if (a < b) {\n  go();\n}</script>\n  </body>\n</html>"
        );
        assert_eq!(render(&html_nodes(&out), 2), out);
    }

    #[test]
    fn html_tolerates_stray_brackets_and_unclosed_tags() {
        let out = render(&html_nodes("<ul><li>a < b<li>c</ul>"), 2);
        assert_eq!(render(&html_nodes(&out), 2), out);
    }

    #[test]
    fn html_minify_removes_comments() {
        let out = minify_html("<div>\n  <!-- note -->\n  <p>Hi   there</p>\n</div>");
        assert_eq!(out, "<div><p>Hi there</p></div>");
        assert_eq!(minify_html(&out), out);
    }

    #[test]
    fn html_minify_keeps_spaces_around_inline_tags() {
        let src = "<p>Hello <b>world</b> again</p>";
        assert_eq!(minify_html(src), src);
        assert_eq!(
            minify_html("<p>\n  Hello\n  <b>world</b>\n  again\n</p>\n<p>x</p>"),
            "<p> Hello <b>world</b> again </p><p>x</p>"
        );
        assert_eq!(minify_html("<p>a<b>b</b>c</p>"), "<p>a<b>b</b>c</p>");
        assert_eq!(minify_html("one <!-- c --> two"), "one two");
    }
}

//! Pretty-printing and minification.
//!
//! JSON and XML go through a real parser, so malformed input is an error.
//! CSS goes through lightningcss with a scanning fallback. SQL and HTML are
//! handled by tokenizing heuristics that never fail.
//! Every heuristic formatter renders from a normalized token stream, which
//! makes `format(format(x)) == format(x)` hold for each of them.
use std::fmt;
use std::str::FromStr;

use crate::convert::json_utils::{encode_json, parse_json};
use crate::error::{ErrorKind, FormatError, ParseError};

mod css;
mod markup;
mod sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Json,
    Xml,
    Css,
    Sql,
    Html,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Css => "CSS",
            Self::Sql => "SQL",
            Self::Html => "HTML",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "css" => Ok(Self::Css),
            "sql" => Ok(Self::Sql),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(ParseError::new(
                ErrorKind::UnsupportedOperation,
                format!("no formatter for {s}"),
            )),
        }
    }
}

/// Pretty-prints `text` with `indent` spaces per nesting level.
///
/// # Examples
/// ```
/// use devkit_core::format::{format, Language};
/// let pretty = format(Language::Json, "{\"a\":1}", 2)?;
/// assert_eq!(pretty, "{\n  \"a\": 1\n}");
/// # Ok::<(), devkit_core::error::FormatError>(())
/// ```
pub fn format(language: Language, text: &str, indent: usize) -> Result<String, FormatError> {
    tracing::debug!(language = language.name(), indent, "format");
    match language {
        Language::Json => {
            let value = parse_json(text)?;
            Ok(encode_json(&value, indent)?)
        }
        Language::Xml => {
            let nodes = markup::xml_nodes(text)?;
            Ok(markup::render(&nodes, indent))
        }
        Language::Html => Ok(markup::render(&markup::html_nodes(text), indent)),
        Language::Css => Ok(css::pretty(text, indent)),
        Language::Sql => Ok(sql::pretty(&sql::tokenize(text), indent)),
    }
}

/// Strips insignificant whitespace (and comments for CSS, SQL and HTML).
/// Never fails: input the formatter would reject is compacted best-effort.
pub fn minify(language: Language, text: &str) -> String {
    tracing::debug!(language = language.name(), "minify");
    match language {
        Language::Json => minify_json(text),
        Language::Xml => markup::minify_xml(text),
        Language::Html => markup::minify_html(text),
        Language::Css => css::minify(text),
        Language::Sql => sql::minify(&sql::tokenize(text)),
    }
}

// Drops whitespace outside string literals.
fn minify_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch.is_whitespace() {
            continue;
        }
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    out
}

//! Structured-format transcoders.
//!
//! Every format is read into a [`GenericValue`] and written back out from
//! one, so any pair of formats converts through the same in-memory tree.
//! Readers are deliberately forgiving "developer snippet" parsers, not full
//! implementations of their standards.
//!
//! # Examples
//!
//! ```rust
//! use devkit_core::convert::{convert, Format, SerializeOptions};
//!
//! let csv = convert(Format::Json, Format::Csv, r#"[{"a":1,"b":2}]"#, &SerializeOptions::default())?;
//! assert_eq!(csv, "a,b\n1,2");
//! # Ok::<(), devkit_core::error::ConvertError>(())
//! ```
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ConvertError, ErrorKind, ParseError, SerializeError};

pub mod json_utils;
pub mod tabular;
pub mod xml;
pub mod yaml;

/// Format-agnostic tree shared by every parser, serializer and the differ.
/// Object keys keep their insertion order.
pub type GenericValue = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
    Csv,
    Yaml,
    Toml,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Csv => "CSV",
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ParseError::new(
                ErrorKind::UnsupportedOperation,
                format!("unsupported format {s}"),
            )),
        }
    }
}

/// Output settings for [`serialize`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SerializeOptions {
    /// Spaces per nesting level; 0 renders compact output (JSON, XML).
    pub indent: usize,
    /// Root element used when a value has no single top-level key.
    pub xml_root: String,
    pub csv_delimiter: char,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            xml_root: "root".into(),
            csv_delimiter: ',',
        }
    }
}

pub fn parse(format: Format, text: &str) -> Result<GenericValue, ParseError> {
    tracing::debug!(format = format.name(), len = text.len(), "parse");
    match format {
        Format::Json => json_utils::parse_json(text),
        Format::Xml => xml::parse_xml(text),
        Format::Csv => tabular::parse_csv(text, b','),
        Format::Yaml => yaml::parse_flat_yaml(text),
        Format::Toml => json_utils::parse_toml(text),
    }
}

pub fn serialize(
    format: Format,
    value: &GenericValue,
    options: &SerializeOptions,
) -> Result<String, SerializeError> {
    tracing::debug!(format = format.name(), "serialize");
    match format {
        Format::Json => json_utils::encode_json(value, options.indent),
        Format::Xml => xml::encode_xml(value, options),
        Format::Csv => tabular::encode_csv(value, options),
        Format::Yaml => json_utils::encode_yaml(value),
        Format::Toml => json_utils::encode_toml(value),
    }
}

/// Parses `text` as `from` and renders it as `to`. Identical formats return
/// the input untouched.
pub fn convert(
    from: Format,
    to: Format,
    text: &str,
    options: &SerializeOptions,
) -> Result<String, ConvertError> {
    if from == to {
        return Ok(text.to_string());
    }
    let value = parse(from, text)?;
    let out = serialize(to, &value, options)?;
    Ok(out)
}

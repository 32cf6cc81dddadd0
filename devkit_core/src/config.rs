//! Engine configuration.
//!
//! All options travel with each call; this struct only bundles them so a
//! host can load one JSON document and pass the relevant parts along.
use serde::Deserialize;

use crate::convert::json_utils::parse_json;
use crate::convert::SerializeOptions;
use crate::diff::DiffConfig;
use crate::error::{ErrorKind, ParseError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub serialize: SerializeOptions,
    pub diff: DiffConfig,
    /// Spaces per level used by the formatter when a call does not say.
    pub format_indent: usize,
    /// `EnvFilter` directives for [`crate::logging::init`].
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serialize: SerializeOptions::default(),
            diff: DiffConfig::default(),
            format_indent: 2,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config document. Missing fields keep their defaults;
    /// fields of the wrong type are a `StructuralViolation`.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let value = parse_json(text)?;
        serde_json::from_value(value)
            .map_err(|err| ParseError::new(ErrorKind::StructuralViolation, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::LineAlignment;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn nested_sections_override_defaults() {
        let config = EngineConfig::from_json(
            r#"{"formatIndent":4,"serialize":{"xmlRoot":"doc"},"diff":{"algorithm":"myers"},"logFilter":"debug"}"#,
        )
        .unwrap();
        assert_eq!(config.format_indent, 4);
        assert_eq!(config.serialize.xml_root, "doc");
        assert_eq!(config.serialize.indent, 2);
        assert_eq!(config.diff.algorithm, LineAlignment::Myers);
        assert_eq!(config.diff.context_lines, 3);
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn bad_documents_are_rejected() {
        assert_eq!(EngineConfig::from_json("{").unwrap_err().kind, ErrorKind::InvalidJson);
        assert_eq!(
            EngineConfig::from_json(r#"{"formatIndent":"wide"}"#).unwrap_err().kind,
            ErrorKind::StructuralViolation
        );
    }
}

//! Error taxonomy shared by every transform in the crate.
//!
//! Each module returns its own error type, but all of them classify failures
//! with the same [`ErrorKind`] so a host can match on the kind and render a
//! message without caring which tool produced it.
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Codec input is not a valid encoding (bad alphabet, padding, escapes).
    InvalidEncoding,
    /// Text that should be JSON does not parse.
    InvalidJson,
    /// XML/HTML markup is not well-formed (mismatched or unclosed tags).
    MalformedMarkup,
    /// Input parses but does not have the shape the operation needs.
    StructuralViolation,
    /// A token does not have three dot-separated segments.
    MalformedToken,
    /// The operation is not available for the requested inputs.
    UnsupportedOperation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidEncoding => "InvalidEncoding",
            Self::InvalidJson => "InvalidJson",
            Self::MalformedMarkup => "MalformedMarkup",
            Self::StructuralViolation => "StructuralViolation",
            Self::MalformedToken => "MalformedToken",
            Self::UnsupportedOperation => "UnsupportedOperation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line/column reported by a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// Failure of an encode/decode pair.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct CodecError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CodecError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidEncoding,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnsupportedOperation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Failure while reading structured text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<Position>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}: {} at {}", self.kind, self.message, pos),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Failure while rendering a value into a target format.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct SerializeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SerializeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Failure of a conversion: either side of parse-then-serialize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(err) => err.kind,
            Self::Serialize(err) => err.kind,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Parse(err) => err.position,
            Self::Serialize(_) => None,
        }
    }
}

/// Failure of a pretty-print pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl FormatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(err) => err.kind,
            Self::Serialize(err) => err.kind,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Parse(err) => err.position,
            Self::Serialize(_) => None,
        }
    }
}

/// Failure of the token inspector.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct TokenError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TokenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Failure of a diff over serialized inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("left input: {0}")]
    Left(ParseError),
    #[error("right input: {0}")]
    Right(ParseError),
    #[error("UnsupportedOperation: cannot diff {left} against {right}")]
    IncompatibleKinds {
        left: &'static str,
        right: &'static str,
    },
}

impl DiffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Left(err) | Self::Right(err) => err.kind,
            Self::IncompatibleKinds { .. } => ErrorKind::UnsupportedOperation,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Left(err) | Self::Right(err) => err.position,
            Self::IncompatibleKinds { .. } => None,
        }
    }
}

/// Failure of a digest, HMAC or key-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("UnsupportedOperation: {0}")]
    Unsupported(String),
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),
}

impl CryptoError {
    /// `KeyGeneration` maps to `StructuralViolation`: the generator only fails
    /// when the requested modulus or prime constraints cannot be met, which is
    /// a problem with the shape of the request. `KeyEncoding` maps to
    /// `InvalidEncoding` since the DER/PEM rendering of the key failed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Self::KeyGeneration(_) => ErrorKind::StructuralViolation,
            Self::KeyEncoding(_) => ErrorKind::InvalidEncoding,
        }
    }
}

/// `{ kind, message }` view of any engine error, as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

macro_rules! impl_report {
    (with position: $($ty:ty),* $(,)?) => {
        $(
            impl From<&$ty> for ErrorReport {
                fn from(err: &$ty) -> Self {
                    ErrorReport {
                        kind: err.kind(),
                        message: err.to_string(),
                        position: err.position(),
                    }
                }
            }
        )*
    };
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<&$ty> for ErrorReport {
                fn from(err: &$ty) -> Self {
                    ErrorReport {
                        kind: err.kind(),
                        message: err.to_string(),
                        position: None,
                    }
                }
            }
        )*
    };
}

impl_report!(CodecError, SerializeError, TokenError, CryptoError);
impl_report!(with position: ConvertError, FormatError, DiffError);

impl From<&ParseError> for ErrorReport {
    fn from(err: &ParseError) -> Self {
        ErrorReport {
            kind: err.kind,
            message: err.message.clone(),
            position: err.position,
        }
    }
}

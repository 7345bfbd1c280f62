//! Error types
//!
//! Two layers:
//! - `ParseError`: malformed input, carries an `ErrorKind` and a resolved position
//! - `Error`: what traversal returns, either a parse error or a failure raised
//!   by a caller-supplied handler
//!
//! API misuse (navigating a locked cursor, writing an attribute outside a
//! start-tag) is not represented here; those paths panic.

use crate::core::location::calc_location;
use std::sync::Arc;
use thiserror::Error;

/// Kind of malformed input detected by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unexpected content")]
    UnexpectedContent,
    #[error("unterminated string")]
    UnterminatedQStr,
    #[error("unterminated cdata")]
    UnterminatedCData,
    #[error("unsupported feature")]
    UnsupportedFeature,
    #[error("attribute name expected")]
    ExpectedAttrName,
    #[error("equals sign expected")]
    ExpectedEq,
    #[error("string expected")]
    ExpectedQStr,
    #[error("invalid xml declaration")]
    InvalidXmlDecl,
    #[error("mismatching tag")]
    MismatchingTag,
    #[error("missing root")]
    MissingRoot,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("invalid comment")]
    InvalidComment,
    #[error("unterminated processing instruction")]
    UnterminatedPi,
}

/// Malformed input error with resolved position
///
/// `line` and `column` are 0-based; the `Display` form is 1-based:
/// `xml parser [1:4]: mismatching tag`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("xml parser [{}:{}]: {kind}", .line + 1, .column + 1)]
pub struct ParseError {
    pub kind: ErrorKind,
    /// Byte offset within the original buffer
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Create an error at `offset` in `buf`, resolving line and column
    pub fn new(kind: ErrorKind, buf: &str, offset: usize) -> Self {
        let (line, column) = calc_location(buf, offset);
        ParseError {
            kind,
            offset,
            line,
            column,
        }
    }
}

/// Error returned by traversal entry points
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Raised by a caller callback; short-circuits traversal
    #[error("{0}")]
    Handler(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap any error raised inside a traversal callback
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Handler(Arc::new(err))
    }

    /// Handler error from a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Handler(Arc::new(HandlerMessage(message.into())))
    }

    /// The parse error, if this is one
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Handler(_) => None,
        }
    }

    /// Kind of the parse error, if this is one
    pub fn kind(&self) -> Option<ErrorKind> {
        self.as_parse().map(|e| e.kind)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct HandlerMessage(String);

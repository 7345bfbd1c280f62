//! XML token types
//!
//! A `Token` borrows every slice from the input buffer. Decoded text is only
//! produced on demand via `Token::decoded`.

use super::entities::decode;
use crate::error::ParseError;
use std::borrow::Cow;
use std::fmt;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Start of buffer, never returned by the tokenizer
    StartOfBuffer,
    /// End of buffer, only valid after the root element closed
    EndOfBuffer,
    /// Malformed input, see `Token::error`
    Error,
    /// XML declaration: <?xml version="1.0" encoding="UTF-8"?>
    XmlDecl,
    /// DOCTYPE declaration: <!DOCTYPE ...>
    DocTypeDecl,
    /// Element open tag name: <name
    Tag,
    /// End of the start-tag: >
    BeginContent,
    /// Empty element end: />
    CloseEmptyTag,
    /// Closing tag matching the innermost open element: </name>
    EndContent,
    /// Attribute: name="value" or name='value'
    Attrib,
    /// Character data
    SData,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    Pi,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::StartOfBuffer => "SOF",
            TokenKind::EndOfBuffer => "EOF",
            TokenKind::Error => "Error",
            TokenKind::XmlDecl => "XmlDecl",
            TokenKind::DocTypeDecl => "DocTypeDecl",
            TokenKind::Tag => "Tag",
            TokenKind::BeginContent => "BeginContent",
            TokenKind::CloseEmptyTag => "CloseEmptyTag",
            TokenKind::EndContent => "EndContent",
            TokenKind::Attrib => "Attrib",
            TokenKind::SData => "SData",
            TokenKind::CData => "CData",
            TokenKind::Comment => "Comment",
            TokenKind::Pi => "PI",
        };
        f.write_str(name)
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Tag, attribute, PI target, DOCTYPE or closing-tag name
    pub name: &'a str,
    /// Raw, un-decoded value: character data, CDATA, comment, PI content,
    /// attribute value, DOCTYPE body or declared encoding
    pub value: &'a str,
    /// Whitespace skipped before the token outside element content
    pub whitespace_prefix: &'a str,
    /// Exact source slice the token spans
    pub raw: &'a str,
    /// Byte offset where the token's significant text begins
    pub offset: usize,
    pub(crate) error: Option<ParseError>,
}

impl<'a> Token<'a> {
    /// Error carried by an `Error` token
    #[inline]
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    /// True for the terminal end-of-buffer token
    #[inline]
    pub fn is_done(&self) -> bool {
        self.kind == TokenKind::EndOfBuffer
    }

    /// Value with entity references expanded
    #[inline]
    pub fn decoded(&self) -> Cow<'a, str> {
        decode(self.value)
    }

    /// Convert an error token into its error
    pub fn into_result(self) -> Result<Token<'a>, ParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

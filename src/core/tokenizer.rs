//! XML Tokenizer - State machine for XML token extraction
//!
//! Produces one token per call over an immutable buffer:
//! - XML declaration, DOCTYPE (skipped as an opaque bracket-balanced span)
//! - Open-tag names, attributes, `>` and `/>`
//! - Character data, CDATA sections, comments, processing instructions
//! - Closing tags, checked against the stack of open element names
//!
//! States move Start -> Prolog -> Attributes <-> Content -> Epilog. Only
//! whitespace may follow the root element. Malformed input yields an
//! `Error` token carrying a positioned `ParseError`.

use super::scanner::{is_whitespace, Scanner};
use super::token::{Token, TokenKind};
use crate::error::{ErrorKind, ParseError};
use memchr::memchr2;
use std::iter::FusedIterator;
use tracing::{debug, trace};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Current tokenizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Before anything was read; an XML declaration is allowed here
    Start,
    /// Before the root element
    Prolog,
    /// Inside a start-tag, after its name
    Attributes,
    /// Inside element content, whitespace is significant
    Content,
    /// After the root element closed
    Epilog,
}

/// Kind, name and value of a successfully lexed token
type Lexed<'a> = Result<(TokenKind, &'a str, &'a str), ErrorKind>;

/// XML tokenizer implementing a pull-parser pattern
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
    /// Names of the currently open elements, innermost last
    stack: Vec<&'a str>,
    seen_doctype: bool,
    /// Set once the iterator returned its last item
    done: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Start,
            stack: Vec::new(),
            seen_doctype: false,
            done: false,
        }
    }

    /// The buffer being tokenized
    #[inline]
    pub fn input(&self) -> &'a str {
        self.scanner.input()
    }

    /// Get the current parse state
    #[inline]
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Get the current position in the input
    #[inline]
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Number of currently open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Get the next token
    ///
    /// Never rewinds. After the root element closes and only whitespace
    /// remains, returns `EndOfBuffer`.
    pub fn next_token(&mut self) -> Token<'a> {
        let white_start = self.scanner.position();
        if self.state == ParseState::Start {
            self.scanner.skip_str(BOM);
        }
        // Whitespace is only significant inside element content
        if self.state != ParseState::Content {
            self.scanner.skip_whitespace();
        }
        let start = self.scanner.position();
        let at_eof = self.scanner.is_eof();

        let lexed = if at_eof {
            if self.state == ParseState::Epilog {
                Ok((TokenKind::EndOfBuffer, "", ""))
            } else {
                Err(ErrorKind::UnexpectedEof)
            }
        } else {
            self.lex()
        };

        match lexed {
            Ok((kind, name, value)) => Token {
                kind,
                name,
                value,
                whitespace_prefix: self.scanner.slice(white_start, start),
                raw: self.scanner.slice(start, self.scanner.position()),
                offset: start,
                error: None,
            },
            Err(kind) => self.make_error(kind, white_start, start, at_eof),
        }
    }

    fn make_error(&self, kind: ErrorKind, white_start: usize, start: usize, at_eof: bool) -> Token<'a> {
        let kind = if kind == ErrorKind::UnexpectedContent && (at_eof || self.scanner.is_eof()) {
            ErrorKind::UnexpectedEof
        } else {
            kind
        };
        debug!(?kind, offset = start, state = ?self.state, "xml tokenizer error");

        Token {
            kind: TokenKind::Error,
            name: "",
            value: "",
            whitespace_prefix: self.scanner.slice(white_start, start),
            raw: self.scanner.slice(start, self.scanner.position()),
            offset: start,
            error: Some(ParseError::new(kind, self.scanner.input(), start)),
        }
    }

    fn set_state(&mut self, state: ParseState) {
        if self.state != state {
            trace!(from = ?self.state, to = ?state, depth = self.stack.len(), "xml tokenizer state");
            self.state = state;
        }
    }

    /// State after an element closed
    #[inline]
    fn state_after_close(&self) -> ParseState {
        if self.stack.is_empty() {
            ParseState::Epilog
        } else {
            ParseState::Content
        }
    }

    fn lex(&mut self) -> Lexed<'a> {
        match self.state {
            ParseState::Attributes => return self.lex_attributes(),
            ParseState::Epilog => return Err(ErrorKind::UnexpectedContent),
            ParseState::Start => {
                self.set_state(ParseState::Prolog);
                if self.at_xml_decl() {
                    return self.lex_xml_decl();
                }
            }
            ParseState::Prolog | ParseState::Content => {}
        }

        if self.scanner.skip_str(b"<!--") {
            let comment = self.lex_comment()?;
            return Ok((TokenKind::Comment, "", comment));
        }
        if self.scanner.skip_str(b"<?") {
            return self.lex_pi();
        }

        match self.state {
            ParseState::Prolog => self.lex_prolog(),
            ParseState::Content => self.lex_content(),
            state => unreachable!("internal parser error: unexpected state {:?}", state),
        }
    }

    /// `<?xml` followed by whitespace; `<?xml-stylesheet` is an ordinary PI
    fn at_xml_decl(&self) -> bool {
        let rest = self.scanner.remaining();
        rest.starts_with(b"<?xml") && rest.get(5).is_some_and(|&b| is_whitespace(b))
    }

    /// Parse `<?xml [version="..."] encoding="..."?>`
    fn lex_xml_decl(&mut self) -> Lexed<'a> {
        self.scanner.advance(5);
        self.scanner.skip_whitespace();

        let (mut name, mut value) = self.read_attr_pair().map_err(|_| ErrorKind::InvalidXmlDecl)?;
        if name == "version" {
            // Version number itself is not checked
            self.scanner.skip_whitespace();
            (name, value) = self.read_attr_pair().map_err(|_| ErrorKind::InvalidXmlDecl)?;
        }
        if name != "encoding" {
            return Err(ErrorKind::InvalidXmlDecl);
        }

        self.scanner.skip_whitespace();
        if !self.scanner.skip_str(b"?>") {
            return Err(ErrorKind::InvalidXmlDecl);
        }
        Ok((TokenKind::XmlDecl, "", value))
    }

    fn lex_attributes(&mut self) -> Lexed<'a> {
        if self.scanner.skip_str(b"/>") {
            self.stack.pop();
            self.set_state(self.state_after_close());
            return Ok((TokenKind::CloseEmptyTag, "", ""));
        }
        if self.scanner.skip_byte(b'>') {
            self.set_state(ParseState::Content);
            return Ok((TokenKind::BeginContent, "", ""));
        }
        let (name, value) = self.read_attr_pair()?;
        Ok((TokenKind::Attrib, name, value))
    }

    fn lex_prolog(&mut self) -> Lexed<'a> {
        if !self.scanner.skip_byte(b'<') {
            return Err(ErrorKind::UnexpectedContent);
        }
        if self.scanner.skip_str(b"!DOCTYPE") {
            if self.seen_doctype {
                return Err(ErrorKind::UnexpectedContent);
            }
            self.seen_doctype = true;
            let (name, body) = self.lex_doctype()?;
            return Ok((TokenKind::DocTypeDecl, name, body));
        }
        // First element becomes the root
        self.open_tag()
    }

    fn lex_content(&mut self) -> Lexed<'a> {
        let start = self.scanner.position();
        let lt = self.scanner.find_byte(b'<').ok_or(ErrorKind::UnexpectedEof)?;
        if lt > start {
            self.scanner.set_position(lt);
            return Ok((TokenKind::SData, "", self.scanner.slice(start, lt)));
        }

        self.scanner.advance(1); // Skip '<'
        if self.scanner.skip_str(b"![CDATA[") {
            let content_start = self.scanner.position();
            let end = self.scanner.find_str(b"]]>").ok_or(ErrorKind::UnterminatedCData)?;
            self.scanner.set_position(end + 3);
            return Ok((TokenKind::CData, "", self.scanner.slice(content_start, end)));
        }
        if self.scanner.peek() == Some(b'!') {
            // DOCTYPE or other declarations inside the root element
            return Err(ErrorKind::UnsupportedFeature);
        }
        if self.scanner.skip_byte(b'/') {
            return self.close_tag();
        }
        self.open_tag()
    }

    /// Read `name` after '<', push it and switch to attributes
    fn open_tag(&mut self) -> Lexed<'a> {
        let name = self.scanner.read_name();
        if name.is_empty() {
            return Err(ErrorKind::UnexpectedContent);
        }
        self.stack.push(name);
        self.set_state(ParseState::Attributes);
        Ok((TokenKind::Tag, name, ""))
    }

    /// Read `name>` after '</' and pop the matching element
    fn close_tag(&mut self) -> Lexed<'a> {
        let name = self.scanner.read_name();
        if name.is_empty() {
            return Err(ErrorKind::UnexpectedContent);
        }
        let open = self.stack.pop().ok_or(ErrorKind::MismatchingTag)?;
        if open != name {
            return Err(ErrorKind::MismatchingTag);
        }
        self.scanner.skip_whitespace();
        if !self.scanner.skip_byte(b'>') {
            return Err(ErrorKind::UnexpectedContent);
        }
        self.set_state(self.state_after_close());
        Ok((TokenKind::EndContent, name, ""))
    }

    /// Read comment text after `<!--`; the text ends at the first `--`
    fn lex_comment(&mut self) -> Result<&'a str, ErrorKind> {
        let start = self.scanner.position();
        let dashes = self.scanner.find_str(b"--").ok_or(ErrorKind::UnterminatedComment)?;
        self.scanner.set_position(dashes + 2);
        if !self.scanner.skip_byte(b'>') {
            return Err(ErrorKind::InvalidComment);
        }
        Ok(self.scanner.slice(start, dashes))
    }

    /// Read `target content?>` after `<?`
    fn lex_pi(&mut self) -> Lexed<'a> {
        let name = self.scanner.read_name();
        if name.is_empty() {
            return Err(ErrorKind::UnexpectedContent);
        }
        self.scanner.skip_whitespace();
        let start = self.scanner.position();
        let end = self.scanner.find_str(b"?>").ok_or(ErrorKind::UnterminatedPi)?;
        self.scanner.set_position(end + 2);
        Ok((TokenKind::Pi, name, self.scanner.slice(start, end)))
    }

    /// Skip a DOCTYPE after `<!DOCTYPE`, returning its name and opaque body
    ///
    /// `<` opens a nesting level unless it starts a comment, `>` at level 0
    /// ends the declaration. Brackets inside quoted strings are ignored.
    fn lex_doctype(&mut self) -> Result<(&'a str, &'a str), ErrorKind> {
        if !self.scanner.skip_whitespace() {
            return Err(ErrorKind::UnexpectedContent);
        }
        let name = self.scanner.read_name();
        if name.is_empty() {
            return Err(ErrorKind::UnexpectedContent);
        }

        if self.scanner.skip_byte(b'>') {
            return Ok((name, ""));
        }
        if !self.scanner.skip_whitespace() {
            return Err(ErrorKind::UnexpectedContent);
        }

        let start = self.scanner.position();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        loop {
            let b = self.scanner.peek().ok_or(ErrorKind::UnexpectedEof)?;
            self.scanner.advance(1);

            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                continue;
            }
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' if depth == 0 => {
                    let end = self.scanner.position() - 1;
                    return Ok((name, self.scanner.slice(start, end)));
                }
                b'>' => depth -= 1,
                b'<' => {
                    if self.scanner.skip_str(b"!--") {
                        self.lex_comment()?;
                    } else {
                        depth += 1;
                    }
                }
                _ => {}
            }
        }
    }

    /// Read `name = "value"`, value left raw
    fn read_attr_pair(&mut self) -> Result<(&'a str, &'a str), ErrorKind> {
        let name = self.scanner.read_name();
        if name.is_empty() {
            return Err(ErrorKind::ExpectedAttrName);
        }
        self.scanner.skip_whitespace();
        if !self.scanner.skip_byte(b'=') {
            return Err(ErrorKind::ExpectedEq);
        }
        self.scanner.skip_whitespace();
        let value = self.read_quoted()?;
        Ok((name, value))
    }

    /// Read a single- or double-quoted string that stays on one line
    fn read_quoted(&mut self) -> Result<&'a str, ErrorKind> {
        let quote = match self.scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(ErrorKind::ExpectedQStr),
        };
        self.scanner.advance(1);

        let start = self.scanner.position();
        let end = self.scanner.find_byte(quote).ok_or(ErrorKind::UnterminatedQStr)?;
        let value = self.scanner.slice(start, end);
        if memchr2(b'\r', b'\n', value.as_bytes()).is_some() {
            return Err(ErrorKind::UnterminatedQStr);
        }
        self.scanner.set_position(end + 1);
        Ok(value)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    /// Yields tokens until end-of-buffer (not yielded) or the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        match token.kind {
            TokenKind::EndOfBuffer => {
                self.done = true;
                None
            }
            TokenKind::Error => {
                self.done = true;
                Some(token.into_result())
            }
            _ => Some(Ok(token)),
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}

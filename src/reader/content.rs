//! Pull Content Iterator
//!
//! A `Content` is a cursor over the sibling sequence inside one element, or
//! over the top level of the document. No tree is built:
//! - `advance()` focuses the next sibling, skipping an unhandled element first
//! - `handle_tag()` descends into the focused element through a callback
//! - `child_string_content()` reads `<tag>text</tag>` in one call
//!
//! While a callback handles a child body, the parent is locked. The borrow
//! checker already keeps the parent out of reach inside the callback; the
//! lock is what remains set if the callback unwinds, and any later
//! navigation on that parent panics.

use crate::core::attributes::{Attribute, AttributeList};
use crate::core::token::{Token, TokenKind};
use crate::core::tokenizer::{ParseState, Tokenizer};
use crate::error::{Error, ErrorKind, ParseError};
use std::borrow::Cow;
use tracing::{debug, trace};

/// Tokenizer owned by the root cursor or borrowed by a child cursor
#[derive(Debug)]
enum Source<'t, 'a> {
    Owned(Tokenizer<'a>),
    Borrowed(&'t mut Tokenizer<'a>),
}

impl<'a> Source<'_, 'a> {
    #[inline]
    fn get(&mut self) -> &mut Tokenizer<'a> {
        match self {
            Source::Owned(t) => t,
            Source::Borrowed(t) => &mut **t,
        }
    }

    #[inline]
    fn peek(&self) -> &Tokenizer<'a> {
        match self {
            Source::Owned(t) => t,
            Source::Borrowed(t) => &**t,
        }
    }
}

/// Cursor over one sibling sequence
#[derive(Debug)]
pub struct Content<'t, 'a> {
    tokenizer: Source<'t, 'a>,
    /// Focused token, if any
    token: Option<Token<'a>>,
    /// First failure, sticky
    error: Option<Error>,
    finished: bool,
    locked: bool,
}

/// Open a buffer and return the cursor over its top-level sequence
pub fn open(buf: &str) -> Content<'_, '_> {
    Content::new(Source::Owned(Tokenizer::new(buf)))
}

/// Run `f` on the top-level cursor of `buf`
///
/// After `f` returns, the rest of the document is still tokenized so that
/// malformed trailing input is reported. Returns the callback's error, or
/// the first parse error. A buffer that ends between prolog constructs,
/// before any element opened, fails with `MissingRoot`.
pub fn parse<'a, F>(buf: &'a str, f: F) -> Result<(), Error>
where
    F: FnOnce(&mut Content<'_, 'a>) -> Result<(), Error>,
{
    let mut root = open(buf);
    let result = f(&mut root);
    root.record(result)?;

    root.finish().map_err(|err| match err {
        // A construct cut off inside the prolog stays UnexpectedEof
        Error::Parse(e)
            if e.kind == ErrorKind::UnexpectedEof && e.offset == buf.len() && root.before_root() =>
        {
            Error::Parse(ParseError {
                kind: ErrorKind::MissingRoot,
                ..e
            })
        }
        err => err,
    })
}

/// Consume the rest of an element whose `Tag` token was just read
///
/// Reads attributes and the whole body, including nested elements, up to
/// the matching close. Stops at the first error.
pub fn skip_subtree(tokenizer: &mut Tokenizer<'_>) -> Result<(), ParseError> {
    let depth = tokenizer.depth();
    while tokenizer.depth() >= depth {
        let token = tokenizer.next_token().into_result()?;
        if token.is_done() {
            break;
        }
    }
    Ok(())
}

/// Read the attributes of the current start-tag
///
/// Returns them with the token that ended the start-tag.
fn collect_attributes<'a>(tokenizer: &mut Tokenizer<'a>) -> Result<(AttributeList<'a>, TokenKind), ParseError> {
    let mut attrs = AttributeList::new();
    loop {
        let token = tokenizer.next_token().into_result()?;
        match token.kind {
            TokenKind::Attrib => attrs.push(Attribute::from(&token)),
            TokenKind::CloseEmptyTag | TokenKind::BeginContent => return Ok((attrs, token.kind)),
            kind => unreachable!("xml reader: unexpected token {} in start-tag", kind),
        }
    }
}

impl<'t, 'a> Content<'t, 'a> {
    fn new(tokenizer: Source<'t, 'a>) -> Self {
        Content {
            tokenizer,
            token: None,
            error: None,
            finished: false,
            locked: false,
        }
    }

    #[inline]
    fn assert_unlocked(&self) {
        assert!(
            !self.locked,
            "xml reader: content is locked while a child element is being handled"
        );
    }

    /// True while the top-level cursor has not reached the root element
    fn before_root(&self) -> bool {
        matches!(self.tokenizer.peek().state(), ParseState::Start | ParseState::Prolog)
    }

    /// Store the first failure and pass the result through
    fn record(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        if let Err(err) = &result {
            if let Error::Handler(_) = err {
                debug!(error = %err, "xml handler failed");
            }
            if self.error.is_none() {
                self.error = Some(err.clone());
            }
        }
        result
    }

    /// Focus the next sibling
    ///
    /// Returns false at the end of this sequence, at end-of-buffer, or on
    /// error (see `error()`). An element focused by the previous call and
    /// never handled is skipped first.
    ///
    /// # Panics
    ///
    /// If the content is locked.
    pub fn advance(&mut self) -> bool {
        self.assert_unlocked();
        if self.finished || self.error.is_some() {
            return false;
        }

        if let Some(prev) = self.token.take() {
            if prev.kind == TokenKind::Tag {
                trace!(name = prev.name, "skipping unhandled element");
                if let Err(err) = skip_subtree(self.tokenizer.get()) {
                    self.error = Some(err.into());
                    return false;
                }
            }
        }

        let token = self.tokenizer.get().next_token();
        match token.kind {
            TokenKind::XmlDecl
            | TokenKind::DocTypeDecl
            | TokenKind::Tag
            | TokenKind::SData
            | TokenKind::CData
            | TokenKind::Comment
            | TokenKind::Pi => {
                self.token = Some(token);
                true
            }
            TokenKind::EndContent | TokenKind::EndOfBuffer => {
                self.finished = true;
                false
            }
            TokenKind::Error => {
                if let Err(err) = token.into_result() {
                    self.error = Some(err.into());
                }
                false
            }
            kind => unreachable!("xml reader: unexpected token {} in content", kind),
        }
    }

    /// Advance until an element is focused
    pub fn advance_to_tag(&mut self) -> bool {
        while self.advance() {
            if self.is_tag() {
                return true;
            }
        }
        false
    }

    /// Descend into the focused element
    ///
    /// `f` receives the element's attributes and, unless the element is
    /// empty (`/>`), a cursor over its body. Whatever part of the body `f`
    /// leaves unread is skipped afterwards. Returns `f`'s error or the
    /// first parse error inside the element; either is also kept as this
    /// cursor's error. Does nothing if no element is focused.
    ///
    /// # Panics
    ///
    /// If the content is locked.
    pub fn handle_tag<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&AttributeList<'a>, Option<&mut Content<'_, 'a>>) -> Result<(), Error>,
    {
        self.assert_unlocked();
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if !self.is_tag() {
            return Ok(());
        }
        self.token = None;

        let (attrs, end) = match collect_attributes(self.tokenizer.get()) {
            Ok(collected) => collected,
            Err(err) => return self.record(Err(err.into())),
        };
        if end == TokenKind::CloseEmptyTag {
            let result = f(&attrs, None);
            return self.record(result);
        }

        self.locked = true;
        let result = {
            let mut child = Content::new(Source::Borrowed(self.tokenizer.get()));
            f(&attrs, Some(&mut child)).and_then(|()| {
                if !child.finished {
                    trace!("draining element body");
                }
                child.finish()
            })
        };
        self.locked = false;
        self.record(result)
    }

    /// Text of a focused `<tag>text</tag>` element
    ///
    /// Attributes are ignored. Returns the raw character data when the body
    /// is exactly one run of text. Any other body (empty, nested elements,
    /// comments, CDATA) is skipped and yields "".
    ///
    /// # Panics
    ///
    /// If the content is locked.
    pub fn child_string_content(&mut self) -> &'a str {
        self.assert_unlocked();
        if self.error.is_some() || !self.is_tag() {
            return "";
        }
        self.token = None;

        match read_string_body(self.tokenizer.get()) {
            Ok(text) => text,
            Err(err) => {
                self.error = Some(err.into());
                ""
            }
        }
    }

    /// Skip the rest of this sequence and return the first failure
    ///
    /// For a child cursor this reads up to the element's close tag; for the
    /// top-level cursor it reads to the end of the buffer.
    pub fn finish(&mut self) -> Result<(), Error> {
        while self.advance() {}
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Focused token
    #[inline]
    pub fn token(&self) -> Option<&Token<'a>> {
        self.token.as_ref()
    }

    /// Kind of the focused token
    #[inline]
    pub fn kind(&self) -> Option<TokenKind> {
        self.token.as_ref().map(|t| t.kind)
    }

    /// Name of the focused element or PI, "" if none
    #[inline]
    pub fn name(&self) -> &'a str {
        self.token.as_ref().map_or("", |t| t.name)
    }

    /// Raw value of the focused token, "" if none
    #[inline]
    pub fn value(&self) -> &'a str {
        self.token.as_ref().map_or("", |t| t.value)
    }

    /// Value of the focused token with entities decoded
    pub fn decoded(&self) -> Cow<'a, str> {
        self.token.as_ref().map_or(Cow::Borrowed(""), |t| t.decoded())
    }

    /// Skipped whitespace and the raw source of the focused token
    pub fn raw(&self) -> (&'a str, &'a str) {
        self.token.as_ref().map_or(("", ""), |t| (t.whitespace_prefix, t.raw))
    }

    #[inline]
    fn focused(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    pub fn is_xml_decl(&self) -> bool {
        self.focused(TokenKind::XmlDecl)
    }

    pub fn is_doctype(&self) -> bool {
        self.focused(TokenKind::DocTypeDecl)
    }

    pub fn is_tag(&self) -> bool {
        self.focused(TokenKind::Tag)
    }

    pub fn is_sdata(&self) -> bool {
        self.focused(TokenKind::SData)
    }

    pub fn is_cdata(&self) -> bool {
        self.focused(TokenKind::CData)
    }

    pub fn is_comment(&self) -> bool {
        self.focused(TokenKind::Comment)
    }

    pub fn is_pi(&self) -> bool {
        self.focused(TokenKind::Pi)
    }

    /// True once the sequence reached its end
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// First failure seen by this cursor
    #[inline]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

/// Read the body of an element whose `Tag` token was just read
fn read_string_body<'a>(tokenizer: &mut Tokenizer<'a>) -> Result<&'a str, ParseError> {
    let depth = tokenizer.depth();
    let (_, end) = collect_attributes(tokenizer)?;
    if end == TokenKind::CloseEmptyTag {
        return Ok("");
    }

    let first = tokenizer.next_token().into_result()?;
    if first.kind == TokenKind::SData {
        let second = tokenizer.next_token().into_result()?;
        if second.kind == TokenKind::EndContent {
            return Ok(first.value);
        }
    }

    // Not a plain text body, skip whatever is left of it
    while tokenizer.depth() >= depth {
        let token = tokenizer.next_token().into_result()?;
        if token.is_done() {
            break;
        }
    }
    Ok("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    /// Kinds and names of the top-level sequence inside the root element
    fn children(input: &str) -> Vec<(TokenKind, String)> {
        let mut out = Vec::new();
        let mut root = open(input);
        assert!(root.advance_to_tag());
        root.handle_tag(|_, content| {
            let content = content.unwrap();
            while content.advance() {
                out.push((content.kind().unwrap(), content.name().to_string()));
            }
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_top_level_sequence() {
        let mut root = open("<?xml version=\"1.0\" encoding=\"UTF-8\"?><!DOCTYPE r><!--c--><r/>");
        assert!(root.advance());
        assert!(root.is_xml_decl());
        assert_eq!(root.value(), "UTF-8");
        assert!(root.advance());
        assert!(root.is_doctype());
        assert!(root.advance());
        assert!(root.is_comment());
        assert!(root.advance());
        assert!(root.is_tag());
        assert_eq!(root.name(), "r");
        assert!(!root.advance());
        assert!(root.is_finished());
        assert!(root.error().is_none());
    }

    #[test]
    fn test_auto_skip_unhandled() {
        let kinds = children("<a><b><c>deep</c></b>tail<d/></a>");
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Tag, "b".to_string()),
                (TokenKind::SData, String::new()),
                (TokenKind::Tag, "d".to_string()),
            ]
        );
    }

    #[test]
    fn test_handle_empty_tag() {
        let mut root = open("<a x='1' y=\"2\"/>");
        assert!(root.advance_to_tag());
        let mut called = false;
        root.handle_tag(|attrs, content| {
            called = true;
            assert!(content.is_none());
            assert_eq!(attrs.len(), 2);
            assert_eq!(attrs.get("y").as_deref(), Some("2"));
            Ok(())
        })
        .unwrap();
        assert!(called);
        assert!(!root.advance());
        assert!(root.error().is_none());
    }

    #[test]
    fn test_unread_body_is_drained() {
        let mut root = open("<a><b><x/>text<!--c--></b><c/></a>");
        assert!(root.advance_to_tag());
        let mut names = Vec::new();
        root.handle_tag(|_, content| {
            let content = content.unwrap();
            while content.advance_to_tag() {
                names.push(content.name());
                // Enter b but read nothing
                content.handle_tag(|_, _| Ok(()))?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_focused_child_left_by_callback() {
        let mut root = open("<a><b><c/></b><d/></a>");
        assert!(root.advance_to_tag());
        let mut names = Vec::new();
        root.handle_tag(|_, content| {
            let content = content.unwrap();
            while content.advance_to_tag() {
                names.push(content.name());
                content.handle_tag(|_, inner| {
                    // Focus <c/> and return without handling it
                    if let Some(inner) = inner {
                        assert!(inner.advance_to_tag());
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(names, vec!["b", "d"]);
    }

    #[test]
    fn test_handler_error_is_sticky() {
        let mut root = open("<a><b/></a>");
        assert!(root.advance_to_tag());
        let err = root.handle_tag(|_, _| Err(Error::msg("stop"))).unwrap_err();
        assert_eq!(err.to_string(), "stop");
        assert!(!root.advance());
        assert_eq!(root.error().map(|e| e.to_string()).as_deref(), Some("stop"));
        assert!(!root.is_locked());
    }

    #[test]
    fn test_child_parse_error_reaches_parent() {
        let mut root = open("<a><b></c></a>");
        assert!(root.advance_to_tag());
        let err = root.handle_tag(|_, _| Ok(())).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MismatchingTag));
        assert_eq!(root.error().and_then(Error::kind), Some(ErrorKind::MismatchingTag));
    }

    #[test]
    fn test_child_string_content() {
        let mut root = open("<a><x>hi &amp; bye</x><y/><z></z><w>t<i/></w><v>t<!--c--></v><u>last</u></a>");
        assert!(root.advance_to_tag());
        let mut values = Vec::new();
        root.handle_tag(|_, content| {
            let content = content.unwrap();
            while content.advance_to_tag() {
                values.push((content.name(), content.child_string_content()));
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            values,
            vec![
                ("x", "hi &amp; bye"),
                ("y", ""),
                ("z", ""),
                ("w", ""),
                ("v", ""),
                ("u", "last"),
            ]
        );
    }

    #[test]
    fn test_child_string_content_without_tag() {
        let mut root = open("<!--c--><a>x</a>");
        assert!(root.advance());
        assert_eq!(root.child_string_content(), "");
        assert!(root.advance_to_tag());
        assert_eq!(root.child_string_content(), "x");
        assert!(!root.advance());
        assert!(root.error().is_none());
    }

    #[test]
    fn test_content_accessors() {
        let kinds = children("<a> t <![CDATA[c]]><!--m--><?p q?></a>");
        let kinds: Vec<_> = kinds.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::SData, TokenKind::CData, TokenKind::Comment, TokenKind::Pi]
        );

        let mut root = open("<a>&lt;</a>");
        assert!(root.advance_to_tag());
        root.handle_tag(|_, content| {
            let content = content.unwrap();
            assert!(content.advance());
            assert!(content.is_sdata());
            assert_eq!(content.value(), "&lt;");
            assert_eq!(content.decoded(), "<");
            assert_eq!(content.raw(), ("", "&lt;"));
            assert!(!content.advance());
            assert!(content.is_finished());
            assert_eq!(content.name(), "");
            assert!(content.token().is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_lock_survives_panic() {
        let mut root = open("<a><b/></a>");
        assert!(root.advance_to_tag());
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = root.handle_tag(|_, _| panic!("handler bug"));
        }));
        assert!(caught.is_err());
        assert!(root.is_locked());

        let caught = panic::catch_unwind(AssertUnwindSafe(|| root.advance()));
        assert!(caught.is_err());
    }

    #[test]
    fn test_skip_subtree() {
        let mut tok = Tokenizer::new("<a><b><c/>x</b>y</a>");
        tok.next_token();
        tok.next_token();
        let b = tok.next_token();
        assert_eq!(b.name, "b");
        skip_subtree(&mut tok).unwrap();
        assert_eq!(tok.next_token().value, "y");
    }

    #[test]
    fn test_skip_subtree_error() {
        let mut tok = Tokenizer::new("<a><b></c></a>");
        tok.next_token();
        let err = skip_subtree(&mut tok).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MismatchingTag);
    }

    #[test]
    fn test_parse_reports_trailing_errors() {
        let err = parse("<a/>junk", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedContent));
        assert!(parse("<a><b/></a>\n", |_| Ok(())).is_ok());
    }

    #[test]
    fn test_parse_missing_root() {
        let err = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- no root -->", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MissingRoot));
        assert_eq!(parse("", |_| Ok(())).unwrap_err().kind(), Some(ErrorKind::MissingRoot));
        assert_eq!(parse("<!-- c -->", |_| Ok(())).unwrap_err().kind(), Some(ErrorKind::MissingRoot));
        assert_eq!(
            parse("<a>", |_| Ok(())).unwrap_err().kind(),
            Some(ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_parse_truncated_prolog_is_unexpected_eof() {
        let err = parse("<!DOCTYPE a [ <x ]", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedEof));
        assert_eq!(err.to_string(), "xml parser [1:1]: unexpected end of file");
        assert_eq!(
            parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE a", |_| Ok(())).unwrap_err().kind(),
            Some(ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_parse_returns_handler_error() {
        let err = parse("<a/>", |root| {
            root.advance_to_tag();
            root.handle_tag(|_, _| Err(Error::msg("bad root")))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "bad root");
    }
}

//! XML Writer
//!
//! Streams well-formed XML into any `io::Write` sink, mirroring the reader's
//! grammar in reverse:
//! - A stack of open element names, closed in order by `close_tag`
//! - A pending start-tag stays open for attributes until content arrives
//! - Text and attribute values are escaped through the entity codec
//!
//! A tag name written as `+name` is indented: it starts on its own line at
//! its nesting level, and its close tag ends the line.
//!
//! Calls that would produce malformed output (an attribute outside a
//! start-tag, closing with no open tag) panic.

pub mod value;

pub use value::ToXml;

use crate::core::entities::encode;
use std::borrow::Cow;
use std::io::{self, Write};
use tracing::trace;

const BOM: &[u8] = b"\xEF\xBB\xBF";
const XML_DECL: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const TABS: &[u8] = b"\t\t\t\t\t\t\t\t";
const SPACES: &[u8] = b"                                ";

/// Indentation unit for `+name` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    /// One tab per level
    #[default]
    Tabs,
    /// The given number of spaces per level; 0 only breaks lines
    Spaces(usize),
}

/// Writer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterConfig {
    pub indent: Indent,
}

impl WriterConfig {
    pub fn tabs() -> Self {
        WriterConfig { indent: Indent::Tabs }
    }

    pub fn spaces(n: usize) -> Self {
        WriterConfig {
            indent: Indent::Spaces(n),
        }
    }
}

#[derive(Debug)]
struct OpenTag {
    name: String,
    indented: bool,
}

/// Streaming XML emitter
#[derive(Debug)]
pub struct Writer<W: Write> {
    sink: W,
    names: Vec<OpenTag>,
    /// Start-tag written up to its attributes, `>` still pending
    in_start_tag: bool,
    indent_level: usize,
    /// Level of the line ended by the last indented close tag;
    /// None right after a start-tag
    prev_line_level: Option<usize>,
    config: WriterConfig,
}

impl<W: Write> Writer<W> {
    /// Create a writer that indents with tabs
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, WriterConfig::default())
    }

    pub fn with_config(sink: W, config: WriterConfig) -> Self {
        Writer {
            sink,
            names: Vec::new(),
            in_start_tag: false,
            indent_level: 0,
            prev_line_level: Some(0),
            config,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Number of open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Get back the sink
    pub fn into_inner(self) -> W {
        self.sink
    }

    #[inline]
    fn put(&mut self, s: &str) -> io::Result<()> {
        self.sink.write_all(s.as_bytes())
    }

    fn put_indent(&mut self, level: usize) -> io::Result<()> {
        match self.config.indent {
            Indent::Tabs => write_repeated(&mut self.sink, TABS, level),
            Indent::Spaces(n) => write_repeated(&mut self.sink, SPACES, level * n),
        }
    }

    /// Write a UTF-8 byte order mark
    pub fn bom(&mut self) -> io::Result<()> {
        trace!("writing byte order mark");
        self.sink.write_all(BOM)
    }

    /// Write `<?xml version="1.0" encoding="UTF-8"?>` and a newline
    ///
    /// # Panics
    ///
    /// If an element is open.
    pub fn xml_decl(&mut self) -> io::Result<()> {
        assert!(self.names.is_empty(), "xml writer: invalid xml declaration placement");
        trace!("writing xml declaration");
        self.sink.write_all(XML_DECL)
    }

    /// Close a pending start-tag with `>`
    pub fn begin_content(&mut self) -> io::Result<()> {
        if self.in_start_tag {
            self.in_start_tag = false;
            self.put(">")?;
        }
        Ok(())
    }

    /// Open an element, `+name` for an indented one
    ///
    /// # Panics
    ///
    /// If the name is empty.
    pub fn open_tag(&mut self, name: &str) -> io::Result<()> {
        assert!(
            !name.is_empty() && name != "+",
            "xml writer: trying to write a tag with empty name"
        );
        let prev_level = self.prev_line_level;
        self.begin_content()?;

        let (name, indented) = match name.strip_prefix('+') {
            Some(bare) => (bare, true),
            None => (name, false),
        };
        self.names.push(OpenTag {
            name: name.to_owned(),
            indented,
        });

        if indented {
            self.indent_level += 1;
            match prev_level {
                // Continue the line the previous sibling's close tag started
                Some(prev) if prev <= self.indent_level => self.put_indent(self.indent_level - prev)?,
                _ => {
                    self.put("\n")?;
                    self.put_indent(self.indent_level)?;
                }
            }
        }

        self.put("<")?;
        self.put(name)?;
        self.in_start_tag = true;
        self.prev_line_level = None;
        Ok(())
    }

    /// Write ` name="value"` into the open start-tag
    ///
    /// # Panics
    ///
    /// If no start-tag is open.
    pub fn attribute<V: ToXml + ?Sized>(&mut self, name: &str, value: &V) -> io::Result<()> {
        assert!(
            self.in_start_tag,
            "xml writer: trying to write an attribute outside of an open tag"
        );
        self.put(" ")?;
        self.put(name)?;
        self.put("=\"")?;
        value.write_to(self)?;
        self.put("\"")
    }

    /// Write escaped character data
    pub fn text(&mut self, text: &str) -> io::Result<()> {
        self.value(text)
    }

    /// Write any `ToXml` value as content
    pub fn value<V: ToXml + ?Sized>(&mut self, value: &V) -> io::Result<()> {
        self.begin_content()?;
        value.write_to(self)
    }

    /// Write text escaped for where the writer stands
    ///
    /// Inside a start-tag this is attribute-value escaping, otherwise content
    /// escaping. `ToXml` implementations emit their text through here.
    pub fn write_escaped(&mut self, text: &str) -> io::Result<()> {
        let escaped = encode(text, self.in_start_tag);
        self.put(&escaped)
    }

    /// Write `<!--text-->`
    ///
    /// Runs of `-` in the text are collapsed to one, and a trailing `-` is
    /// followed by a space.
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        self.begin_content()?;
        self.put("<!--")?;
        self.put(&comment_body(text))?;
        self.put("-->")
    }

    /// Write `<![CDATA[text]]>`, splitting the section around any `]]>`
    pub fn cdata(&mut self, text: &str) -> io::Result<()> {
        self.begin_content()?;
        self.put("<![CDATA[")?;
        self.put(&text.replace("]]>", "]]]]><![CDATA[>"))?;
        self.put("]]>")
    }

    /// Write `<?target content?>`
    ///
    /// # Panics
    ///
    /// If the target is empty or the content contains `?>`.
    pub fn pi(&mut self, target: &str, content: &str) -> io::Result<()> {
        assert!(!target.is_empty(), "xml writer: processing instruction without target");
        assert!(
            !content.contains("?>"),
            "xml writer: processing instruction content contains ?>"
        );
        self.begin_content()?;
        self.put("<?")?;
        self.put(target)?;
        if !content.is_empty() {
            self.put(" ")?;
            self.put(content)?;
        }
        self.put("?>")
    }

    /// Close the innermost open element
    ///
    /// An element with nothing written after its attributes is closed as
    /// ` />`.
    ///
    /// # Panics
    ///
    /// If no element is open.
    pub fn close_tag(&mut self) -> io::Result<()> {
        let Some(tag) = self.names.pop() else {
            panic!("xml writer: tag stack underflow");
        };

        if self.in_start_tag {
            self.in_start_tag = false;
            self.put(" />")?;
        } else {
            self.put("</")?;
            self.put(&tag.name)?;
            self.put(">")?;
        }

        if tag.indented {
            self.indent_level -= 1;
            self.put("\n")?;
            self.put_indent(self.indent_level)?;
            self.prev_line_level = Some(self.indent_level);
        }
        Ok(())
    }

    /// Flush the sink
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Write `n` bytes taken from a run of identical bytes
fn write_repeated<W: Write>(sink: &mut W, run: &[u8], mut n: usize) -> io::Result<()> {
    while n > 0 {
        let chunk = n.min(run.len());
        sink.write_all(&run[..chunk])?;
        n -= chunk;
    }
    Ok(())
}

fn comment_body(text: &str) -> Cow<'_, str> {
    if !text.contains("--") && !text.ends_with('-') {
        return Cow::Borrowed(text);
    }

    let mut body = String::with_capacity(text.len() + 1);
    let mut prev_dash = false;
    for c in text.chars() {
        if c == '-' && prev_dash {
            continue;
        }
        prev_dash = c == '-';
        body.push(c);
    }
    if prev_dash {
        body.push(' ');
    }
    Cow::Owned(body)
}

//! pullxml - Streaming XML tokenizer, pull parser and writer
//!
//! Layers:
//! A: Tokenizer, one borrowed token per call (Tokenizer, parse_tokens)
//! B: Pull cursor over sibling sequences, descent by callback (open, parse)
//! C: Writer mirroring the same grammar (Writer, ToXml)
//!
//! No document tree is ever built. Tokens borrow from the input buffer and
//! entity references are only expanded on request.
//!
//! ```
//! use pullxml::{parse, Error};
//!
//! let mut title = String::new();
//! parse(r#"<book id="7"><title>Dune</title></book>"#, |root| {
//!     root.advance_to_tag();
//!     root.handle_tag(|attrs, content| {
//!         assert_eq!(attrs.get("id").as_deref(), Some("7"));
//!         if let Some(content) = content {
//!             while content.advance_to_tag() {
//!                 if content.name() == "title" {
//!                     title = content.child_string_content().to_string();
//!                 }
//!             }
//!         }
//!         Ok::<_, Error>(())
//!     })
//! })
//! .unwrap();
//! assert_eq!(title, "Dune");
//! ```

pub mod core;
pub mod error;
pub mod reader;
pub mod writer;

pub use crate::core::attributes::{Attribute, AttributeList};
pub use crate::core::entities::{decode, encode, encode_into};
pub use crate::core::location::calc_location;
pub use crate::core::token::{Token, TokenKind};
pub use crate::core::tokenizer::{ParseState, Tokenizer};
pub use error::{Error, ErrorKind, ParseError};
pub use reader::{open, parse, parse_tokens, skip_subtree, tokens, Content};
pub use writer::{Indent, ToXml, Writer, WriterConfig};

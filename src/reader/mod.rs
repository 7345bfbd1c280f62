//! XML Reader Module
//!
//! Provides two ways to read a document:
//! - Tokens: flat token stream over the whole buffer
//! - Content: pull cursor over sibling sequences, descending by callback

pub mod content;
pub mod tokens;

pub use content::{open, parse, skip_subtree, Content};
pub use tokens::{parse_tokens, tokens};

//! Flat token stream
//!
//! Every token in source order, with no structure on top. Useful for
//! dumping a document or for callers that keep their own element stack.

use crate::core::token::Token;
use crate::core::tokenizer::Tokenizer;
use crate::error::ParseError;
use std::ops::ControlFlow;

/// Call `on_token` for each token of `buf` until end-of-buffer
///
/// `on_token` returns `ControlFlow::Break(())` to stop early; that is not an
/// error. Error tokens are not passed to `on_token`, they end the stream
/// and are returned.
pub fn parse_tokens<'a, F>(buf: &'a str, mut on_token: F) -> Result<(), ParseError>
where
    F: FnMut(&Token<'a>) -> ControlFlow<()>,
{
    for token in Tokenizer::new(buf) {
        if on_token(&token?).is_break() {
            break;
        }
    }
    Ok(())
}

/// Iterator over the tokens of `buf`
#[inline]
pub fn tokens(buf: &str) -> Tokenizer<'_> {
    Tokenizer::new(buf)
}

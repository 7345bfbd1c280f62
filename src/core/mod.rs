//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: State machine for XML token extraction
//! - Token: Token kinds and borrowed token slices
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Attributes: Ordered attribute lists with lazy value decoding
//! - Location: Byte offset to line and column resolution

pub mod attributes;
pub mod entities;
pub mod location;
pub mod scanner;
pub mod token;
pub mod tokenizer;

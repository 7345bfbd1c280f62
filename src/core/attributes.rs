//! XML Attributes
//!
//! Attributes of one start-tag, collected from `Attrib` tokens in source
//! order. Values stay raw until asked for; duplicates are kept and the
//! first match wins on lookup.

use super::entities::decode;
use super::token::Token;
use memchr::memchr;
use std::borrow::Cow;

/// A single attribute of a start-tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value as written, entities not decoded
    pub raw_value: &'a str,
}

impl<'a> Attribute<'a> {
    /// Value with entity references expanded
    #[inline]
    pub fn value(&self) -> Cow<'a, str> {
        decode(self.raw_value)
    }

    /// Local name (after colon, if namespaced)
    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }
}

impl<'a> From<&Token<'a>> for Attribute<'a> {
    fn from(token: &Token<'a>) -> Self {
        Attribute {
            name: token.name,
            raw_value: token.value,
        }
    }
}

/// Split a name into prefix and local name at the colon
fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(colon_pos) => (Some(&name[..colon_pos]), &name[colon_pos + 1..]),
        None => (None, name),
    }
}

/// Ordered attributes of one element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList<'a> {
    attrs: Vec<Attribute<'a>>,
}

impl<'a> AttributeList<'a> {
    pub fn new() -> Self {
        AttributeList { attrs: Vec::new() }
    }

    /// Append an attribute, keeping source order
    #[inline]
    pub fn push(&mut self, attr: Attribute<'a>) {
        self.attrs.push(attr);
    }

    /// Decoded value of the first attribute named `name`
    pub fn get(&self, name: &str) -> Option<Cow<'a, str>> {
        self.get_raw(name).map(decode)
    }

    /// Undecoded value of the first attribute named `name`
    pub fn get_raw(&self, name: &str) -> Option<&'a str> {
        self.attrs.iter().find(|a| a.name == name).map(|a| a.raw_value)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get_raw(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute<'a>> {
        self.attrs.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl<'l, 'a> IntoIterator for &'l AttributeList<'a> {
    type Item = &'l Attribute<'a>;
    type IntoIter = std::slice::Iter<'l, Attribute<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

impl<'a> FromIterator<Attribute<'a>> for AttributeList<'a> {
    fn from_iter<I: IntoIterator<Item = Attribute<'a>>>(iter: I) -> Self {
        AttributeList {
            attrs: iter.into_iter().collect(),
        }
    }
}

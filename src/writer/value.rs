//! Values the writer can emit
//!
//! `ToXml` is resolved at compile time per type. Primitives and strings
//! write escaped text; collections write their elements back to back;
//! `None` writes nothing. A custom type may write whole elements through
//! the `Writer` it is given, as long as it is emitted as content.

use super::Writer;
use std::borrow::Cow;
use std::io::{self, Write};

/// A value that can be written as XML text or markup
pub trait ToXml {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()>;
}

impl ToXml for str {
    #[inline]
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        w.write_escaped(self)
    }
}

impl ToXml for String {
    #[inline]
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        w.write_escaped(self)
    }
}

impl ToXml for Cow<'_, str> {
    #[inline]
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        w.write_escaped(self)
    }
}

impl ToXml for bool {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        w.write_escaped(if *self { "true" } else { "false" })
    }
}

impl ToXml for char {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        let mut buf = [0u8; 4];
        w.write_escaped(self.encode_utf8(&mut buf))
    }
}

// Numbers never need escaping
macro_rules! impl_to_xml_display {
    ($($ty:ty),*) => {
        $(
            impl ToXml for $ty {
                fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
                    write!(w.sink, "{}", self)
                }
            }
        )*
    };
}

impl_to_xml_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: ToXml> ToXml for Option<T> {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        match self {
            Some(value) => value.write_to(w),
            None => Ok(()),
        }
    }
}

impl<T: ToXml> ToXml for [T] {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        for item in self {
            item.write_to(w)?;
        }
        Ok(())
    }
}

impl<T: ToXml> ToXml for Vec<T> {
    #[inline]
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        self.as_slice().write_to(w)
    }
}

impl<T: ToXml + ?Sized> ToXml for &T {
    #[inline]
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> io::Result<()> {
        (**self).write_to(w)
    }
}

//! XML Entity Decoding and Encoding
//!
//! Handles the predefined entities and character references:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Unknown or malformed references are kept verbatim. Uses Cow for zero-copy
//! when nothing needs rewriting.

use memchr::memchr2;
use std::borrow::Cow;

/// Largest code point a character reference may name
const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Decode raw text, expanding entity references
///
/// A literal CR or CRLF becomes a single LF. A CR produced by `&#13;` is kept.
/// Returns Borrowed if there is nothing to rewrite.
#[inline]
pub fn decode(input: &str) -> Cow<'_, str> {
    // Fast path: check for '&' and '\r' using SIMD
    if memchr2(b'&', b'\r', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_slow(input))
}

fn decode_slow(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(offset) = memchr2(b'&', b'\r', &bytes[pos..]) {
        let at = pos + offset;
        // Copy everything before the break
        result.push_str(&input[pos..at]);

        if bytes[at] == b'\r' {
            result.push('\n');
            pos = at + 1;
            if bytes.get(pos) == Some(&b'\n') {
                pos += 1;
            }
            continue;
        }

        match decode_reference(&input[at + 1..]) {
            Some((c, len)) => {
                result.push(c);
                pos = at + 1 + len;
            }
            None => {
                // Unknown or unterminated, keep the ampersand
                result.push('&');
                pos = at + 1;
            }
        }
    }

    result.push_str(&input[pos..]);
    result
}

/// Decode the reference following an '&'
///
/// Returns the character and the number of bytes consumed including ';'.
fn decode_reference(s: &str) -> Option<(char, usize)> {
    // A reference body never contains another '&'
    let end = memchr2(b';', b'&', s.as_bytes())?;
    if s.as_bytes()[end] != b';' {
        return None;
    }

    let c = match &s[..end] {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "apos" => '\'',
        "quot" => '"',
        body => decode_char_ref(body.strip_prefix('#')?)?,
    };
    Some((c, end + 1))
}

/// Decode the digits of a numeric character reference (after '#')
fn decode_char_ref(digits: &str) -> Option<char> {
    let (digits, radix) = match digits.strip_prefix('x') {
        Some(hex) => (hex, 16),
        None => (digits, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let codepoint = u32::from_str_radix(digits, radix).ok()?;
    if codepoint > MAX_CODEPOINT {
        return None;
    }
    // Surrogates are not chars; the reference stays verbatim
    char::from_u32(codepoint)
}

/// Escape text for XML output
///
/// `& < > ' "` always become named entities. In attribute context every
/// control character below space becomes `&#NN;`. In content context CR,
/// LF and CRLF are written as one LF and other control characters are
/// escaped numerically.
pub fn encode(input: &str, in_attribute: bool) -> Cow<'_, str> {
    // Fast path: check if any escaping needed
    if !input.bytes().any(|b| needs_escape(b, in_attribute)) {
        return Cow::Borrowed(input);
    }
    let mut result = String::with_capacity(input.len() + 16);
    encode_into(input, in_attribute, &mut result);
    Cow::Owned(result)
}

/// Escape text, appending to `out`
pub fn encode_into(input: &str, in_attribute: bool, out: &mut String) {
    let bytes = input.as_bytes();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if !needs_escape(b, in_attribute) {
            pos += 1;
            continue;
        }

        out.push_str(&input[start..pos]);
        pos += 1;
        match b {
            b'&' => out.push_str("&amp;"),
            b'<' => out.push_str("&lt;"),
            b'>' => out.push_str("&gt;"),
            b'\'' => out.push_str("&apos;"),
            b'"' => out.push_str("&quot;"),
            b'\r' if !in_attribute => {
                out.push('\n');
                if bytes.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
            }
            // Control characters, always two digits
            _ => {
                out.push_str("&#");
                out.push((b'0' + b / 10) as char);
                out.push((b'0' + b % 10) as char);
                out.push(';');
            }
        }
        start = pos;
    }

    out.push_str(&input[start..]);
}

#[inline]
fn needs_escape(b: u8, in_attribute: bool) -> bool {
    match b {
        b'&' | b'<' | b'>' | b'\'' | b'"' => true,
        b'\n' => in_attribute,
        _ => b < b' ',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_decode_table() {
        let cases = [
            ("", ""),
            ("abc", "abc"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&amp;", "&"),
            ("&apos;", "'"),
            ("&quot;", "\""),
            ("&unknown;", "&unknown;"),
            ("&lt", "&lt"),
            ("&#x20;", " "),
            ("&#32;", " "),
            ("&#00000000032;", " "),
            ("&#xffff;", "\u{ffff}"),
            ("&#x10ffff;", "\u{10ffff}"),
            ("&#x110000;", "&#x110000;"),
            ("abc &lt; def &gt; ghi", "abc < def > ghi"),
            ("abc &lt def &gt ghi", "abc &lt def &gt ghi"),
        ];
        for (input, want) in cases {
            assert_eq!(decode(input), want, "decoding {:?}", input);
        }
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(decode("ab\ncd"), "ab\ncd");
        assert_eq!(decode("ab\rcd"), "ab\ncd");
        assert_eq!(decode("ab\r\ncd"), "ab\ncd");
        assert_eq!(decode("ab\n\ncd"), "ab\n\ncd");
        assert_eq!(decode("ab&#13;\ncd"), "ab\r\ncd");
        assert_eq!(decode("ab&#13;&#xa;cd"), "ab\r\ncd");
    }

    #[test]
    fn test_malformed_references_verbatim() {
        assert_eq!(decode("&#;"), "&#;");
        assert_eq!(decode("&#x;"), "&#x;");
        assert_eq!(decode("&#+32;"), "&#+32;");
        assert_eq!(decode("&#X20;"), "&#X20;");
        assert_eq!(decode("&#xD800;"), "&#xD800;");
        assert_eq!(decode("&a&lt;"), "&a<");
        assert_eq!(decode("&;"), "&;");
    }

    #[test]
    fn test_unicode_reference() {
        assert_eq!(decode("&#x1F600;"), "😀");
    }

    #[test]
    fn test_encode_specials() {
        let result = encode("<hello> & \"world\" 'x'", false);
        assert_eq!(result, "&lt;hello&gt; &amp; &quot;world&quot; &apos;x&apos;");
    }

    #[test]
    fn test_encode_plain_is_borrowed() {
        assert!(matches!(encode("plain text\nline", false), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_content_line_endings() {
        assert_eq!(encode("a\r\nb\rc\nd", false), "a\nb\nc\nd");
        assert_eq!(encode("a\tb", false), "a&#09;b");
    }

    #[test]
    fn test_encode_attribute_controls() {
        assert_eq!(encode("a\r\nb\tc", true), "a&#13;&#10;b&#09;c");
    }

    #[test]
    fn test_round_trip_attribute() {
        let original = "x < y & \"q\"\r\n\tz";
        assert_eq!(decode(&encode(original, true)), original);
    }
}

//! Byte offset to (line, column) resolution for diagnostics

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Map a byte offset in `buf` to a 0-based (line, column)
///
/// A leading UTF-8 BOM is not counted. CR, LF and CRLF each end one line.
/// The column counts characters, not bytes. Offsets past the end clamp to
/// the end of the buffer.
pub fn calc_location(buf: &str, offset: usize) -> (usize, usize) {
    let bytes = buf.as_bytes();
    let offset = offset.min(bytes.len());
    let mut cur = if bytes.starts_with(BOM) { BOM.len() } else { 0 };
    let mut line = 0;
    let mut line_start = cur;

    while cur < offset {
        let b = bytes[cur];
        cur += 1;
        match b {
            b'\n' => {
                line += 1;
                line_start = cur;
            }
            b'\r' => {
                if cur < offset && bytes[cur] == b'\n' {
                    cur += 1;
                }
                line += 1;
                line_start = cur;
            }
            _ => {}
        }
    }

    let column = bytes[line_start.min(offset)..offset]
        .iter()
        .filter(|&&b| !is_continuation_byte(b))
        .count();
    (line, column)
}

#[inline]
fn is_continuation_byte(b: u8) -> bool {
    b & 0xC0 == 0x80
}

//! Supplies the one JSON-writer behavior plain `serde_json::to_vec` doesn't
//! give us: escaping every code unit outside `[0x20, 0x7E]` as `\uHHHH`, per
//! spec.md §4.5. `serde_json`'s default formatter only escapes `"`, `\`,
//! and ASCII control characters; multi-byte UTF-8 passes through verbatim.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;

#[derive(Default)]
struct AsciiEscapingFormatter;

impl Formatter for AsciiEscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // `fragment` never contains '"', '\\', or a control character —
        // serde_json's escaped-string writer already splits those out to
        // `write_char_escape` before calling here. Only plain ASCII and
        // multi-byte UTF-8 characters reach this function.
        for ch in fragment.chars() {
            if (0x20..=0x7E).contains(&(ch as u32)) {
                write!(writer, "{ch}")?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serializes `value` to compact JSON bytes with every non-ASCII-printable
/// code unit escaped as `\uHHHH`.
pub fn to_vec_ascii_escaped(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, AsciiEscapingFormatter::default());
    value.serialize(&mut ser).expect("serde_json::Value always serializes");
    buf
}

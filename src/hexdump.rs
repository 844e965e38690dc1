//! Byte-dump formatting for raw request bytes.
//!
//! A debugging aid, not protocol logic: when enabled in the configuration,
//! each framed request line is rendered in the classic hexdump layout and
//! emitted at debug level before resolution. Sixteen bytes per row, split
//! into two eight-byte groups, with an ASCII gutter where non-graphic bytes
//! print as `.`.

use std::fmt::Write;

/// Format `buf` as a hexdump, offsets starting at `offset`.
pub fn format_bytes(buf: &[u8], offset: usize) -> String {
    let mut out = String::new();

    for (i, row) in buf.chunks(16).enumerate() {
        let base = i * 16;
        write!(out, "{:08x}: ", base + offset).unwrap();

        for j in 0..16 {
            if j % 8 == 0 {
                out.push(' ');
            }
            match row.get(j) {
                Some(b) => write!(out, "{b:02x} ").unwrap(),
                None => out.push_str("   "), // space-fill short final row
            }
        }

        for (j, &b) in row.iter().enumerate() {
            if j % 8 == 0 {
                out.push(' ');
            }
            out.push(if b.is_ascii_graphic() { b as char } else { '.' });
        }

        out.push('\n');
    }

    out
}

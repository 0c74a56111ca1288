//! Hexadecimal views of a byte buffer.
//!
//! [`dump`] is the read-only offset/hex/ASCII listing. [`to_editable`] and
//! [`parse_editable`] form the strict round-trippable text encoding used when
//! a file has no structured view.

use thiserror::Error;

pub const BYTES_PER_ROW: usize = 16;
const HEX_COLUMN_WIDTH: usize = BYTES_PER_ROW * 3 - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("token {index} ({token:?}) must be exactly two hex digits")]
    InvalidToken { index: usize, token: String },
}

/// Offset, hex pairs and printable ASCII, sixteen bytes per row.
///
/// ```
/// let text = tagedit_core::hex::dump(b"Hello");
/// assert!(text.starts_with("00000000  48 65 6c 6c 6f"));
/// assert!(text.ends_with("  Hello"));
/// ```
pub fn dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(BYTES_PER_ROW) * 80);
    for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let hex_column = chunk
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (0x20..=0x7e).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        out.push_str(&format!(
            "{:08x}  {:<width$}  {}",
            row * BYTES_PER_ROW,
            hex_column,
            ascii,
            width = HEX_COLUMN_WIDTH
        ));
    }
    out
}

/// Space separated two-digit tokens with a line break after every sixteen.
pub fn to_editable(bytes: &[u8]) -> String {
    bytes
        .chunks(BYTES_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| hex::encode([*b]))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses editable hex text back into bytes.
///
/// Tokens are split on any whitespace and each must be exactly two hex
/// digits. A single bad token rejects the whole input.
pub fn parse_editable(text: &str) -> Result<Vec<u8>, HexError> {
    text.split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            let mut byte = [0u8; 1];
            if token.len() != 2 || hex::decode_to_slice(token, &mut byte).is_err() {
                return Err(HexError::InvalidToken {
                    index,
                    token: token.to_string(),
                });
            }
            Ok(byte[0])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_pads_short_rows() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let text = dump(&bytes);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            "00000000  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f  ................"
        );
        assert!(rows[1].starts_with("00000010  10 11 12 13 "));
        assert_eq!(rows[0].find("  ...."), rows[1].find("  ...."));
    }

    #[test]
    fn dump_of_empty_buffer_is_empty() {
        assert_eq!(dump(&[]), "");
        assert_eq!(to_editable(&[]), "");
    }

    #[test]
    fn ascii_column_covers_printable_range() {
        let text = dump(&[0x1f, b' ', b'~', 0x7f]);
        assert!(text.ends_with("  . ~."));
    }

    #[test]
    fn editable_breaks_lines_every_sixteen_tokens() {
        let bytes = vec![0xabu8; 33];
        let text = to_editable(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split(' ').count(), 16);
        assert_eq!(lines[2], "ab");
    }

    #[test]
    fn parse_accepts_any_whitespace_and_case() {
        assert_eq!(
            parse_editable(" 00\tFF\n\n0a  \r\n"),
            Ok(vec![0x00, 0xff, 0x0a])
        );
        assert_eq!(parse_editable("   "), Ok(Vec::new()));
    }

    #[test]
    fn parse_rejects_whole_input_on_one_bad_token() {
        assert_eq!(
            parse_editable("00 0 02"),
            Err(HexError::InvalidToken {
                index: 1,
                token: "0".into()
            })
        );
        assert_eq!(
            parse_editable("00 zz 02"),
            Err(HexError::InvalidToken {
                index: 1,
                token: "zz".into()
            })
        );
        assert!(parse_editable("000").is_err());
        assert!(parse_editable("é").is_err());
    }
}

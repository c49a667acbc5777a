//! Leica Disto Serial Protocol
//!
//! The Disto streams CRLF-terminated ASCII lines over its Bluetooth serial
//! profile and stops talking unless every line is acknowledged.
//!
//! # Line Categories
//!
//! ```text
//! ?                      : idle heartbeat, sent continuously
//! @E<nnn>                : device error report
//! <field> <field> ...    : data record, space separated
//! ```
//!
//! # Data Record Fields
//!
//! ```text
//! 31..00+DDDDDDDDD       : distance in mm, digits at [7..16], may repeat
//! 5000??+KKKKKKKK        : navigation key, code at [7..15]
//! ```
//!
//! Any other field is ignored.

use tracing::trace;

/// Written after opening the port and after every received line
pub const ACK: &[u8] = b"cfm\n";

pub const IDLE_TOKEN: &str = "?";
pub const ERROR_PREFIX: &str = "@E";
pub const DISTANCE_PREFIX: &str = "31..00+";
pub const KEY_PREFIX: &str = "5000";
pub const FIELD_SEPARATOR: char = ' ';

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Both value kinds start right after the 7-character field header
const VALUE_OFFSET: usize = 7;
const DISTANCE_LEN: usize = 9;
const KEY_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCategory {
    Idle,
    Error,
    Data,
}

/// Values extracted from one data record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub distances_mm: Vec<u64>,
    pub key_codes: Vec<i32>,
}

impl Record {
    pub fn is_empty(&self) -> bool {
        self.distances_mm.is_empty() && self.key_codes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Distance(u64),
    KeyCode(i32),
}

/// A recognised field whose numeric part could not be read
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("malformed distance field `{0}`")]
    MalformedDistance(String),
    #[error("malformed key field `{0}`")]
    MalformedKeyCode(String),
}

/// Decode a raw line as text with the trailing CR/LF and whitespace removed
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end().to_string()
}

/// Classify a decoded line. Prefix checks happen before any field splitting.
pub fn classify(line: &str) -> LineCategory {
    if line.is_empty() || line == IDLE_TOKEN {
        LineCategory::Idle
    } else if line.starts_with(ERROR_PREFIX) {
        LineCategory::Error
    } else {
        LineCategory::Data
    }
}

/// Extract every distance and key code from a data record.
///
/// Fields are handled independently; a malformed one is skipped without
/// affecting the rest of the line.
pub fn parse_record(line: &str) -> Record {
    let mut record = Record::default();

    for field in line.split(FIELD_SEPARATOR) {
        match parse_field(field) {
            Ok(Some(Field::Distance(mm))) => record.distances_mm.push(mm),
            Ok(Some(Field::KeyCode(code))) => record.key_codes.push(code),
            Ok(None) => {}
            Err(e) => trace!("Skipping field: {}", e),
        }
    }

    record
}

fn parse_field(field: &str) -> Result<Option<Field>, FieldError> {
    if field.starts_with(DISTANCE_PREFIX) {
        value_at(field, DISTANCE_LEN)
            .map(|mm| Some(Field::Distance(mm)))
            .ok_or_else(|| FieldError::MalformedDistance(field.to_string()))
    } else if field.get(..KEY_PREFIX.len()) == Some(KEY_PREFIX) {
        value_at(field, KEY_CODE_LEN)
            .map(|code| Some(Field::KeyCode(code)))
            .ok_or_else(|| FieldError::MalformedKeyCode(field.to_string()))
    } else {
        Ok(None)
    }
}

/// Parse the fixed-width value that follows the field header. A field that
/// ends early yields whatever digits are present.
fn value_at<T: std::str::FromStr>(field: &str, len: usize) -> Option<T> {
    let end = field.len().min(VALUE_OFFSET + len);
    field.get(VALUE_OFFSET..end)?.parse().ok()
}

/// Render bytes as a 16-per-row hexdump with an ASCII column
pub fn hexdump(buf: &[u8]) -> String {
    let mut out = String::new();

    for (row, chunk) in buf.chunks(16).enumerate() {
        let mut hex = chunk
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        // Extra gap between the two groups of eight
        if hex.len() > 23 {
            hex.insert(23, ' ');
        }

        let ascii: String = chunk
            .iter()
            .map(|&b| if (32..=127).contains(&b) { b as char } else { '.' })
            .collect();

        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", row * 16, hex, ascii));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(""), LineCategory::Idle);
        assert_eq!(classify("?"), LineCategory::Idle);
        assert_eq!(classify("@E203"), LineCategory::Error);
        assert_eq!(classify("@E 31..00+000001234"), LineCategory::Error);
        assert_eq!(classify("31..00+000001234"), LineCategory::Data);
        assert_eq!(classify("?? extra"), LineCategory::Data);
    }

    #[test]
    fn test_decode_strips_terminator() {
        assert_eq!(decode_line(b"?\r\n"), "?");
        assert_eq!(decode_line(b"31..00+000000100 \r\n"), "31..00+000000100");
        assert_eq!(decode_line(b""), "");
    }

    #[test]
    fn test_parse_single_distance() {
        let record = parse_record("31..00+000000100");
        assert_eq!(record.distances_mm, vec![100]);
        assert!(record.key_codes.is_empty());
    }

    #[test]
    fn test_parse_repeated_distances() {
        let record = parse_record("31..00+000001234 31..00+000005678");
        assert_eq!(record.distances_mm, vec![1234, 5678]);
    }

    #[test]
    fn test_parse_key_codes() {
        assert_eq!(parse_record("50000.+00000002").key_codes, vec![2]);
        assert_eq!(parse_record("50000.+00000015").key_codes, vec![15]);
        assert_eq!(
            parse_record("50000.+00000002 50000.+00000099").key_codes,
            vec![2, 99]
        );
    }

    #[test]
    fn test_signed_key_code_is_kept() {
        let record = parse_record("50000.+-0000002 31..00+000000100");
        assert_eq!(record.key_codes, vec![-2]);
        assert_eq!(record.distances_mm, vec![100]);
        assert_eq!(parse_record("50000.++0000007").key_codes, vec![7]);
    }

    #[test]
    fn test_short_key_field_uses_available_digits() {
        // Only "4567" lies past the header
        assert_eq!(parse_record("50001234567").key_codes, vec![4567]);
        assert_eq!(parse_record("5000123").key_codes, Vec::<i32>::new());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let record = parse_record("40..00+00000021 51.....+0000+005 foo");
        assert!(record.is_empty());
    }

    #[test]
    fn test_malformed_field_does_not_drop_line() {
        let record = parse_record("31..00+0000x1234 31..00+000000200 5000..0+0000abcd");
        assert_eq!(record.distances_mm, vec![200]);
        assert!(record.key_codes.is_empty());
    }

    #[test]
    fn test_parse_field_errors() {
        assert_eq!(
            parse_field("31..00+"),
            Err(FieldError::MalformedDistance("31..00+".to_string()))
        );
        assert_eq!(
            parse_field("5000..0+zz"),
            Err(FieldError::MalformedKeyCode("5000..0+zz".to_string()))
        );
        assert_eq!(parse_field(""), Ok(None));
    }

    #[test]
    fn test_mixed_record() {
        let record = parse_record("31..00+000001000 50000.+00000006 31..00+000003000");
        assert_eq!(record.distances_mm, vec![1000, 3000]);
        assert_eq!(record.key_codes, vec![6]);
    }

    #[test]
    fn test_hexdump() {
        let dump = hexdump(b"@E203\r\n");
        assert_eq!(
            dump,
            format!("00000000  {:<48}  |@E203..|\n", "40 45 32 30 33 0d 0a")
        );

        let dump = hexdump(b"0123456789abcdefXY");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "00000000  30 31 32 33 34 35 36 37  38 39 61 62 63 64 65 66  |0123456789abcdef|"
        );
        assert!(lines[1].starts_with("00000010  58 59 "));
        assert!(lines[1].ends_with("|XY|"));
    }
}

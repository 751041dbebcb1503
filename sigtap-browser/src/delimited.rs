//! Delimited text helpers shared by the layout resolver and the loader
//!
//! SIGTAP files come as UTF-8 or Windows-1252 and use `|`, `;`, `,` or tab as
//! separators, depending on the release.

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

/// Separators tried by [`detect_delimiter`], in order of preference on ties
pub const DELIMITER_CANDIDATES: [u8; 4] = [b'|', b';', b',', b'\t'];

/// Text encoding of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Windows-1252, the superset of Latin-1 the SIGTAP files are written in
    Windows1252,
}

impl TextEncoding {
    /// Parse an encoding label such as `utf-8`, `latin-1`, `iso-8859-1` or `cp1252`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "cp1252" | "windows-1252" => {
                Some(Self::Windows1252)
            }
            _ => None,
        }
    }

    pub fn encoding(self) -> &'static Encoding {
        match self {
            Self::Utf8 => UTF_8,
            Self::Windows1252 => WINDOWS_1252,
        }
    }
}

/// Decode file contents
///
/// Without an explicit encoding, UTF-8 is tried first and Windows-1252 is
/// the fallback. A UTF-8 byte order mark is dropped.
pub fn decode(bytes: &[u8], encoding: Option<TextEncoding>) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let encoding = match encoding {
        Some(encoding) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => TextEncoding::Utf8,
        None => TextEncoding::Windows1252,
    };
    encoding.encoding().decode_without_bom_handling(bytes).0
}

/// Pick the candidate separator occurring most often in the sample
///
/// Falls back to `|` when none occurs.
pub fn detect_delimiter(sample: &str) -> u8 {
    let mut best = b'|';
    let mut best_count = 0;

    for candidate in DELIMITER_CANDIDATES {
        let count = sample.bytes().filter(|&byte| byte == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

/// Read every record of a delimited text, header row included
///
/// Records may have differing lengths; empty lines are skipped.
pub fn read_records(text: &str, delimiter: u8) -> Result<Vec<StringRecord>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    reader.records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("single column"), b'|');
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        assert_eq!(decode("Promoção".as_bytes(), None), "Promoção");
        assert_eq!(decode(b"Promo\xE7\xE3o", None), "Promoção");
        assert_eq!(decode(b"\xEF\xBB\xBFColuna", None), "Coluna");
        assert_eq!(decode(b"caf\xE9", Some(TextEncoding::Windows1252)), "café");
        assert_eq!(decode(b"caf\xE9", Some(TextEncoding::Utf8)), "caf\u{FFFD}");
    }

    #[test]
    fn test_decode_windows_1252_punctuation() {
        let cp1252 = TextEncoding::from_label("cp1252");
        assert_eq!(decode(b"\x93SUS\x94 \x80", cp1252), "\u{201C}SUS\u{201D} \u{20AC}");
        assert_eq!(decode(b"CID\x96 10", None), "CID\u{2013} 10");
    }

    #[test]
    fn test_encoding_labels() {
        assert_eq!(TextEncoding::from_label("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_label("latin_1"), Some(TextEncoding::Windows1252));
        assert_eq!(TextEncoding::from_label("cp1252"), Some(TextEncoding::Windows1252));
        assert_eq!(TextEncoding::from_label("ebcdic"), None);
    }

    #[test]
    fn test_read_records_is_flexible() {
        let records = read_records("Coluna;Tipo\nco_grupo;CHAR\nno_grupo\n", b';').unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][0], "Coluna");
        assert_eq!(records[2].len(), 1);
    }
}

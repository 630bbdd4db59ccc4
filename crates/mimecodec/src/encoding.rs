//! Content-transfer-encodings and RFC 2047 header words.
//!
//! The line decoders here are driven one physical line at a time by
//! [`MimeReader`](crate::MimeReader); the matching encoders live in
//! [`MimeWriter`](crate::MimeWriter) because they track the output column.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Upper-case hex digits used by the quoted-printable and Q encoders.
pub(crate) const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Base64 engine for content lines: accepts missing padding and non-zero
/// trailing bits, as seen from older mailers.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Content-Transfer-Encoding of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferEncoding {
    /// Unrecognised header value. Content in this encoding cannot be read
    /// or written.
    Unknown,
    /// No Content-Transfer-Encoding header; plain US-ASCII text.
    #[default]
    Text,
    /// `7bit`
    SevenBit,
    /// `8bit`
    EightBit,
    /// `binary`
    Binary,
    /// `quoted-printable`
    QuotedPrintable,
    /// `base64`
    Base64,
    /// `uuencode`
    UUEncode,
}

impl TransferEncoding {
    /// Maps a header value (case-insensitive) to an encoding.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        const NAMES: [(&str, TransferEncoding); 6] = [
            ("7bit", TransferEncoding::SevenBit),
            ("8bit", TransferEncoding::EightBit),
            ("binary", TransferEncoding::Binary),
            ("quoted-printable", TransferEncoding::QuotedPrintable),
            ("base64", TransferEncoding::Base64),
            ("uuencode", TransferEncoding::UUEncode),
        ];

        let value = value.trim();
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map_or(Self::Unknown, |&(_, encoding)| encoding)
    }

    /// Returns the header value for this encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] for [`TransferEncoding::Text`] and
    /// [`TransferEncoding::Unknown`], which have no header spelling.
    pub fn as_header_value(self) -> Result<&'static str> {
        match self {
            Self::SevenBit => Ok("7bit"),
            Self::EightBit => Ok("8bit"),
            Self::Binary => Ok("binary"),
            Self::QuotedPrintable => Ok("quoted-printable"),
            Self::Base64 => Ok("base64"),
            Self::UUEncode => Ok("uuencode"),
            Self::Text | Self::Unknown => Err(Error::invalid(format!(
                "transfer encoding {self:?} has no header value."
            ))),
        }
    }

    /// Returns true if decoding stops at an empty line.
    ///
    /// Base64 and uuencode never produce a legitimately empty line.
    #[must_use]
    pub const fn ends_at_empty_line(self) -> bool {
        matches!(self, Self::Base64 | Self::UUEncode)
    }
}

/// Returns the value of an upper- or lower-case hex digit.
#[must_use]
pub const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Appends one text line plus CRLF to `out`.
///
/// In strict mode only tab and printable US-ASCII are accepted.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for a byte outside the strict set.
pub fn decode_text_line(line: &[u8], strict: bool, out: &mut Vec<u8>) -> Result<()> {
    if strict && !line.iter().all(|&b| b == b'\t' || (32..=126).contains(&b)) {
        return Err(Error::malformed("invalid character in text."));
    }
    out.extend_from_slice(line);
    out.extend_from_slice(b"\r\n");
    Ok(())
}

/// Appends one decoded quoted-printable line to `out`.
///
/// A line ending in `=` is a soft break and gets no CRLF.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for `=` followed by non-hex digits.
pub fn decode_quoted_printable_line(line: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut pos = 0;

    while pos < line.len() {
        let c = line[pos];
        pos += 1;

        if c != b'=' {
            out.push(c);
            continue;
        }

        if pos + 2 > line.len() {
            return Ok(());
        }

        match (hex_value(line[pos]), hex_value(line[pos + 1])) {
            (Some(hi), Some(lo)) => out.push(hi << 4 | lo),
            _ => {
                return Err(Error::malformed(format!(
                    "bad quoted-printable data '={}{}'.",
                    char::from(line[pos]),
                    char::from(line[pos + 1])
                )));
            }
        }
        pos += 2;
    }

    out.extend_from_slice(b"\r\n");
    Ok(())
}

/// Appends one decoded base64 line to `out`.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for characters outside the base64
/// alphabet or misplaced padding.
pub fn decode_base64_line(line: &[u8], out: &mut Vec<u8>) -> Result<()> {
    LENIENT_BASE64
        .decode_vec(line, out)
        .map_err(|e| Error::malformed(format!("bad base64 data, {e}.")))
}

/// Appends one decoded uuencode line to `out`.
///
/// The `begin` and `end` framing lines produce no output.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for a character outside the uuencode
/// range.
pub fn decode_uuencode_line(line: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let Some((&count, data)) = line.split_first() else {
        return Ok(());
    };
    if line.starts_with(b"begin ") || line == b"end" {
        return Ok(());
    }

    let mut remaining = usize::from(uu_value(count)?);
    let mut groups = data.chunks(4);

    while remaining > 0 {
        let mut quad = [0u8; 4];
        if let Some(group) = groups.next() {
            for (slot, &c) in quad.iter_mut().zip(group) {
                *slot = uu_value(c)?;
            }
        }

        let triple = [
            quad[0] << 2 | quad[1] >> 4,
            quad[1] << 4 | quad[2] >> 2,
            quad[2] << 6 | quad[3],
        ];
        let take = remaining.min(3);
        out.extend_from_slice(&triple[..take]);
        remaining -= take;
    }

    Ok(())
}

/// Maps a uuencode character to its six-bit value; backquote is zero.
fn uu_value(c: u8) -> Result<u8> {
    if (32..=96).contains(&c) {
        Ok((c - 32) & 0x3F)
    } else {
        Err(Error::malformed("bad uuencoded data."))
    }
}

/// Returns true if a header value must be written as an encoded-word.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.chars().any(|c| u32::from(c) >= 0x7F)
}

/// Encodes text as a single UTF-8 `Q` encoded-word.
///
/// Spaces become `_`; `"`, `?`, `_`, `=` and bytes outside printable
/// US-ASCII become `=XX`.
#[must_use]
pub fn encode_word(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3 + 12);
    out.push_str("=?utf-8?Q?");
    for &b in text.as_bytes() {
        match b {
            b' ' => out.push('_'),
            b'"' | b'?' | b'_' | b'=' => push_hex(&mut out, b),
            32..=126 => out.push(char::from(b)),
            _ => push_hex(&mut out, b),
        }
    }
    out.push_str("?=");
    out
}

fn push_hex(out: &mut String, b: u8) {
    out.push('=');
    out.push(char::from(HEX_DIGITS[usize::from(b >> 4)]));
    out.push(char::from(HEX_DIGITS[usize::from(b & 0x0F)]));
}

/// Decodes every RFC 2047 encoded-word (`B` or `Q`) in a header value.
///
/// Whitespace between two adjacent encoded-words is dropped. Words with an
/// unknown charset or broken payload are kept verbatim.
#[must_use]
pub fn decode_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        if let Some((decoded, used)) = decode_word(candidate) {
            if !(after_word && before.chars().all(char::is_whitespace)) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[used..];
            after_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    out.push_str(rest);
    out
}

/// Decodes one encoded-word at the start of `text`, returning the decoded
/// text and the number of bytes consumed.
fn decode_word(text: &str) -> Option<(String, usize)> {
    let body = text.strip_prefix("=?")?;
    let charset_end = body.find('?')?;
    let charset = body[..charset_end].split('*').next()?;

    let flag = body.as_bytes().get(charset_end + 1..charset_end + 3)?;
    let data_start = charset_end + 3;
    if flag[1] != b'?' {
        return None;
    }
    let data_len = body[data_start..].find("?=")?;
    let data = &body[data_start..data_start + data_len];

    let bytes = match flag[0] {
        b'B' | b'b' => LENIENT_BASE64.decode(data).ok()?,
        b'Q' | b'q' => decode_q(data.as_bytes())?,
        _ => return None,
    };

    let encoding = Encoding::for_label(charset.as_bytes())?;
    let (decoded, _) = encoding.decode_without_bom_handling(&bytes);

    Some((decoded.into_owned(), 2 + data_start + data_len + 2))
}

fn decode_q(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter();
    while let Some(&b) = iter.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = hex_value(*iter.next()?)?;
                let lo = hex_value(*iter.next()?)?;
                out.push(hi << 4 | lo);
            }
            _ => out.push(b),
        }
    }
    Some(out)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        assert_eq!(TransferEncoding::from_header("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::from_header("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_header("x-gzip"), TransferEncoding::Unknown);
    }

    #[test]
    fn test_as_header_value() {
        assert_eq!(TransferEncoding::Base64.as_header_value().unwrap(), "base64");
        assert_eq!(TransferEncoding::UUEncode.as_header_value().unwrap(), "uuencode");
        assert!(TransferEncoding::Text.as_header_value().unwrap_err().is_invalid_operation());
        assert!(TransferEncoding::Unknown.as_header_value().is_err());
    }

    #[test]
    fn test_text_line_strict() {
        let mut out = Vec::new();
        decode_text_line(b"hello\tworld", true, &mut out).unwrap();
        assert_eq!(out, b"hello\tworld\r\n");

        let err = decode_text_line("caf\u{e9}".as_bytes(), true, &mut out).unwrap_err();
        assert!(err.to_string().contains("invalid character in text"));

        let mut out = Vec::new();
        decode_text_line("caf\u{e9}".as_bytes(), false, &mut out).unwrap();
        assert_eq!(out, "caf\u{e9}\r\n".as_bytes());
    }

    #[test]
    fn test_quoted_printable_line() {
        let mut out = Vec::new();
        decode_quoted_printable_line(b"caf=C3=a9 =3D ok", &mut out).unwrap();
        assert_eq!(out, "caf\u{e9} = ok\r\n".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        let mut out = Vec::new();
        decode_quoted_printable_line(b"Hello=", &mut out).unwrap();
        decode_quoted_printable_line(b"World", &mut out).unwrap();
        assert_eq!(out, b"HelloWorld\r\n");
    }

    #[test]
    fn test_quoted_printable_rejects_non_hex() {
        // `=ZZ` is an error, not a zero byte.
        let mut out = Vec::new();
        let err = decode_quoted_printable_line(b"a=ZZb", &mut out).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("=ZZ"));
    }

    #[test]
    fn test_base64_line() {
        let mut out = Vec::new();
        decode_base64_line(b"SGVsbG8s", &mut out).unwrap();
        decode_base64_line(b"IFdvcmxkIQ==", &mut out).unwrap();
        assert_eq!(out, b"Hello, World!");
    }

    #[test]
    fn test_base64_line_without_padding() {
        let mut out = Vec::new();
        decode_base64_line(b"IQ", &mut out).unwrap();
        assert_eq!(out, b"!");
    }

    #[test]
    fn test_base64_line_bad_char() {
        let mut out = Vec::new();
        let err = decode_base64_line(b"SGV*bG8=", &mut out).unwrap_err();
        assert!(err.to_string().contains("bad base64 data"));
    }

    #[test]
    fn test_uuencode_line() {
        // "Cat" uuencoded.
        let mut out = Vec::new();
        decode_uuencode_line(b"#0V%T", &mut out).unwrap();
        assert_eq!(out, b"Cat");
    }

    #[test]
    fn test_uuencode_multiple_groups() {
        let mut out = Vec::new();
        decode_uuencode_line(b"&0V%T0V%T", &mut out).unwrap();
        assert_eq!(out, b"CatCat");
    }

    #[test]
    fn test_uuencode_framing_and_backquote() {
        let mut out = Vec::new();
        decode_uuencode_line(b"begin 644 cat.txt", &mut out).unwrap();
        decode_uuencode_line(b"`", &mut out).unwrap();
        decode_uuencode_line(b"end", &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_uuencode_bad_char() {
        let mut out = Vec::new();
        assert!(decode_uuencode_line(b"#0v%T", &mut out).unwrap_err().is_malformed());
    }

    #[test]
    fn test_encode_word() {
        assert_eq!(encode_word("Grüße an _alle_?"), "=?utf-8?Q?Gr=C3=BC=C3=9Fe_an_=5Falle=5F=3F?=");
        assert!(needs_encoding("Grüße"));
        assert!(!needs_encoding("Hello"));
    }

    #[test]
    fn test_decode_words() {
        assert_eq!(decode_words("Hello"), "Hello");
        assert_eq!(decode_words("=?utf-8?B?SMOpbGxv?="), "H\u{e9}llo");
        assert_eq!(decode_words("=?UTF-8?Q?H=C3=A9llo_world?= !"), "H\u{e9}llo world !");
        assert_eq!(decode_words("=?iso-8859-1?q?caf=E9?="), "caf\u{e9}");
    }

    #[test]
    fn test_decode_words_joins_adjacent() {
        assert_eq!(decode_words("=?utf-8?Q?a?= =?utf-8?Q?b?= c"), "ab c");
        assert_eq!(decode_words("x =?utf-8?Q?a?="), "x a");
    }

    #[test]
    fn test_decode_words_keeps_broken() {
        assert_eq!(decode_words("=?bogus-charset?Q?a?="), "=?bogus-charset?Q?a?=");
        assert_eq!(decode_words("a =? b"), "a =? b");
    }

    #[test]
    fn test_encode_word_roundtrip() {
        let text = "Jos\u{e9} \"JM\" M\u{fc}ller";
        assert_eq!(decode_words(&encode_word(text)), text);
    }
}

//! Wire-format writer.
//!
//! [`MimeWriter`] tracks the output column so header parameters can be
//! folded and encoded content lines kept within the configured width.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::Config;
use crate::encoding::{HEX_DIGITS, TransferEncoding, encode_word, needs_encoding};
use crate::error::{Error, Result};

/// A structured header value that knows how to serialize itself.
pub trait WriteValue {
    /// Returns true if there is anything to write.
    fn has_data(&self) -> bool;

    /// Writes the value (without field name or line terminator).
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying stream.
    fn write_value<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()>;
}

/// Serializer for header fields, boundaries and encoded content.
#[derive(Debug)]
pub struct MimeWriter<W: Write> {
    inner: W,
    line_pos: usize,
    line_width: usize,
    preamble: String,
}

impl<W: Write> MimeWriter<W> {
    /// Creates a writer with the default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, &Config::default())
    }

    /// Creates a writer using the width and preamble from `config`.
    pub fn with_config(inner: W, config: &Config) -> Self {
        Self {
            inner,
            line_pos: 0,
            line_width: config.line_width,
            preamble: config.preamble.clone(),
        }
    }

    /// Returns the column of the next byte written.
    #[must_use]
    pub const fn line_position(&self) -> usize {
        self.line_pos
    }

    /// Returns the configured line width.
    #[must_use]
    pub const fn line_width(&self) -> usize {
        self.line_width
    }

    /// Returns the configured multipart preamble.
    #[must_use]
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Flushes the underlying stream.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.line_pos += bytes.len();
        Ok(())
    }

    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write_raw(&[b])
    }

    fn write_hex(&mut self, b: u8) -> Result<()> {
        self.write_raw(&[
            b'=',
            HEX_DIGITS[usize::from(b >> 4)],
            HEX_DIGITS[usize::from(b & 0x0F)],
        ])
    }

    /// Writes `name: value` and a line break; empty values are skipped.
    ///
    /// Non-ASCII values are written as a UTF-8 encoded-word.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_header_field(&mut self, name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.write_field_name(name)?;
        self.write_header_text(value)?;
        self.write_newline()
    }

    /// Writes `name: value` for a structured value that has data.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_header_value(&mut self, name: &str, value: &impl WriteValue) -> Result<()> {
        if !value.has_data() {
            return Ok(());
        }
        self.write_field_name(name)?;
        value.write_value(self)?;
        self.write_newline()
    }

    /// Writes a field name and the `": "` separator.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_field_name(&mut self, name: &str) -> Result<()> {
        self.write_raw(name.as_bytes())?;
        self.write_raw(b": ")
    }

    /// Writes free header text, as an encoded-word when it is not ASCII.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_header_text(&mut self, value: &str) -> Result<()> {
        if needs_encoding(value) {
            self.write_raw(encode_word(value).as_bytes())
        } else {
            self.write_raw(value.as_bytes())
        }
    }

    /// Writes a header token verbatim.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_field_value(&mut self, value: &str) -> Result<()> {
        self.write_raw(value.as_bytes())
    }

    /// Writes `; name="value"`, folding onto a new tab-indented line first
    /// when the parameter would not fit.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_parameter(&mut self, name: &str, value: &str) -> Result<()> {
        let value = if needs_encoding(value) {
            encode_word(value)
        } else {
            escape_quoted(value)
        };

        self.write_byte(b';')?;
        if self.line_pos + name.len() + value.len() + 5 >= self.line_width {
            self.write_newline()?;
            self.write_byte(b'\t')?;
        } else {
            self.write_byte(b' ')?;
        }

        self.write_raw(name.as_bytes())?;
        self.write_raw(b"=\"")?;
        self.write_raw(value.as_bytes())?;
        self.write_byte(b'"')
    }

    /// Writes `"display name" <address>` or `<address>`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_address(&mut self, address: &str, display_name: Option<&str>) -> Result<()> {
        if let Some(name) = display_name {
            if needs_encoding(name) {
                self.write_raw(encode_word(name).as_bytes())?;
            } else {
                self.write_byte(b'"')?;
                self.write_raw(escape_quoted(name).as_bytes())?;
                self.write_byte(b'"')?;
            }
            self.write_byte(b' ')?;
        }

        self.write_byte(b'<')?;
        self.write_raw(address.as_bytes())?;
        self.write_byte(b'>')
    }

    /// Writes the separator between two addresses of a list.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_address_separator(&mut self) -> Result<()> {
        self.write_byte(b',')?;
        self.write_newline()?;
        self.write_byte(b'\t')
    }

    /// Writes `--boundary` or `--boundary--` and a line break.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_boundary(&mut self, boundary: &str, end: bool) -> Result<()> {
        tracing::trace!(boundary, end, "writing boundary");
        self.write_raw(b"--")?;
        self.write_raw(boundary.as_bytes())?;
        if end {
            self.write_raw(b"--")?;
        }
        self.write_newline()
    }

    /// Writes plain body text with text-encoding rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the text is not printable
    /// US-ASCII.
    pub fn write_body(&mut self, body: &str) -> Result<()> {
        self.write_text(body.as_bytes())
    }

    /// Writes content in the given transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for bytes that the text encodings
    /// cannot carry, and [`Error::InvalidOperation`] for encodings without
    /// an encoder (`binary`, `uuencode`, unknown).
    pub fn write_content(&mut self, content: &[u8], encoding: TransferEncoding) -> Result<()> {
        match encoding {
            TransferEncoding::Text | TransferEncoding::SevenBit | TransferEncoding::EightBit => {
                self.write_text(content)
            }
            TransferEncoding::QuotedPrintable => self.write_quoted_printable(content),
            TransferEncoding::Base64 => self.write_base64(content),
            TransferEncoding::Binary | TransferEncoding::UUEncode | TransferEncoding::Unknown => {
                Err(Error::invalid(format!("no encoder for transfer encoding {encoding:?}.")))
            }
        }
    }

    /// Writes CRLF.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_newline(&mut self) -> Result<()> {
        self.inner.write_all(b"\r\n")?;
        self.line_pos = 0;
        Ok(())
    }

    /// Writes a quoted-printable soft line break (`=` CRLF).
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_soft_newline(&mut self) -> Result<()> {
        self.inner.write_all(b"=\r\n")?;
        self.line_pos = 0;
        Ok(())
    }

    fn write_text(&mut self, content: &[u8]) -> Result<()> {
        for &b in content {
            match b {
                b'\n' => self.write_newline()?,
                b'\r' => {}
                b'\t' | 32..=126 => self.write_byte(b)?,
                _ => return Err(Error::malformed("invalid character in text.")),
            }
        }

        if self.line_pos > 0 {
            self.write_newline()?;
        }
        Ok(())
    }

    fn write_quoted_printable(&mut self, content: &[u8]) -> Result<()> {
        let literal_limit = self.line_width.saturating_sub(1);
        let encoded_limit = self.line_width.saturating_sub(3);
        let mut i = 0;

        while i < content.len() {
            let c = content[i];
            let next = content.get(i + 1).copied();
            i += 1;

            let mut literal = match c {
                b' ' | b'\t' => next.is_some_and(|n| n != b'\r'),
                b'\r' if next == Some(b'\n') => {
                    self.write_newline()?;
                    i += 1;
                    continue;
                }
                b'=' => false,
                32..=126 => true,
                _ => false,
            };

            if literal {
                if self.line_pos >= literal_limit {
                    self.write_soft_newline()?;
                }
                // A leading `.` or `-` could read as SMTP end-of-data or a boundary.
                literal = !(matches!(c, b'.' | b'-') && self.line_pos == 0);
            }

            if literal {
                self.write_byte(c)?;
            } else {
                if self.line_pos >= encoded_limit {
                    self.write_soft_newline()?;
                }
                self.write_hex(c)?;
            }
        }

        if self.line_pos > 0 {
            self.write_soft_newline()?;
        }
        Ok(())
    }

    fn write_base64(&mut self, content: &[u8]) -> Result<()> {
        let chunk = (self.line_width / 4).max(1) * 3;
        for line in content.chunks(chunk) {
            self.write_raw(STANDARD.encode(line).as_bytes())?;
            self.write_newline()?;
        }
        Ok(())
    }
}

/// Escapes `"` and `\` for use inside a quoted string.
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
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
    use crate::encoding::{decode_base64_line, decode_quoted_printable_line};

    fn written(f: impl FnOnce(&mut MimeWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut writer = MimeWriter::new(Vec::new());
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn decode_qp(encoded: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for line in encoded.split_terminator("\r\n") {
            decode_quoted_printable_line(line.as_bytes(), &mut out).unwrap();
        }
        out
    }

    #[test]
    fn test_header_field() {
        assert_eq!(written(|w| w.write_header_field("Subject", "Hello")), "Subject: Hello\r\n");
        assert_eq!(written(|w| w.write_header_field("Subject", "")), "");
    }

    #[test]
    fn test_header_field_non_ascii() {
        assert_eq!(
            written(|w| w.write_header_field("Subject", "Caf\u{e9} ok")),
            "Subject: =?utf-8?Q?Caf=C3=A9_ok?=\r\n"
        );
    }

    #[test]
    fn test_parameter_inline_and_folded() {
        let out = written(|w| {
            w.write_field_name("Content-Type")?;
            w.write_field_value("text/plain")?;
            w.write_parameter("charset", "us-ascii")
        });
        assert_eq!(out, "Content-Type: text/plain; charset=\"us-ascii\"");

        let long = "x".repeat(60);
        let out = written(|w| {
            w.write_field_name("Content-Type")?;
            w.write_field_value("application/pdf")?;
            w.write_parameter("name", &long)
        });
        assert_eq!(out, format!("Content-Type: application/pdf;\r\n\tname=\"{long}\""));
    }

    #[test]
    fn test_parameter_escapes() {
        let out = written(|w| w.write_parameter("name", "a \"b\" \\c"));
        assert_eq!(out, "; name=\"a \\\"b\\\" \\\\c\"");
    }

    #[test]
    fn test_address() {
        assert_eq!(written(|w| w.write_address("a@example.com", None)), "<a@example.com>");
        assert_eq!(
            written(|w| w.write_address("a@example.com", Some("Doe \"JD\""))),
            "\"Doe \\\"JD\\\"\" <a@example.com>"
        );
        assert_eq!(
            written(|w| w.write_address("a@example.com", Some("J\u{f8}rn"))),
            "=?utf-8?Q?J=C3=B8rn?= <a@example.com>"
        );
    }

    #[test]
    fn test_address_separator_resets_column() {
        let mut writer = MimeWriter::new(Vec::new());
        writer.write_address("a@example.com", None).unwrap();
        writer.write_address_separator().unwrap();
        assert_eq!(writer.line_position(), 1);
        assert_eq!(writer.into_inner(), b"<a@example.com>,\r\n\t");
    }

    #[test]
    fn test_boundary() {
        assert_eq!(written(|w| w.write_boundary("B1", false)), "--B1\r\n");
        assert_eq!(written(|w| w.write_boundary("B1", true)), "--B1--\r\n");
    }

    #[test]
    fn test_text_content() {
        let out = written(|w| w.write_content(b"line one\nline two\r\n", TransferEncoding::Text));
        assert_eq!(out, "line one\r\nline two\r\n");

        let out = written(|w| w.write_content(b"no newline", TransferEncoding::SevenBit));
        assert_eq!(out, "no newline\r\n");
    }

    #[test]
    fn test_text_content_rejects_non_ascii() {
        let mut writer = MimeWriter::new(Vec::new());
        let err = writer
            .write_content("caf\u{e9}".as_bytes(), TransferEncoding::Text)
            .unwrap_err();
        assert!(err.to_string().contains("invalid character in text"));

        let mut writer = MimeWriter::new(Vec::new());
        let err = writer
            .write_content("caf\u{e9}".as_bytes(), TransferEncoding::EightBit)
            .unwrap_err();
        assert!(err.is_malformed());

        let mut writer = MimeWriter::new(Vec::new());
        assert!(writer.write_body("caf\u{e9}\r\n").unwrap_err().is_malformed());
    }

    #[test]
    fn test_no_encoder() {
        let mut writer = MimeWriter::new(Vec::new());
        for encoding in [
            TransferEncoding::Binary,
            TransferEncoding::UUEncode,
            TransferEncoding::Unknown,
        ] {
            assert!(writer.write_content(b"x", encoding).unwrap_err().is_invalid_operation());
        }
    }

    #[test]
    fn test_quoted_printable_basic() {
        let out = written(|w| w.write_content("a=b caf\u{e9}\r\n".as_bytes(), TransferEncoding::QuotedPrintable));
        assert_eq!(out, "a=3Db caf=C3=A9\r\n");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        let out = written(|w| w.write_content(b"end \r\nlast\t", TransferEncoding::QuotedPrintable));
        assert_eq!(out, "end=20\r\nlast=09=\r\n");
    }

    #[test]
    fn test_quoted_printable_leading_dot_and_dash() {
        let out = written(|w| w.write_content(b".\r\n--b\r\na.b-c\r\n", TransferEncoding::QuotedPrintable));
        assert_eq!(out, "=2E\r\n=2D-b\r\na.b-c\r\n");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let content = "y".repeat(200);
        let out = written(|w| w.write_content(content.as_bytes(), TransferEncoding::QuotedPrintable));
        for line in out.split_terminator("\r\n") {
            assert!(line.len() <= 76, "line too long: {}", line.len());
        }
        assert_eq!(decode_qp(&out), content.as_bytes());
    }

    #[test]
    fn test_quoted_printable_roundtrip_bare_lf() {
        let content = b"one\ntwo\rthree\r\n";
        let out = written(|w| w.write_content(content, TransferEncoding::QuotedPrintable));
        assert_eq!(decode_qp(&out), content);
    }

    #[test]
    fn test_base64_lines() {
        let content: Vec<u8> = (0..=255).collect();
        let out = written(|w| w.write_content(&content, TransferEncoding::Base64));

        let mut decoded = Vec::new();
        for line in out.split_terminator("\r\n") {
            assert!(line.len() <= 76);
            decode_base64_line(line.as_bytes(), &mut decoded).unwrap();
        }
        assert_eq!(decoded, content);
        assert_eq!(out.split_terminator("\r\n").next().unwrap().len(), 76);
    }

    #[test]
    fn test_base64_respects_width() {
        let config = Config::builder().line_width(40).build();
        let mut writer = MimeWriter::with_config(Vec::new(), &config);
        writer.write_content(&[0u8; 100], TransferEncoding::Base64).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out.split_terminator("\r\n").next().unwrap().len(), 40);
    }
}

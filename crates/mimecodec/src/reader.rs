//! Streaming message reader.
//!
//! [`MimeReader`] pulls one logical line at a time from a [`BufRead`]
//! source, using the source's own buffer to look one byte ahead for CRLF
//! pairs and folded continuation lines. Nothing is read past the line that
//! ends a header block, a part body or a boundary.

use std::io::{BufRead, Cursor};

use encoding_rs::WINDOWS_1252;

use crate::config::Config;
use crate::content_type::ContentType;
use crate::encoding::{
    TransferEncoding, decode_base64_line, decode_quoted_printable_line, decode_text_line,
    decode_uuencode_line,
};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::field_list::FieldList;
use crate::part::{Part, PartList};

/// Classification of a line against a multipart boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryLine {
    /// Not a boundary line.
    None,
    /// `--boundary`, a part follows.
    Open,
    /// `--boundary--`, no more parts.
    Close,
}

/// Line-oriented MIME reader.
#[derive(Debug)]
pub struct MimeReader<R: BufRead> {
    inner: R,
    line: Vec<u8>,
    line_capacity: usize,
    position: u64,
    header_offset: Option<u64>,
}

impl<R: BufRead> MimeReader<R> {
    /// Creates a reader with the default line capacity.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &Config::default())
    }

    /// Creates a reader using the line capacity from `config`.
    pub fn with_config(inner: R, config: &Config) -> Self {
        Self::with_line_capacity(inner, config.line_capacity)
    }

    fn with_line_capacity(inner: R, line_capacity: usize) -> Self {
        Self {
            inner,
            line: Vec::with_capacity(line_capacity),
            line_capacity,
            position: 0,
            header_offset: None,
        }
    }

    /// Returns the number of bytes consumed from the source.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Returns the offset just past the last leading `x-` header, if the
    /// header block started with any.
    #[must_use]
    pub const fn header_offset(&self) -> Option<u64> {
        self.header_offset
    }

    /// Returns the current line without its terminator.
    #[must_use]
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    /// Returns true if the current line is empty.
    #[must_use]
    pub fn is_line_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.inner.fill_buf()?.first().copied())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let b = self.peek_byte()?;
        if b.is_some() {
            self.inner.consume(1);
            self.position += 1;
        }
        Ok(b)
    }

    fn push(&mut self, b: u8) -> Result<()> {
        if self.line.len() >= self.line_capacity {
            return Err(Error::malformed("invalid mime message, line too long."));
        }
        self.line.push(b);
        Ok(())
    }

    /// Reads the next logical line into the line buffer.
    ///
    /// CRLF, a lone CR and a lone LF all end a line. With `unfolding`, a
    /// line break followed by a space or tab continues the current line
    /// with a single space in place of the break.
    ///
    /// Returns false at end of input when nothing was read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the line exceeds the line
    /// capacity, and [`Error::Io`] if the source fails.
    pub fn read_line(&mut self, unfolding: bool) -> Result<bool> {
        self.line.clear();
        let mut any = false;

        while let Some(b) = self.next_byte()? {
            any = true;
            match b {
                b'\r' | b'\n' => {
                    if b == b'\r' && self.peek_byte()? == Some(b'\n') {
                        self.next_byte()?;
                    }
                    if unfolding
                        && !self.line.is_empty()
                        && matches!(self.peek_byte()?, Some(b' ' | b'\t'))
                    {
                        self.next_byte()?;
                        self.push(b' ')?;
                        continue;
                    }
                    return Ok(true);
                }
                _ => self.push(b)?,
            }
        }

        Ok(any)
    }

    /// Reads a header block up to and including the empty line that ends
    /// it, or to end of input.
    ///
    /// Fields come back read-only; the list itself is left writable for the
    /// caller to freeze.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for a line without `:` or where
    /// the colon is not followed by a space.
    pub fn read_fields(&mut self) -> Result<FieldList> {
        let mut fields = FieldList::new();
        let mut extended_header = true;

        while self.read_line(true)? && !self.line.is_empty() {
            let Some(colon) = self.line.iter().position(|&b| b == b':') else {
                return Err(Error::malformed(format!(
                    "syntax error in field '{}', ':' not found.",
                    decode_header_bytes(&self.line)
                )));
            };
            if colon + 1 < self.line.len() && self.line[colon + 1] != b' ' {
                return Err(Error::malformed(format!(
                    "syntax error in field '{}', ': ' not found.",
                    decode_header_bytes(&self.line)
                )));
            }

            let name = decode_header_bytes(&self.line[..colon]);
            let value = decode_header_bytes(self.line.get(colon + 2..).unwrap_or_default());

            if extended_header {
                if name.starts_with("x-") {
                    self.header_offset = Some(self.position);
                } else {
                    extended_header = false;
                }
            }

            tracing::trace!(name = %name, "read header field");
            fields.push(Field::read_only(name, value))?;
        }

        Ok(fields)
    }

    /// Decodes body lines until end of input, a boundary line, or (for
    /// base64 and uuencode) an empty line.
    ///
    /// A boundary line that ends the data stays in the line buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for data the encoding rejects or
    /// an unknown transfer encoding.
    pub fn read_data(&mut self, encoding: TransferEncoding, boundary: Option<&str>) -> Result<Vec<u8>> {
        let mut content = Vec::new();

        while self.read_line(false)? {
            if self.line.is_empty() && encoding.ends_at_empty_line() {
                break;
            }
            if boundary.is_some_and(|b| self.test_boundary(b) != BoundaryLine::None) {
                break;
            }

            match encoding {
                TransferEncoding::Text | TransferEncoding::SevenBit => {
                    decode_text_line(&self.line, true, &mut content)?;
                }
                TransferEncoding::EightBit | TransferEncoding::Binary => {
                    decode_text_line(&self.line, false, &mut content)?;
                }
                TransferEncoding::QuotedPrintable => {
                    decode_quoted_printable_line(&self.line, &mut content)?;
                }
                TransferEncoding::Base64 => decode_base64_line(&self.line, &mut content)?,
                TransferEncoding::UUEncode => decode_uuencode_line(&self.line, &mut content)?,
                TransferEncoding::Unknown => {
                    return Err(Error::malformed("unknown content-transfer-encoding."));
                }
            }
        }

        Ok(content)
    }

    /// Tests the current line against `boundary`.
    #[must_use]
    pub fn test_boundary(&self, boundary: &str) -> BoundaryLine {
        let Some(rest) = self
            .line
            .strip_prefix(b"--")
            .and_then(|rest| rest.strip_prefix(boundary.as_bytes()))
        else {
            return BoundaryLine::None;
        };

        match rest {
            b"" => BoundaryLine::Open,
            b"--" => BoundaryLine::Close,
            _ => BoundaryLine::None,
        }
    }

    /// Reads a multipart body: preamble, then parts until the closing
    /// boundary.
    ///
    /// Preamble lines are appended to `preamble` with CRLF endings when a
    /// sink is given. Nested multipart parts are parsed recursively from
    /// their decoded content. Every part and the returned list are frozen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the content type has no
    /// boundary, the opening or closing boundary is missing, a non-empty
    /// line sits between parts, or a part fails to parse.
    pub fn parse_multipart(
        &mut self,
        content_type: &ContentType,
        mut preamble: Option<&mut String>,
    ) -> Result<PartList> {
        let boundary = content_type
            .boundary()
            .ok_or_else(|| Error::malformed("invalid multipart message, missing 'boundary'."))?;

        loop {
            if !self.read_line(false)? {
                return Err(Error::malformed("invalid multipart message, missing begin-boundary."));
            }
            if self.test_boundary(boundary) == BoundaryLine::Open {
                tracing::trace!(boundary, "found begin-boundary");
                break;
            }
            if let Some(sink) = preamble.as_deref_mut() {
                sink.push_str(&decode_header_bytes(&self.line));
                sink.push_str("\r\n");
            }
        }

        let mut parts = PartList::new();
        loop {
            match self.test_boundary(boundary) {
                BoundaryLine::Close => break,
                BoundaryLine::Open => {
                    let part = self.read_part(boundary)?;
                    tracing::debug!(
                        index = parts.len(),
                        encoding = ?part.content_transfer_encoding(),
                        multipart = part.parts().is_some(),
                        "read multipart part"
                    );
                    parts.push(part)?;
                }
                BoundaryLine::None => {
                    if !self.line.is_empty() {
                        return Err(Error::malformed(
                            "invalid multipart message, garbage in between parts.",
                        ));
                    }
                    if !self.read_line(false)? {
                        return Err(Error::malformed(
                            "invalid multipart message, missing end-boundary.",
                        ));
                    }
                }
            }
        }
        tracing::trace!(boundary, "found end-boundary");

        parts.set_collection_read_only();
        Ok(parts)
    }

    fn read_part(&mut self, boundary: &str) -> Result<Part> {
        let mut fields = self.read_fields()?;

        let encoding = fields
            .value("Content-Transfer-Encoding")
            .map_or(TransferEncoding::Text, |v| TransferEncoding::from_header(&v));
        let content_type = match fields.get("Content-Type") {
            Some(field) => Some(field.content_type()?.into_owned()),
            None => None,
        };

        let part = match content_type {
            Some(content_type) if content_type.is_multipart() => {
                let encoding = match encoding {
                    TransferEncoding::Text | TransferEncoding::SevenBit => TransferEncoding::EightBit,
                    other => other,
                };
                let content = self.read_data(encoding, Some(boundary))?;
                let mut nested =
                    MimeReader::with_line_capacity(Cursor::new(content.as_slice()), self.line_capacity);
                let parts = nested.parse_multipart(&content_type, None)?;
                fields.set_collection_read_only();
                Part::from_stream(fields, content, Some(parts))
            }
            _ => {
                let content = self.read_data(encoding, Some(boundary))?;
                fields.set_collection_read_only();
                Part::from_stream(fields, content, None)
            }
        };

        Ok(part)
    }
}

/// Decodes header or preamble bytes: UTF-8 when valid, windows-1252
/// otherwise.
pub(crate) fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
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

    fn reader(text: &str) -> MimeReader<Cursor<&[u8]>> {
        MimeReader::new(Cursor::new(text.as_bytes()))
    }

    fn lines(text: &str, unfolding: bool) -> Vec<String> {
        let mut reader = reader(text);
        let mut out = Vec::new();
        while reader.read_line(unfolding).unwrap() {
            out.push(String::from_utf8(reader.line().to_vec()).unwrap());
        }
        out
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(lines("a\r\nb\nc\rd", false), vec!["a", "b", "c", "d"]);
        assert_eq!(lines("a\r\n\r\nb\r\n", false), vec!["a", "", "b"]);
        assert!(lines("", false).is_empty());
    }

    #[test]
    fn test_unfolding() {
        assert_eq!(
            lines("Subject: a\r\n\tb\r\n  c\r\nTo: x\r\n", true),
            vec!["Subject: a b  c", "To: x"]
        );
        assert_eq!(lines("a\r\n b", false), vec!["a", " b"]);
        // An empty line never absorbs the next one.
        assert_eq!(lines("\r\n b", true), vec!["", " b"]);
    }

    #[test]
    fn test_line_too_long() {
        let config = Config::builder().line_capacity(8).build();
        let mut reader = MimeReader::with_config(Cursor::new(&b"123456789\r\n"[..]), &config);
        let err = reader.read_line(false).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("line too long"));

        let mut reader = MimeReader::with_config(Cursor::new(&b"12345678\r\n"[..]), &config);
        assert!(reader.read_line(false).unwrap());
    }

    #[test]
    fn test_position() {
        let mut reader = reader("ab\r\ncd");
        reader.read_line(false).unwrap();
        assert_eq!(reader.position(), 4);
        reader.read_line(false).unwrap();
        assert_eq!(reader.position(), 6);
        assert!(!reader.read_line(false).unwrap());
    }

    #[test]
    fn test_read_fields() {
        let mut reader = reader("From: a@example.com\r\nSubject: Hi\r\n there\r\nX-Empty:\r\n\r\nbody");
        let fields = reader.read_fields().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.value("subject").as_deref(), Some("Hi there"));
        assert_eq!(fields.value("X-Empty").as_deref(), Some(""));
        assert!(fields.get("From").unwrap().is_read_only());

        assert!(reader.read_line(false).unwrap());
        assert_eq!(reader.line(), b"body");
    }

    #[test]
    fn test_read_fields_errors() {
        let err = reader("From a@example.com\r\n\r\n").read_fields().unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("':' not found"));

        let err = reader("From:a@example.com\r\n\r\n").read_fields().unwrap_err();
        assert!(err.to_string().contains("': ' not found"));
    }

    #[test]
    fn test_header_offset() {
        let mut leading = reader("x-a: 1\r\nx-b: 2\r\nFrom: c\r\nx-d: 4\r\n\r\n");
        leading.read_fields().unwrap();
        assert_eq!(leading.header_offset(), Some(16));

        let mut none = reader("From: c\r\nx-a: 1\r\n\r\n");
        none.read_fields().unwrap();
        assert_eq!(none.header_offset(), None);

        // The prefix match is case-sensitive.
        let mut upper = reader("X-A: 1\r\n\r\n");
        upper.read_fields().unwrap();
        assert_eq!(upper.header_offset(), None);
    }

    #[test]
    fn test_latin1_header_fallback() {
        let mut reader = MimeReader::new(Cursor::new(&b"Subject: caf\xe9\r\n\r\n"[..]));
        let fields = reader.read_fields().unwrap();
        assert_eq!(fields.value("Subject").as_deref(), Some("caf\u{e9}"));
    }

    #[test]
    fn test_boundary_detection() {
        let cases = [
            ("--abc123", BoundaryLine::Open),
            ("--abc123--", BoundaryLine::Close),
            ("--abc124", BoundaryLine::None),
            ("--abc123-", BoundaryLine::None),
            ("--abc123 ", BoundaryLine::None),
            ("xyz", BoundaryLine::None),
            ("--abc", BoundaryLine::None),
        ];
        for (line, expected) in cases {
            let mut reader = reader(line);
            reader.read_line(false).unwrap();
            assert_eq!(reader.test_boundary("abc123"), expected, "line {line:?}");
        }
    }

    #[test]
    fn test_read_data_text() {
        let mut reader = reader("line 1\nline 2\r\n--B\r\nafter");
        let data = reader.read_data(TransferEncoding::Text, Some("B")).unwrap();
        assert_eq!(data, b"line 1\r\nline 2\r\n");
        assert_eq!(reader.test_boundary("B"), BoundaryLine::Open);
    }

    #[test]
    fn test_read_data_strict_text() {
        let mut reader = MimeReader::new(Cursor::new(&b"caf\xe9\r\n"[..]));
        assert!(reader.read_data(TransferEncoding::SevenBit, None).unwrap_err().is_malformed());

        let mut reader = MimeReader::new(Cursor::new(&b"caf\xe9\r\n"[..]));
        assert_eq!(reader.read_data(TransferEncoding::EightBit, None).unwrap(), b"caf\xe9\r\n");
    }

    #[test]
    fn test_read_data_base64_stops_at_empty_line() {
        let mut reader = reader("SGVsbG8s\r\nIHdvcmxk\r\n\r\nignored\r\n");
        let data = reader.read_data(TransferEncoding::Base64, None).unwrap();
        assert_eq!(data, b"Hello, world");
        assert!(reader.read_line(false).unwrap());
        assert_eq!(reader.line(), b"ignored");
    }

    #[test]
    fn test_read_data_quoted_printable() {
        let mut reader = reader("caf=C3=A9 =\r\nau lait\r\n");
        let data = reader.read_data(TransferEncoding::QuotedPrintable, None).unwrap();
        assert_eq!(data, "caf\u{e9} au lait\r\n".as_bytes());
    }

    #[test]
    fn test_read_data_unknown_encoding() {
        let err = reader("x\r\n").read_data(TransferEncoding::Unknown, None).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_parse_multipart() {
        let text = "preamble\r\n--B1\r\nContent-Type: text/plain\r\n\r\nfirst\r\n\
                    --B1\r\nContent-Transfer-Encoding: base64\r\n\r\nAAEC\r\n\r\n--B1--\r\nepilogue\r\n";
        let content_type = ContentType::parse("multipart/mixed; boundary=B1").unwrap();
        let mut preamble = String::new();
        let parts = reader(text).parse_multipart(&content_type, Some(&mut preamble)).unwrap();

        assert_eq!(preamble, "preamble\r\n");
        assert_eq!(parts.len(), 2);
        assert!(parts.is_read_only());
        assert_eq!(parts[0].content(), Some(&b"first\r\n"[..]));
        assert_eq!(parts[1].content(), Some(&[0_u8, 1, 2][..]));
        assert!(parts[1].fields().is_read_only());
    }

    #[test]
    fn test_parse_nested_multipart() {
        let text = "--outer\r\nContent-Type: multipart/alternative; boundary=inner\r\n\r\n\
                    --inner\r\nContent-Type: text/plain\r\n\r\nplain\r\n\
                    --inner\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n\
                    --inner--\r\n--outer--\r\n";
        let content_type = ContentType::parse("multipart/mixed; boundary=outer").unwrap();
        let parts = reader(text).parse_multipart(&content_type, None).unwrap();

        assert_eq!(parts.len(), 1);
        let nested = parts[0].parts().unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[1].content(), Some(&b"<p>html</p>\r\n"[..]));
    }

    #[test]
    fn test_parse_multipart_errors() {
        let no_boundary = ContentType::parse("multipart/mixed").unwrap();
        let err = reader("--B1\r\n").parse_multipart(&no_boundary, None).unwrap_err();
        assert!(err.to_string().contains("missing 'boundary'"));

        let content_type = ContentType::parse("multipart/mixed; boundary=B1").unwrap();

        let err = reader("just text\r\n").parse_multipart(&content_type, None).unwrap_err();
        assert!(err.to_string().contains("missing begin-boundary"));

        let err = reader("--B1\r\n\r\npart\r\n").parse_multipart(&content_type, None).unwrap_err();
        assert!(err.to_string().contains("missing end-boundary"));

        let text = "--B1\r\nContent-Transfer-Encoding: base64\r\n\r\nAAEC\r\n\r\njunk\r\n--B1--\r\n";
        let err = reader(text).parse_multipart(&content_type, None).unwrap_err();
        assert!(err.to_string().contains("garbage in between parts"));
    }
}

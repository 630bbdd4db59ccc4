//! Body parts and part lists.

use std::borrow::Cow;
use std::io::{Read, Write};
use std::ops::Index;

use crate::content_disposition::ContentDisposition;
use crate::content_type::{Charset, ContentType, TEXT_PLAIN};
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use crate::field::{Field, StructuredValue};
use crate::field_list::FieldList;
use crate::writer::MimeWriter;

/// Anything that serializes as a header block followed by content.
pub trait MimeEntity {
    /// Returns the header fields.
    fn header_fields(&self) -> &FieldList;

    /// Writes everything after the blank line that ends the headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if a multipart content type and
    /// the part list disagree, and propagates writer errors.
    fn write_content<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()>;

    /// Writes the header fields, a blank line and the content.
    ///
    /// # Errors
    ///
    /// See [`MimeEntity::write_content`].
    fn write_to<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        self.header_fields().write_to(writer)?;
        writer.write_newline()?;
        self.write_content(writer)
    }
}

/// A leaf or multipart body part.
///
/// A part with a multipart content type holds its children in
/// [`Part::parts`]; a leaf part holds decoded bytes in [`Part::content`].
/// A part read from a stream is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Part {
    fields: FieldList,
    content: Option<Vec<u8>>,
    content_len: usize,
    parts: Option<PartList>,
    root: bool,
}

impl Part {
    /// Creates an empty part.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the top-level part of a message.
    pub(crate) fn root(fields: FieldList) -> Self {
        Self {
            fields,
            root: true,
            ..Self::default()
        }
    }

    pub(crate) fn from_stream(fields: FieldList, content: Vec<u8>, parts: Option<PartList>) -> Self {
        Self {
            fields,
            content_len: content.len(),
            content: Some(content),
            parts,
            root: false,
        }
    }

    /// Creates a base64 attachment part.
    ///
    /// Sets `Content-Type` (with a `name` parameter), `Content-Disposition:
    /// attachment` with a `filename`, and `Content-Transfer-Encoding:
    /// base64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if `content_type` is read-only.
    pub fn attachment(name: &str, mut content_type: ContentType, data: Vec<u8>) -> Result<Self> {
        content_type.set_name(name)?;

        let mut part = Self::new();
        part.set_content_type(content_type)?;
        part.set_content_disposition(ContentDisposition::attachment(name))?;
        part.set_content_transfer_encoding(TransferEncoding::Base64)?;
        part.set_content(data)?;
        Ok(part)
    }

    /// Returns the header fields.
    #[must_use]
    pub const fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Returns the header fields for editing.
    pub fn fields_mut(&mut self) -> &mut FieldList {
        &mut self.fields
    }

    /// Returns true if the part was read from a stream.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.fields.is_read_only()
    }

    pub(crate) fn set_parts(&mut self, parts: PartList) {
        self.parts = Some(parts);
    }

    pub(crate) fn freeze(&mut self) {
        self.fields.set_collection_read_only();
        if let Some(parts) = &mut self.parts {
            parts.set_collection_read_only();
        }
    }

    /// Returns a structured header value, or `None` when the field is
    /// missing or blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the field does not parse.
    pub fn structured_field<T: StructuredValue>(&self, name: &str) -> Result<Option<Cow<'_, T>>> {
        match self.fields.get(name) {
            Some(field) if field.value().is_some_and(|v| !v.trim().is_empty()) => {
                field.structured().map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Sets a structured header value, creating the field when missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_structured_field<T: StructuredValue>(&mut self, name: &str, value: T) -> Result<()> {
        self.fields.entry(name)?.set_structured(value)
    }

    fn set_mime_field(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.add_mime_version()?;
        self.fields.set(name, value)
    }

    fn add_mime_version(&mut self) -> Result<()> {
        if self.root && !self.fields.contains("MIME-Version") {
            self.fields.push(Field::new("MIME-Version", "1.0"))?;
        }
        Ok(())
    }

    /// Returns the `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn content_type(&self) -> Result<Option<Cow<'_, ContentType>>> {
        self.structured_field("Content-Type")
    }

    /// Returns the `Content-Type` for editing, creating an empty one when
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn content_type_mut(&mut self) -> Result<&mut ContentType> {
        self.add_mime_version()?;
        self.fields.entry("Content-Type")?.structured_mut()
    }

    /// Sets the `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_type(&mut self, content_type: ContentType) -> Result<()> {
        self.add_mime_version()?;
        self.set_structured_field("Content-Type", content_type)
    }

    /// Returns the `Content-Transfer-Encoding`; a missing header reads as
    /// [`TransferEncoding::Text`].
    #[must_use]
    pub fn content_transfer_encoding(&self) -> TransferEncoding {
        self.fields
            .value("Content-Transfer-Encoding")
            .map_or(TransferEncoding::Text, |v| TransferEncoding::from_header(&v))
    }

    /// Sets the `Content-Transfer-Encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only or the
    /// encoding has no header name.
    pub fn set_content_transfer_encoding(&mut self, encoding: TransferEncoding) -> Result<()> {
        let value = encoding.as_header_value()?;
        self.set_mime_field("Content-Transfer-Encoding", value)
    }

    /// Returns the `Content-Disposition`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn content_disposition(&self) -> Result<Option<Cow<'_, ContentDisposition>>> {
        self.structured_field("Content-Disposition")
    }

    /// Sets the `Content-Disposition`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_disposition(&mut self, disposition: ContentDisposition) -> Result<()> {
        self.add_mime_version()?;
        self.set_structured_field("Content-Disposition", disposition)
    }

    /// Returns the `Content-Description`.
    #[must_use]
    pub fn content_description(&self) -> Option<Cow<'_, str>> {
        self.fields.value("Content-Description")
    }

    /// Sets the `Content-Description`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.set_mime_field("Content-Description", description)
    }

    /// Returns the `Content-Location`.
    #[must_use]
    pub fn content_location(&self) -> Option<Cow<'_, str>> {
        self.fields.value("Content-Location")
    }

    /// Sets the `Content-Location`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_location(&mut self, location: impl Into<String>) -> Result<()> {
        self.set_mime_field("Content-Location", location)
    }

    /// Returns the `Content-ID` as written, angle brackets included.
    #[must_use]
    pub fn content_id(&self) -> Option<Cow<'_, str>> {
        self.fields.value("Content-ID")
    }

    /// Sets the `Content-ID` to `<id>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_id(&mut self, id: &str) -> Result<()> {
        self.set_mime_field("Content-ID", format!("<{id}>"))
    }

    /// Returns the content-type `name` parameter. A content type that does
    /// not parse reads as no name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.content_type()
            .ok()
            .flatten()
            .and_then(|ct| ct.name())
    }

    /// Returns the decoded content bytes.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref().and_then(|c| c.get(..self.content_len))
    }

    /// Returns the logical content length.
    #[must_use]
    pub const fn content_len(&self) -> usize {
        self.content_len
    }

    /// Returns true if the part has content bytes.
    #[must_use]
    pub const fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Replaces the content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content(&mut self, content: Vec<u8>) -> Result<()> {
        let len = content.len();
        self.set_content_with_len(content, len)
    }

    /// Replaces the content with the first `len` bytes of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part is read-only or
    /// `len` exceeds the buffer.
    pub fn set_content_with_len(&mut self, buffer: Vec<u8>, len: usize) -> Result<()> {
        if self.fields.is_read_only() {
            return Err(Error::invalid("not allowed to change content."));
        }
        if len > buffer.len() {
            return Err(Error::invalid(format!(
                "content length {len} exceeds buffer of {} bytes.",
                buffer.len()
            )));
        }
        self.content = Some(buffer);
        self.content_len = len;
        Ok(())
    }

    /// Replaces the content with everything `reader` yields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails and
    /// [`Error::InvalidOperation`] if the part is read-only.
    pub fn set_content_from_reader(&mut self, mut reader: impl Read) -> Result<()> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        self.set_content(content)
    }

    /// Sets plain-text content in `charset`.
    ///
    /// US-ASCII text is sent as `7bit`, anything else as
    /// `quoted-printable`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for an unknown charset and
    /// [`Error::InvalidOperation`] if the text does not fit the charset or
    /// the part is read-only.
    pub fn set_text_content(&mut self, text: &str, charset: &str) -> Result<()> {
        let resolved = Charset::from_label(charset)?;
        let bytes = resolved.encode(text)?.into_owned();

        let mut content_type = ContentType::new(TEXT_PLAIN);
        content_type.set_charset(match resolved {
            Charset::Ascii => "us-ascii",
            Charset::Encoding(_) => charset.trim(),
        })?;
        self.set_content_type(content_type)?;
        self.set_content_transfer_encoding(match resolved {
            Charset::Ascii => TransferEncoding::SevenBit,
            Charset::Encoding(_) => TransferEncoding::QuotedPrintable,
        })?;
        self.set_content(bytes)
    }

    /// Decodes the content through the content-type charset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the content type or its charset
    /// is not understood.
    pub fn text_content(&self) -> Result<Option<String>> {
        let Some(content) = self.content() else {
            return Ok(None);
        };
        let charset = match self.content_type()? {
            Some(content_type) => content_type.charset_encoding()?,
            None => Charset::Ascii,
        };
        Ok(Some(charset.decode(content).into_owned()))
    }

    /// Returns the child parts of a multipart part.
    #[must_use]
    pub const fn parts(&self) -> Option<&PartList> {
        self.parts.as_ref()
    }

    /// Returns the child parts for editing, creating an empty list when
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if a read-only part has no
    /// list.
    pub fn parts_mut(&mut self) -> Result<&mut PartList> {
        if self.parts.is_none() && self.fields.is_read_only() {
            return Err(Error::invalid("not allowed to add parts."));
        }
        Ok(self.parts.get_or_insert_with(PartList::new))
    }

    /// Appends a child part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the part list is read-only.
    pub fn add_part(&mut self, part: Self) -> Result<()> {
        self.parts_mut()?.push(part)
    }
}

impl MimeEntity for Part {
    fn header_fields(&self) -> &FieldList {
        &self.fields
    }

    fn write_content<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        let content_type = self.content_type()?;
        let has_parts = self.parts.as_ref().is_some_and(|p| !p.is_empty());

        match content_type.as_deref() {
            Some(content_type) if content_type.is_multipart() => {
                let Some(parts) = self.parts.as_ref().filter(|_| has_parts) else {
                    return Err(Error::malformed("multipart without parts."));
                };
                let boundary = content_type
                    .boundary()
                    .ok_or_else(|| Error::malformed("invalid multipart message, missing 'boundary'."))?;

                for part in parts {
                    writer.write_boundary(boundary, false)?;
                    part.write_to(writer)?;
                }
                writer.write_boundary(boundary, true)
            }
            _ if has_parts => Err(Error::malformed("part is multipart but content-type is not.")),
            _ => match self.content() {
                Some(content) => writer.write_content(content, self.content_transfer_encoding()),
                None => Ok(()),
            },
        }
    }
}

/// Ordered list of body parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartList {
    parts: Vec<Part>,
    read_only: bool,
}

impl PartList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parts: Vec::new(),
            read_only: false,
        }
    }

    /// Returns the number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if there are no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the part at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Returns the part at `index` for editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is out of range.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Part> {
        self.check_writable("change part")?;
        self.parts
            .get_mut(index)
            .ok_or_else(|| Error::invalid(format!("part index {index} out of range.")))
    }

    /// Iterates over the parts.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Appends a part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn push(&mut self, part: Part) -> Result<()> {
        self.check_writable("add part")?;
        self.parts.push(part);
        Ok(())
    }

    /// Appends several parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn extend(&mut self, parts: impl IntoIterator<Item = Part>) -> Result<()> {
        self.check_writable("add parts")?;
        self.parts.extend(parts);
        Ok(())
    }

    /// Inserts a part at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is past the end.
    pub fn insert(&mut self, index: usize, part: Part) -> Result<()> {
        self.check_writable("insert part")?;
        if index > self.parts.len() {
            return Err(Error::invalid(format!("insert index {index} out of range.")));
        }
        self.parts.insert(index, part);
        Ok(())
    }

    /// Removes and returns the part at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only or
    /// `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<Part> {
        self.check_writable("remove part")?;
        if index >= self.parts.len() {
            return Err(Error::invalid(format!("remove index {index} out of range.")));
        }
        Ok(self.parts.remove(index))
    }

    /// Keeps only the parts matching `keep`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn retain(&mut self, keep: impl FnMut(&Part) -> bool) -> Result<()> {
        self.check_writable("remove part")?;
        self.parts.retain(keep);
        Ok(())
    }

    /// Removes every part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the list is read-only.
    pub fn clear(&mut self) -> Result<()> {
        self.check_writable("clear parts")?;
        self.parts.clear();
        Ok(())
    }

    /// Returns true if the collection can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the collection.
    pub fn set_collection_read_only(&mut self) {
        self.read_only = true;
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to {what}.")));
        }
        Ok(())
    }
}

impl Index<usize> for PartList {
    type Output = Part;

    fn index(&self, index: usize) -> &Part {
        &self.parts[index]
    }
}

impl<'a> IntoIterator for &'a PartList {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl FromIterator<Part> for PartList {
    fn from_iter<I: IntoIterator<Item = Part>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
            read_only: false,
        }
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
    use crate::content_type::{APPLICATION_PDF, MULTIPART_MIXED};

    fn written(part: &Part) -> Result<String> {
        let mut writer = MimeWriter::new(Vec::new());
        part.write_to(&mut writer)?;
        Ok(String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn test_text_content_ascii() {
        let mut part = Part::new();
        part.set_text_content("Hello\nWorld", "US-ASCII").unwrap();

        assert_eq!(part.content_transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.content_type().unwrap().unwrap().charset(), Some("us-ascii"));
        assert!(!part.fields().contains("MIME-Version"));
        assert_eq!(
            written(&part).unwrap(),
            "Content-Type: text/plain; charset=\"us-ascii\"\r\n\
             Content-Transfer-Encoding: 7bit\r\n\r\nHello\r\nWorld\r\n"
        );
    }

    #[test]
    fn test_text_content_utf8() {
        let mut part = Part::new();
        part.set_text_content("Caf\u{e9}", "utf-8").unwrap();

        assert_eq!(part.content_transfer_encoding(), TransferEncoding::QuotedPrintable);
        assert_eq!(part.content(), Some("Caf\u{e9}".as_bytes()));
        assert_eq!(part.text_content().unwrap().as_deref(), Some("Caf\u{e9}"));
        assert!(written(&part).unwrap().ends_with("\r\n\r\nCaf=C3=A9=\r\n"));
    }

    #[test]
    fn test_text_content_errors() {
        let mut part = Part::new();
        assert!(part.set_text_content("x", "no-such-charset").unwrap_err().is_malformed());
        assert!(part.set_text_content("Caf\u{e9}", "us-ascii").unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_attachment() {
        let part = Part::attachment("report.pdf", ContentType::new(APPLICATION_PDF), vec![0, 1, 2]).unwrap();

        assert_eq!(part.name().as_deref(), Some("report.pdf"));
        assert_eq!(part.content_transfer_encoding(), TransferEncoding::Base64);
        let disposition = part.content_disposition().unwrap().unwrap();
        assert!(disposition.is_attachment());
        assert_eq!(disposition.filename().as_deref(), Some("report.pdf"));
        assert!(written(&part).unwrap().ends_with("\r\n\r\nAAEC\r\n"));
    }

    #[test]
    fn test_content_headers() {
        let mut part = Part::new();
        part.set_content_id("logo@example.com").unwrap();
        part.set_content_description("Company logo").unwrap();
        part.set_content_location("http://example.com/logo.png").unwrap();

        assert_eq!(part.content_id().as_deref(), Some("<logo@example.com>"));
        assert_eq!(part.content_description().as_deref(), Some("Company logo"));
        assert_eq!(part.content_location().as_deref(), Some("http://example.com/logo.png"));
        assert_eq!(part.content_transfer_encoding(), TransferEncoding::Text);
        assert!(part.content_type().unwrap().is_none());
        assert!(part.set_content_transfer_encoding(TransferEncoding::Text).is_err());
    }

    #[test]
    fn test_name_ignores_bad_content_type() {
        let mut part = Part::new();
        part.fields_mut().set("Content-Type", "\"broken").unwrap();
        assert!(part.content_type().is_err());
        assert_eq!(part.name(), None);
    }

    #[test]
    fn test_content_with_len() {
        let mut part = Part::new();
        part.set_content_with_len(b"abcdef".to_vec(), 3).unwrap();
        assert_eq!(part.content(), Some(&b"abc"[..]));
        assert_eq!(part.content_len(), 3);

        let err = part.set_content_with_len(b"ab".to_vec(), 3).unwrap_err();
        assert!(err.is_invalid_operation());
        assert_eq!(part.content(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_content_from_reader() {
        let mut part = Part::new();
        part.set_content_from_reader(&b"streamed"[..]).unwrap();
        assert_eq!(part.content(), Some(&b"streamed"[..]));
        assert!(part.has_content());
    }

    #[test]
    fn test_write_multipart() {
        let mut part = Part::new();
        let mut content_type = ContentType::new(MULTIPART_MIXED);
        content_type.set_boundary("B1").unwrap();
        part.set_content_type(content_type).unwrap();

        let mut first = Part::new();
        first.set_text_content("one", "us-ascii").unwrap();
        part.add_part(first).unwrap();
        let mut second = Part::new();
        second.set_text_content("two", "us-ascii").unwrap();
        part.add_part(second).unwrap();

        let out = written(&part).unwrap();
        let markers: Vec<_> = out.lines().filter(|l| l.starts_with("--B1")).collect();
        assert_eq!(markers, vec!["--B1", "--B1", "--B1--"]);
        assert!(out.ends_with("two\r\n--B1--\r\n"));
    }

    #[test]
    fn test_write_multipart_without_parts() {
        let mut part = Part::new();
        part.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();
        let err = written(&part).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("multipart without parts"));
    }

    #[test]
    fn test_write_parts_without_multipart() {
        let mut part = Part::new();
        part.set_content_type(ContentType::new(TEXT_PLAIN)).unwrap();
        part.add_part(Part::new()).unwrap();
        let err = written(&part).unwrap_err();
        assert!(err.to_string().contains("part is multipart but content-type is not"));
    }

    #[test]
    fn test_read_only_part() {
        let mut fields = FieldList::new();
        fields.push(Field::read_only("Content-Type", "text/plain")).unwrap();
        let mut part = Part::from_stream(fields, b"x\r\n".to_vec(), None);
        part.freeze();

        assert!(part.is_read_only());
        assert!(part.set_content(Vec::new()).unwrap_err().is_invalid_operation());
        assert!(part.parts_mut().is_err());
        assert!(part.set_content_id("x").is_err());
        assert!(part.content_type_mut().is_err());
        assert_eq!(part.content(), Some(&b"x\r\n"[..]));
    }

    #[test]
    fn test_part_list_read_only() {
        let mut parts: PartList = [Part::new(), Part::new()].into_iter().collect();
        parts.set_collection_read_only();

        assert!(parts.push(Part::new()).unwrap_err().is_invalid_operation());
        assert!(parts.extend([Part::new()]).is_err());
        assert!(parts.insert(0, Part::new()).is_err());
        assert!(parts.remove(0).is_err());
        assert!(parts.retain(|_| false).is_err());
        assert!(parts.clear().is_err());
        assert!(parts.get_mut(0).is_err());
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_part_list_edit() {
        let mut parts = PartList::new();
        parts.push(Part::new()).unwrap();
        let mut named = Part::new();
        named.set_content_id("a").unwrap();
        parts.insert(0, named).unwrap();
        assert_eq!(parts[0].content_id().as_deref(), Some("<a>"));
        assert!(parts.insert(5, Part::new()).is_err());
        assert!(parts.remove(5).is_err());
        assert_eq!(parts.remove(1).unwrap(), Part::new());
        assert_eq!(parts.iter().count(), 1);
    }
}

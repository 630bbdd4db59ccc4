//! Top-level mail messages.

use std::borrow::Cow;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::address::Address;
use crate::address_list::AddressList;
use crate::config::Config;
use crate::date::format_date;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::field_list::FieldList;
use crate::host::{HostName, SystemHostName};
use crate::part::{MimeEntity, Part};
use crate::reader::{MimeReader, decode_header_bytes};
use crate::writer::MimeWriter;

/// A complete mail message.
///
/// Dereferences to its top-level [`Part`] for the MIME conveniences. Setting
/// any `Content-*` header through it adds `MIME-Version: 1.0` first.
///
/// # Example
///
/// ```
/// use mimecodec::Message;
///
/// let raw = "From: John Doe <john@example.com>\r\n\
///            Subject: Test\r\n\
///            MIME-Version: 1.0\r\n\
///            Content-Type: text/plain\r\n\
///            \r\n\
///            Hello, World!\r\n";
///
/// let message = Message::parse(raw.as_bytes())?;
/// assert_eq!(message.subject().as_deref(), Some("Test"));
/// assert_eq!(message.content(), Some(&b"Hello, World!\r\n"[..]));
/// # Ok::<(), mimecodec::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    part: Part,
    body: Option<String>,
    guid: Option<String>,
    header_offset: Option<u64>,
}

impl Message {
    /// Creates a message with a fresh `Message-ID`, empty `From`, `To` and
    /// `Subject` fields and the current `Date`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_host_name(&SystemHostName)
    }

    /// Like [`Message::new`], taking the `Message-ID` host from `host`.
    #[must_use]
    pub fn with_host_name(host: &impl HostName) -> Self {
        let guid = Uuid::new_v4().simple().to_string();
        let fields: FieldList = [
            Field::new("Message-ID", format!("<{guid}@{}>", host.host_name())),
            Field::empty("From"),
            Field::empty("To"),
            Field::empty("Subject"),
            Field::new("Date", format_date(&Utc::now())),
        ]
        .into_iter()
        .collect();

        Self {
            part: Part::root(fields),
            body: None,
            guid: Some(guid),
            header_offset: None,
        }
    }

    /// Parses a message with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Message::parse_with`].
    pub fn parse(input: impl Read) -> Result<Self> {
        Self::parse_with(input, &Config::default())
    }

    /// Parses a message. The result and all of its parts are read-only.
    ///
    /// A message with `MIME-Version` must have a `Content-Type`; its body is
    /// decoded into [`Part::content`] or split into parts, and a multipart
    /// preamble becomes [`Message::body`]. Without `MIME-Version` every
    /// body line goes to [`Message::body`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for any structural problem and
    /// [`Error::Io`] if reading fails.
    pub fn parse_with(input: impl Read, config: &Config) -> Result<Self> {
        let mut reader = MimeReader::with_config(BufReader::new(input), config);

        let mut part = Part::root(reader.read_fields()?);
        let mut body = String::new();
        let mime = part.fields().contains("MIME-Version");

        if mime {
            let content_type = part
                .content_type()?
                .ok_or_else(|| Error::malformed("invalid mime message, missing 'Content-Type'."))?
                .into_owned();

            if content_type.is_multipart() {
                let parts = reader.parse_multipart(&content_type, Some(&mut body))?;
                part.set_parts(parts);
            } else {
                let content = reader.read_data(part.content_transfer_encoding(), None)?;
                part.set_content(content)?;
            }
        } else {
            while reader.read_line(false)? {
                body.push_str(&decode_header_bytes(reader.line()));
                body.push_str("\r\n");
            }
        }

        part.freeze();
        tracing::debug!(
            fields = part.fields().len(),
            mime,
            parts = part.parts().map_or(0, |p| p.len()),
            bytes = reader.position(),
            "parsed message"
        );

        Ok(Self {
            part,
            body: Some(body),
            guid: None,
            header_offset: reader.header_offset(),
        })
    }

    /// Writes the message with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Message::write_to_with`].
    pub fn write_to(&self, output: impl Write) -> Result<()> {
        self.write_to_with(output, &Config::default())
    }

    /// Writes the message. `Bcc` is never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if a multipart content type and
    /// the part list disagree or text content has 8-bit bytes, and
    /// [`Error::InvalidOperation`] for a transfer encoding that cannot be
    /// written.
    pub fn write_to_with(&self, output: impl Write, config: &Config) -> Result<()> {
        tracing::debug!(
            fields = self.fields().len(),
            parts = self.parts().map_or(0, |p| p.len()),
            "writing message"
        );

        let mut writer = MimeWriter::with_config(BufWriter::new(output), config);
        MimeEntity::write_to(self, &mut writer)?;
        writer.flush()
    }

    /// Serializes the message into a byte vector.
    ///
    /// # Errors
    ///
    /// See [`Message::write_to_with`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Returns the body text of a non-MIME message, or the preamble of a
    /// multipart one.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Replaces the body text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_body(&mut self, body: impl Into<String>) -> Result<()> {
        if self.part.is_read_only() {
            return Err(Error::invalid("not allowed to change body."));
        }
        self.body = Some(body.into());
        Ok(())
    }

    /// Returns the id generated for a new message; parsed messages have
    /// none.
    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    /// Returns the stream offset past the leading `x-` headers, if any.
    #[must_use]
    pub const fn header_offset(&self) -> Option<u64> {
        self.header_offset
    }

    /// Returns the `From` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn from(&self) -> Result<Option<Cow<'_, Address>>> {
        self.structured_field("From")
    }

    /// Sets the `From` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_from(&mut self, address: Address) -> Result<()> {
        self.set_structured_field("From", address)
    }

    /// Returns the `Sender` address, falling back to `From`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn sender(&self) -> Result<Option<Cow<'_, Address>>> {
        match self.structured_field("Sender")? {
            Some(sender) => Ok(Some(sender)),
            None => self.from(),
        }
    }

    /// Sets the `Sender` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_sender(&mut self, address: Address) -> Result<()> {
        self.set_structured_field("Sender", address)
    }

    /// Returns the `Reply-To` address, falling back to `Sender` and then
    /// `From`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn reply_to(&self) -> Result<Option<Cow<'_, Address>>> {
        match self.structured_field("Reply-To")? {
            Some(reply_to) => Ok(Some(reply_to)),
            None => self.sender(),
        }
    }

    /// Sets the `Reply-To` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_reply_to(&mut self, address: Address) -> Result<()> {
        self.set_structured_field("Reply-To", address)
    }

    /// Returns the `To` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn to(&self) -> Result<Option<Cow<'_, AddressList>>> {
        self.structured_field("To")
    }

    /// Sets the `To` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_to(&mut self, addresses: AddressList) -> Result<()> {
        self.set_structured_field("To", addresses)
    }

    /// Returns the `To` recipients for editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only and
    /// [`Error::MalformedInput`] if the current value does not parse.
    pub fn to_mut(&mut self) -> Result<&mut AddressList> {
        self.fields_mut().entry("To")?.structured_mut()
    }

    /// Returns the `Cc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn cc(&self) -> Result<Option<Cow<'_, AddressList>>> {
        self.structured_field("Cc")
    }

    /// Sets the `Cc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_cc(&mut self, addresses: AddressList) -> Result<()> {
        self.set_structured_field("Cc", addresses)
    }

    /// Returns the `Cc` recipients for editing.
    ///
    /// # Errors
    ///
    /// Same as [`Message::to_mut`].
    pub fn cc_mut(&mut self) -> Result<&mut AddressList> {
        self.fields_mut().entry("Cc")?.structured_mut()
    }

    /// Returns the `Bcc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the header does not parse.
    pub fn bcc(&self) -> Result<Option<Cow<'_, AddressList>>> {
        self.structured_field("Bcc")
    }

    /// Sets the `Bcc` recipients. They are kept in memory but never
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_bcc(&mut self, addresses: AddressList) -> Result<()> {
        self.set_structured_field("Bcc", addresses)
    }

    /// Returns the `Bcc` recipients for editing.
    ///
    /// # Errors
    ///
    /// Same as [`Message::to_mut`].
    pub fn bcc_mut(&mut self) -> Result<&mut AddressList> {
        self.fields_mut().entry("Bcc")?.structured_mut()
    }

    /// Returns the `Message-ID` without angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        let id = self.fields().value("Message-ID")?;
        let stripped = id
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(&id);
        Some(stripped.to_owned())
    }

    /// Sets the `Message-ID` to `<id>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_message_id(&mut self, id: &str) -> Result<()> {
        self.fields_mut().set("Message-ID", format!("<{id}>"))
    }

    /// Returns the `Subject` as written.
    #[must_use]
    pub fn subject(&self) -> Option<Cow<'_, str>> {
        self.fields().value("Subject")
    }

    /// Returns the `Subject` with encoded-words decoded.
    #[must_use]
    pub fn decoded_subject(&self) -> Option<String> {
        self.fields().get("Subject").and_then(Field::decoded_value)
    }

    /// Sets the `Subject`; non-ASCII text is encoded when written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        self.fields_mut().set("Subject", subject)
    }

    /// Returns the `Date`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the date does not parse.
    pub fn date(&self) -> Result<Option<DateTime<Utc>>> {
        match self.fields().get("Date") {
            Some(field) if field.value().is_some_and(|v| !v.trim().is_empty()) => {
                field.date_time().map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Sets the `Date`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the message is read-only.
    pub fn set_date(&mut self, date: &DateTime<Utc>) -> Result<()> {
        self.fields_mut().entry("Date")?.set_date_time(date)
    }

    /// Returns the `MIME-Version`.
    #[must_use]
    pub fn mime_version(&self) -> Option<Cow<'_, str>> {
        self.fields().value("MIME-Version")
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Message {
    type Target = Part;

    fn deref(&self) -> &Part {
        &self.part
    }
}

impl DerefMut for Message {
    fn deref_mut(&mut self) -> &mut Part {
        &mut self.part
    }
}

impl MimeEntity for Message {
    fn header_fields(&self) -> &FieldList {
        self.part.fields()
    }

    fn write_content<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        if !self.part.fields().contains("MIME-Version") {
            return match &self.body {
                Some(body) => writer.write_body(body),
                None => Ok(()),
            };
        }

        if self.part.content_type()?.is_some_and(|ct| ct.is_multipart()) {
            let preamble = match &self.body {
                Some(body) => body.clone(),
                None if writer.preamble().is_empty() => String::new(),
                None => format!("{}\r\n\r\n", writer.preamble()),
            };
            writer.write_body(&preamble)?;
        }

        self.part.write_content(writer)
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
    use crate::content_type::{ContentType, MULTIPART_MIXED};
    use crate::encoding::TransferEncoding;
    use crate::host::FixedHostName;
    use chrono::TimeZone;

    fn new_message() -> Message {
        Message::with_host_name(&FixedHostName::new("host.example"))
    }

    fn parse(text: &str) -> Message {
        Message::parse(text.as_bytes()).unwrap()
    }

    fn written(message: &Message) -> String {
        String::from_utf8(message.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_new_message_defaults() {
        let message = new_message();
        let names: Vec<_> = message.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["Message-ID", "From", "To", "Subject", "Date"]);

        let guid = message.guid().unwrap();
        assert_eq!(guid.len(), 32);
        assert_eq!(message.message_id(), Some(format!("{guid}@host.example")));
        assert!(message.date().unwrap().is_some());
        assert!(message.from().unwrap().is_none());
        assert!(message.to().unwrap().is_none());
        assert!(message.mime_version().is_none());
        assert_ne!(new_message().guid(), message.guid());
    }

    #[test]
    fn test_content_headers_add_mime_version() {
        let mut message = new_message();
        message.set_text_content("Hi", "us-ascii").unwrap();

        let names: Vec<_> = message.fields().iter().map(Field::name).collect();
        assert_eq!(
            names,
            vec![
                "Message-ID",
                "From",
                "To",
                "Subject",
                "Date",
                "MIME-Version",
                "Content-Type",
                "Content-Transfer-Encoding"
            ]
        );
        assert_eq!(message.mime_version().as_deref(), Some("1.0"));
    }

    #[test]
    fn test_write_new_message() {
        let mut message = new_message();
        message.set_from(Address::with_display_name("john@example.com", "John Doe")).unwrap();
        message.to_mut().unwrap().push(Address::new("jane@example.com")).unwrap();
        message.set_bcc(AddressList::parse("hidden@example.com").unwrap()).unwrap();
        message.set_subject("Hello").unwrap();
        message.set_date(&Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()).unwrap();
        message.set_text_content("Hi there", "us-ascii").unwrap();

        let out = written(&message);
        let headers = out.split("\r\n\r\n").next().unwrap();
        assert!(headers.contains("From: \"John Doe\" <john@example.com>\r\n"));
        assert!(headers.contains("To: <jane@example.com>\r\n"));
        assert!(headers.contains("Subject: Hello\r\n"));
        assert!(headers.contains("Date: Tue, 02 Jan 2024 03:04:05 GMT\r\n"));
        assert!(!out.contains("Bcc"));
        assert!(out.ends_with("\r\n\r\nHi there\r\n"));
        assert_eq!(message.bcc().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_single_part() {
        let message = parse(
            "From: John Doe <john@example.com>\r\nTo: a@example.com, b@example.com\r\n\
             Subject: =?utf-8?Q?Caf=C3=A9?=\r\nMIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\r\nCaf=C3=A9\r\n",
        );

        let from = message.from().unwrap().unwrap();
        assert_eq!(from.display_name(), Some("John Doe"));
        assert_eq!(from.address(), "john@example.com");
        assert_eq!(message.to().unwrap().unwrap().len(), 2);
        assert_eq!(message.decoded_subject().as_deref(), Some("Caf\u{e9}"));
        assert_eq!(message.text_content().unwrap().as_deref(), Some("Caf\u{e9}\r\n"));
        assert_eq!(message.body(), Some(""));
        assert!(message.guid().is_none());
    }

    #[test]
    fn test_parse_requires_content_type() {
        let err = Message::parse(&b"MIME-Version: 1.0\r\n\r\nbody\r\n"[..]).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("missing 'Content-Type'"));
    }

    #[test]
    fn test_parse_missing_colon() {
        let err = Message::parse(&b"From john@example.com\r\n\r\n"[..]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_non_mime_body() {
        let message = parse("Subject: old\r\n\r\nline one\r\n\r\nline two");
        assert_eq!(message.body(), Some("line one\r\n\r\nline two\r\n"));
        assert!(message.content().is_none());
        assert_eq!(written(&message), "Subject: old\r\n\r\nline one\r\n\r\nline two\r\n");
    }

    #[test]
    fn test_non_ascii_body_is_not_written() {
        let message = Message::parse(&b"Subject: x\r\n\r\ncaf\xe9\r\n"[..]).unwrap();
        assert_eq!(message.body(), Some("caf\u{e9}\r\n"));
        assert!(message.to_bytes().unwrap_err().is_malformed());

        let mut message = Message::with_host_name(&FixedHostName::new("h"));
        message.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();
        let mut part = Part::new();
        part.set_text_content("ok", "us-ascii").unwrap();
        message.add_part(part).unwrap();
        message.set_body("pr\u{e9}ambule\r\n").unwrap();
        assert!(message.to_bytes().unwrap_err().is_malformed());
    }

    #[test]
    fn test_sender_fallbacks() {
        let message = parse("From: a@example.com\r\n\r\n");
        assert_eq!(message.sender().unwrap().unwrap().address(), "a@example.com");
        assert_eq!(message.reply_to().unwrap().unwrap().address(), "a@example.com");

        let message = parse("From: a@example.com\r\nSender: s@example.com\r\n\r\n");
        assert_eq!(message.reply_to().unwrap().unwrap().address(), "s@example.com");

        let message =
            parse("From: a@example.com\r\nSender: s@example.com\r\nReply-To: r@example.com\r\n\r\n");
        assert_eq!(message.reply_to().unwrap().unwrap().address(), "r@example.com");
        assert_eq!(message.sender().unwrap().unwrap().address(), "s@example.com");
    }

    #[test]
    fn test_absent_fields_read_as_none() {
        let message = parse("Subject: x\r\nCc: \r\n\r\n");
        assert!(message.from().unwrap().is_none());
        assert!(message.sender().unwrap().is_none());
        assert!(message.reply_to().unwrap().is_none());
        assert!(message.cc().unwrap().is_none());
        assert!(message.bcc().unwrap().is_none());
        assert!(message.date().unwrap().is_none());
        assert!(message.message_id().is_none());
    }

    #[test]
    fn test_parsed_message_is_read_only() {
        let mut message = parse("Subject: x\r\nTo: a@example.com\r\n\r\nbody\r\n");
        assert!(message.set_subject("y").unwrap_err().is_invalid_operation());
        assert!(message.set_body("y").is_err());
        assert!(message.to_mut().is_err());
        assert!(message.set_text_content("y", "us-ascii").is_err());
        assert!(message.fields_mut().clear().is_err());
        assert_eq!(message.subject().as_deref(), Some("x"));
    }

    #[test]
    fn test_header_offset() {
        let message = parse("x-spool: 1\r\nFrom: a@example.com\r\n\r\n");
        assert_eq!(message.header_offset(), Some(12));
        assert_eq!(parse("From: a@example.com\r\n\r\n").header_offset(), None);
    }

    #[test]
    fn test_message_id_round_trip() {
        let mut message = new_message();
        message.set_message_id("abc@example.com").unwrap();
        assert_eq!(message.fields().value("Message-ID").as_deref(), Some("<abc@example.com>"));
        assert_eq!(message.message_id().as_deref(), Some("abc@example.com"));
    }

    #[test]
    fn test_multipart_preamble() {
        let mut message = new_message();
        let mut content_type = ContentType::new(MULTIPART_MIXED);
        content_type.set_boundary("B1").unwrap();
        message.set_content_type(content_type).unwrap();
        let mut part = Part::new();
        part.set_text_content("one", "us-ascii").unwrap();
        message.add_part(part).unwrap();

        let out = written(&message);
        assert!(out.contains("\r\n\r\nThis is a multi-part message in MIME format.\r\n\r\n--B1\r\n"));

        let config = Config::builder().preamble("").build();
        let mut bytes = Vec::new();
        message.write_to_with(&mut bytes, &config).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("\r\n\r\n--B1\r\n"));

        message.set_body("Custom preamble\r\n").unwrap();
        assert!(written(&message).contains("\r\n\r\nCustom preamble\r\n--B1\r\n"));
    }

    #[test]
    fn test_write_without_encoder() {
        let mut message = new_message();
        message.set_content_type(ContentType::new("application/octet-stream")).unwrap();
        message.set_content_transfer_encoding(TransferEncoding::Binary).unwrap();
        message.set_content(vec![0, 1]).unwrap();
        assert!(message.to_bytes().unwrap_err().is_invalid_operation());
    }
}

//! Header fields.
//!
//! A field carries either its raw text or one parsed structured value.
//! Writing one side clears the other, so there is always exactly one
//! authoritative representation.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::address::Address;
use crate::address_list::AddressList;
use crate::content_disposition::ContentDisposition;
use crate::content_type::ContentType;
use crate::date::{format_date, parse_date};
use crate::encoding::decode_words;
use crate::error::{Error, Result};
use crate::writer::{MimeWriter, WriteValue};

/// Parsed value cached on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structured {
    /// Single mailbox (`From`, `Sender`, `Reply-To`).
    Address(Address),
    /// Mailbox list (`To`, `Cc`, `Bcc`).
    AddressList(AddressList),
    /// `Content-Type`
    ContentType(ContentType),
    /// `Content-Disposition`
    ContentDisposition(ContentDisposition),
}

impl WriteValue for Structured {
    fn has_data(&self) -> bool {
        match self {
            Self::Address(v) => v.has_data(),
            Self::AddressList(v) => v.has_data(),
            Self::ContentType(v) => v.has_data(),
            Self::ContentDisposition(v) => v.has_data(),
        }
    }

    fn write_value<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        match self {
            Self::Address(v) => v.write_value(writer),
            Self::AddressList(v) => v.write_value(writer),
            Self::ContentType(v) => v.write_value(writer),
            Self::ContentDisposition(v) => v.write_value(writer),
        }
    }
}

impl fmt::Display for Structured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(v) => fmt::Display::fmt(v, f),
            Self::AddressList(v) => fmt::Display::fmt(v, f),
            Self::ContentType(v) => fmt::Display::fmt(v, f),
            Self::ContentDisposition(v) => fmt::Display::fmt(v, f),
        }
    }
}

/// Glue between a structured type and its [`Structured`] slot.
pub trait StructuredValue: Clone + Default + Sized {
    /// Parses the raw header text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for unparsable text.
    fn parse_value(text: &str, read_only: bool) -> Result<Self>;

    /// Borrows the value if the slot holds this type.
    fn from_slot(slot: &Structured) -> Option<&Self>;

    /// Mutably borrows the value if the slot holds this type.
    fn from_slot_mut(slot: &mut Structured) -> Option<&mut Self>;

    /// Wraps the value in a slot.
    fn into_slot(self) -> Structured;
}

macro_rules! structured_value {
    ($ty:ident) => {
        impl StructuredValue for $ty {
            fn parse_value(text: &str, read_only: bool) -> Result<Self> {
                Self::parse_with(text, read_only)
            }

            fn from_slot(slot: &Structured) -> Option<&Self> {
                match slot {
                    Structured::$ty(v) => Some(v),
                    _ => None,
                }
            }

            fn from_slot_mut(slot: &mut Structured) -> Option<&mut Self> {
                match slot {
                    Structured::$ty(v) => Some(v),
                    _ => None,
                }
            }

            fn into_slot(self) -> Structured {
                Structured::$ty(self)
            }
        }
    };
}

structured_value!(Address);
structured_value!(AddressList);
structured_value!(ContentType);
structured_value!(ContentDisposition);

/// A single `Name: value` header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    raw: Option<String>,
    parsed: Option<Structured>,
    read_only: bool,
}

impl Field {
    /// Creates a field with a raw value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: Some(value.into()),
            parsed: None,
            read_only: false,
        }
    }

    /// Creates a field without a value.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: None,
            parsed: None,
            read_only: false,
        }
    }

    /// Creates a frozen field, as produced by the reader.
    pub(crate) fn read_only(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::new(name, value)
        }
    }

    /// Returns the field name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the name matches, ignoring ASCII case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true if the field can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns true if neither a raw nor a structured value is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_none() && self.parsed.is_none()
    }

    /// Returns the raw text exactly as set or read.
    #[must_use]
    pub fn raw_value(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Returns the current value as text.
    ///
    /// On a writable field a structured value is rendered; a read-only
    /// field always reports its original text.
    #[must_use]
    pub fn value(&self) -> Option<Cow<'_, str>> {
        match (&self.parsed, self.read_only) {
            (Some(parsed), false) => Some(Cow::Owned(parsed.to_string())),
            _ => self.raw.as_deref().map(Cow::Borrowed),
        }
    }

    /// Replaces the value with raw text, discarding any structured value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn set_value(&mut self, value: impl Into<String>) -> Result<()> {
        self.check_writable()?;
        self.parsed = None;
        self.raw = Some(value.into());
        Ok(())
    }

    /// Removes the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn clear_value(&mut self) -> Result<()> {
        self.check_writable()?;
        self.parsed = None;
        self.raw = None;
        Ok(())
    }

    /// Returns the value decoded from RFC 2047 encoded-words.
    #[must_use]
    pub fn decoded_value(&self) -> Option<String> {
        self.value().map(|value| decode_words(&value))
    }

    /// Returns the structured value, parsing the text when it is not cached.
    ///
    /// A parse done here is not cached; use [`Field::structured_mut`] for
    /// that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the text does not parse, and
    /// [`Error::InvalidOperation`] if a read-only field has no value.
    pub fn structured<T: StructuredValue>(&self) -> Result<Cow<'_, T>> {
        if let Some(value) = self.parsed.as_ref().and_then(T::from_slot) {
            return Ok(Cow::Borrowed(value));
        }
        self.parse_text().map(Cow::Owned)
    }

    /// Returns the structured value for editing, caching the parse.
    ///
    /// On a read-only field the value is itself read-only and the original
    /// text stays authoritative for writing.
    ///
    /// # Errors
    ///
    /// Same as [`Field::structured`].
    pub fn structured_mut<T: StructuredValue>(&mut self) -> Result<&mut T> {
        if !self.parsed.as_ref().is_some_and(|p| T::from_slot(p).is_some()) {
            let value: T = self.parse_text()?;
            if !self.read_only {
                self.raw = None;
            }
            self.parsed = Some(value.into_slot());
        }

        self.parsed
            .as_mut()
            .and_then(T::from_slot_mut)
            .ok_or_else(|| Error::invalid(format!("field '{}' holds another value type.", self.name)))
    }

    /// Replaces the value with a structured one, discarding the raw text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn set_structured<T: StructuredValue>(&mut self, value: T) -> Result<()> {
        self.check_writable()?;
        self.raw = None;
        self.parsed = Some(value.into_slot());
        Ok(())
    }

    fn parse_text<T: StructuredValue>(&self) -> Result<T> {
        match self.value() {
            Some(text) => T::parse_value(&text, self.read_only),
            None if self.read_only => Err(Error::invalid(format!("field '{}' has no value.", self.name))),
            None => Ok(T::default()),
        }
    }

    /// Returns the value as a single address.
    ///
    /// # Errors
    ///
    /// See [`Field::structured`].
    pub fn address(&self) -> Result<Cow<'_, Address>> {
        self.structured()
    }

    /// Returns the value as an address list.
    ///
    /// # Errors
    ///
    /// See [`Field::structured`].
    pub fn address_list(&self) -> Result<Cow<'_, AddressList>> {
        self.structured()
    }

    /// Returns the value as a content type.
    ///
    /// # Errors
    ///
    /// See [`Field::structured`].
    pub fn content_type(&self) -> Result<Cow<'_, ContentType>> {
        self.structured()
    }

    /// Returns the value as a content disposition.
    ///
    /// # Errors
    ///
    /// See [`Field::structured`].
    pub fn content_disposition(&self) -> Result<Cow<'_, ContentDisposition>> {
        self.structured()
    }

    /// Parses the value as an RFC 822 date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for a bad date and
    /// [`Error::InvalidOperation`] if there is no value.
    pub fn date_time(&self) -> Result<DateTime<Utc>> {
        let value = self
            .value()
            .ok_or_else(|| Error::invalid(format!("field '{}' has no value.", self.name)))?;
        parse_date(&value)
    }

    /// Stores a timestamp in RFC 1123 form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn set_date_time(&mut self, value: &DateTime<Utc>) -> Result<()> {
        self.set_value(format_date(value))
    }

    /// Writes the field; `Bcc` and empty fields produce nothing.
    ///
    /// # Errors
    ///
    /// Propagates writer errors.
    pub fn write_to<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        if self.is_named("Bcc") {
            return Ok(());
        }

        match (&self.parsed, self.read_only) {
            (Some(parsed), false) => writer.write_header_value(&self.name, parsed),
            _ => match self.raw.as_deref() {
                Some(raw) => writer.write_header_field(&self.name, raw),
                None => Ok(()),
            },
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to change '{}'.", self.name)));
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value().unwrap_or_default())
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
    use chrono::TimeZone;

    fn written(field: &Field) -> String {
        let mut writer = MimeWriter::new(Vec::new());
        field.write_to(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_raw_value() {
        let field = Field::new("Subject", "Hello");
        assert_eq!(field.name(), "Subject");
        assert!(field.is_named("subject"));
        assert_eq!(field.value().as_deref(), Some("Hello"));
        assert_eq!(field.to_string(), "Subject: Hello");
    }

    #[test]
    fn test_structured_parse_is_not_cached() {
        let field = Field::new("From", "John <john@example.com>");
        let address = field.address().unwrap();
        assert!(matches!(address, Cow::Owned(_)));
        assert_eq!(address.address(), "john@example.com");
        assert_eq!(field.raw_value(), Some("John <john@example.com>"));
    }

    #[test]
    fn test_structured_mut_caches_and_clears_raw() {
        let mut field = Field::new("To", "a@example.com");
        field
            .structured_mut::<AddressList>()
            .unwrap()
            .push(Address::new("b@example.com"))
            .unwrap();

        assert_eq!(field.raw_value(), None);
        assert!(matches!(field.address_list().unwrap(), Cow::Borrowed(_)));
        assert_eq!(field.value().as_deref(), Some("<a@example.com>, <b@example.com>"));
    }

    #[test]
    fn test_set_value_clears_structured() {
        let mut field = Field::empty("From");
        field.set_structured(Address::new("a@example.com")).unwrap();
        assert_eq!(field.raw_value(), None);
        assert_eq!(field.value().as_deref(), Some("<a@example.com>"));

        field.set_value("b@example.com").unwrap();
        assert_eq!(field.address().unwrap().address(), "b@example.com");
        assert!(matches!(field.address().unwrap(), Cow::Owned(_)));
    }

    #[test]
    fn test_empty_field() {
        let field = Field::empty("To");
        assert!(field.is_empty());
        assert!(field.address_list().unwrap().is_empty());
        assert_eq!(written(&field), "");
    }

    #[test]
    fn test_read_only() {
        let mut field = Field::read_only("From", "a@example.com");
        assert!(field.set_value("x").unwrap_err().is_invalid_operation());
        assert!(field.set_structured(Address::new("x@example.com")).is_err());
        assert!(field.clear_value().is_err());

        let address = field.structured_mut::<Address>().unwrap();
        assert!(address.is_read_only());
        assert!(address.set_address("x@example.com").is_err());

        assert_eq!(field.raw_value(), Some("a@example.com"));
        assert_eq!(written(&field), "From: a@example.com\r\n");
    }

    #[test]
    fn test_read_only_without_value() {
        let field = Field {
            read_only: true,
            ..Field::empty("From")
        };
        assert!(field.address().unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_malformed_structured() {
        let field = Field::new("From", "a@example.com <b@example.com>");
        assert!(field.address().unwrap_err().is_malformed());
    }

    #[test]
    fn test_write_structured() {
        let mut field = Field::empty("To");
        field
            .set_structured(AddressList::from_iter([
                Address::with_display_name("a@example.com", "A"),
                Address::new("b@example.com"),
            ]))
            .unwrap();
        assert_eq!(written(&field), "To: \"A\" <a@example.com>,\r\n\t<b@example.com>\r\n");
    }

    #[test]
    fn test_bcc_is_not_written() {
        let field = Field::new("Bcc", "hidden@example.com");
        assert_eq!(written(&field), "");
        let field = Field::new("BCC", "hidden@example.com");
        assert_eq!(written(&field), "");
    }

    #[test]
    fn test_date_time() {
        let mut field = Field::empty("Date");
        let date = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap();
        field.set_date_time(&date).unwrap();
        assert_eq!(field.value().as_deref(), Some("Thu, 29 Feb 2024 23:59:01 GMT"));
        assert_eq!(field.date_time().unwrap(), date);

        assert!(Field::empty("Date").date_time().unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_decoded_value() {
        let field = Field::new("Subject", "=?utf-8?Q?Caf=C3=A9?= time");
        assert_eq!(field.decoded_value().as_deref(), Some("Caf\u{e9} time"));
    }
}

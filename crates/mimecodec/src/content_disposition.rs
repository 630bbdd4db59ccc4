//! `Content-Disposition` header value.

use crate::encoding::decode_words;
use crate::error::Result;
use crate::parameter::{ParameterField, parameter_field_newtype};

/// `inline`
pub const INLINE: &str = "inline";
/// `attachment`
pub const ATTACHMENT: &str = "attachment";

/// `Content-Disposition` header value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentDisposition(ParameterField);

parameter_field_newtype!(ContentDisposition);

impl ContentDisposition {
    /// Creates a disposition such as [`INLINE`] or [`ATTACHMENT`].
    #[must_use]
    pub fn new(disposition: impl Into<String>) -> Self {
        Self(ParameterField::new(disposition))
    }

    /// Creates `attachment; filename="…"`.
    #[must_use]
    pub fn attachment(file_name: impl Into<String>) -> Self {
        let mut disposition = Self::new(ATTACHMENT);
        // A fresh field is writable.
        let _ = disposition.set_filename(file_name);
        disposition
    }

    /// Returns the disposition type.
    #[must_use]
    pub fn disposition(&self) -> &str {
        self.value()
    }

    /// Returns true for `attachment`, ignoring case.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.value().eq_ignore_ascii_case(ATTACHMENT)
    }

    /// Switches the type to `attachment`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOperation`] if the value is read-only.
    pub fn set_attachment(&mut self) -> Result<()> {
        self.set_value(ATTACHMENT)
    }

    /// Returns the `filename` parameter with encoded-words decoded.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameter("filename").map(decode_words)
    }

    /// Sets the `filename` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidOperation`] if the value is read-only.
    pub fn set_filename(&mut self, file_name: impl Into<String>) -> Result<()> {
        self.set_parameter("filename", file_name)
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

    #[test]
    fn test_attachment() {
        let cd = ContentDisposition::attachment("report.pdf");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename().as_deref(), Some("report.pdf"));
        assert_eq!(cd.to_string(), "attachment; filename=\"report.pdf\"");
    }

    #[test]
    fn test_parse() {
        let cd = ContentDisposition::parse("ATTACHMENT; FileName=\"a b.txt\"").unwrap();
        assert!(cd.is_attachment());
        assert_eq!(cd.filename().as_deref(), Some("a b.txt"));

        let cd = ContentDisposition::parse(INLINE).unwrap();
        assert!(!cd.is_attachment());
        assert_eq!(cd.filename(), None);

        assert!(ContentDisposition::parse("; filename=x").unwrap_err().is_malformed());
    }

    #[test]
    fn test_encoded_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"=?utf-8?Q?r=C3=A9sum=C3=A9.pdf?=\"")
            .unwrap();
        assert_eq!(cd.filename().as_deref(), Some("r\u{e9}sum\u{e9}.pdf"));
    }

    #[test]
    fn test_set_attachment() {
        let mut cd = ContentDisposition::new(INLINE);
        cd.set_attachment().unwrap();
        assert_eq!(cd.disposition(), ATTACHMENT);

        let mut frozen = ContentDisposition::parse_with(INLINE, true).unwrap();
        assert!(frozen.set_attachment().unwrap_err().is_invalid_operation());
        assert!(frozen.set_filename("x").is_err());
    }
}

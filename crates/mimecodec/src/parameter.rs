//! Header values of the form `value; name=param; ...`.
//!
//! Shared by `Content-Type` and `Content-Disposition`.

use std::fmt;
use std::io::Write;

use crate::address::detail;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::field_list::FieldList;
use crate::lexer::{Lexer, TokenKind};
use crate::writer::{MimeWriter, WriteValue};

/// A primary token followed by named parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterField {
    value: String,
    parameters: FieldList,
    read_only: bool,
}

impl ParameterField {
    /// Creates a field with a primary value and no parameters.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            parameters: FieldList::new(),
            read_only: false,
        }
    }

    /// Creates a field with a primary value and the given parameters.
    #[must_use]
    pub fn with_parameters(value: impl Into<String>, parameters: impl IntoIterator<Item = Field>) -> Self {
        Self {
            value: value.into(),
            parameters: parameters.into_iter().collect(),
            read_only: false,
        }
    }

    /// Parses `type (";" name "=" (atom | quoted-string))*`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] naming the whole input.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, false)
    }

    pub(crate) fn parse_with(text: &str, read_only: bool) -> Result<Self> {
        Self::parse_tokens(text, read_only).map_err(|e| {
            Error::malformed(format!("invalid mime field value '{text}', {}", detail(&e)))
        })
    }

    fn parse_tokens(text: &str, read_only: bool) -> Result<Self> {
        let mut lexer = Lexer::new(text);

        let value = lexer.next_significant()?;
        if !value.is(TokenKind::Atom) {
            return Err(Error::malformed("invalid type."));
        }

        let mut field = Self::new(value.text(text));

        let mut separator = lexer.next_significant()?;
        while separator.is(TokenKind::Semicolon) {
            let name = lexer.next_significant()?;
            if !name.is(TokenKind::Atom) {
                return Err(Error::malformed("invalid parameter name."));
            }
            if !lexer.next_significant()?.is(TokenKind::Assign) {
                return Err(Error::malformed("invalid parameter name."));
            }
            let param = lexer.next_significant()?;
            if !matches!(param.kind, TokenKind::Atom | TokenKind::QuotedString) {
                return Err(Error::malformed("invalid parameter value."));
            }

            let param = if read_only {
                Field::read_only(name.text(text), param.text(text))
            } else {
                Field::new(name.text(text), param.text(text))
            };
            field.parameters.push(param)?;

            separator = lexer.next_significant()?;
        }

        if !separator.is(TokenKind::End) {
            return Err(Error::malformed("extra data."));
        }

        if read_only {
            field.set_read_only();
        }
        Ok(field)
    }

    /// Returns the primary value, e.g. `text/plain` or `attachment`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replaces the primary value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn set_value(&mut self, value: impl Into<String>) -> Result<()> {
        self.check_writable()?;
        self.value = value.into();
        Ok(())
    }

    /// Returns the parameters.
    #[must_use]
    pub const fn parameters(&self) -> &FieldList {
        &self.parameters
    }

    /// Returns the parameters for editing. A read-only field hands out a
    /// read-only list.
    pub fn parameters_mut(&mut self) -> &mut FieldList {
        &mut self.parameters
    }

    /// Returns a parameter value by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Field::raw_value)
    }

    /// Sets a parameter, replacing the first one with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the field is read-only.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.check_writable()?;
        self.parameters.set(name, value)
    }

    /// Returns true if the field can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the field and its parameter list.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
        self.parameters.set_collection_read_only();
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to change '{}'.", self.value)));
        }
        Ok(())
    }
}

impl WriteValue for ParameterField {
    fn has_data(&self) -> bool {
        !self.value.is_empty() || !self.parameters.is_empty()
    }

    fn write_value<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        writer.write_field_value(&self.value)?;
        for param in &self.parameters {
            writer.write_parameter(param.name(), param.raw_value().unwrap_or_default())?;
        }
        Ok(())
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        for param in &self.parameters {
            let value = param.raw_value().unwrap_or_default();
            write!(f, "; {}=\"", param.name())?;
            for c in value.chars() {
                if matches!(c, '"' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("\"")?;
        }
        Ok(())
    }
}

/// Implements the shared plumbing of a [`ParameterField`] newtype.
macro_rules! parameter_field_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Parses the header value.
            ///
            /// # Errors
            ///
            /// Returns [`crate::Error::MalformedInput`] naming the whole input.
            pub fn parse(text: &str) -> $crate::Result<Self> {
                Self::parse_with(text, false)
            }

            pub(crate) fn parse_with(text: &str, read_only: bool) -> $crate::Result<Self> {
                $crate::parameter::ParameterField::parse_with(text, read_only).map(Self)
            }
        }

        impl std::ops::Deref for $ty {
            type Target = $crate::parameter::ParameterField;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl $crate::writer::WriteValue for $ty {
            fn has_data(&self) -> bool {
                self.0.has_data()
            }

            fn write_value<W: std::io::Write>(
                &self,
                writer: &mut $crate::writer::MimeWriter<W>,
            ) -> $crate::Result<()> {
                self.0.write_value(writer)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use parameter_field_newtype;

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
    fn test_with_parameters() {
        let mut field =
            ParameterField::with_parameters("text/plain", [Field::new("charset", "utf-8")]);
        assert_eq!(field.parameter("CHARSET"), Some("utf-8"));
        field.set_parameter("format", "flowed").unwrap();
        assert_eq!(field.to_string(), "text/plain; charset=\"utf-8\"; format=\"flowed\"");
    }

    #[test]
    fn test_parse_type_only() {
        let field = ParameterField::parse("text/plain").unwrap();
        assert_eq!(field.value(), "text/plain");
        assert!(field.parameters().is_empty());
    }

    #[test]
    fn test_parse_parameters() {
        let field =
            ParameterField::parse(" multipart/mixed; boundary=\"B1 \\\"x\\\"\" ;\r\n\tCharSet=utf-8 (comment)").unwrap();
        assert_eq!(field.value(), "multipart/mixed");
        assert_eq!(field.parameter("boundary"), Some("B1 \"x\""));
        assert_eq!(field.parameter("charset"), Some("utf-8"));
        assert_eq!(field.parameters().iter().nth(1).unwrap().name(), "CharSet");
    }

    #[test]
    fn test_parse_errors() {
        let err = ParameterField::parse("\"text/plain\"").unwrap_err();
        assert!(err.to_string().contains("invalid type"));
        assert!(err.to_string().contains("invalid mime field value '\"text/plain\"'"));

        let err = ParameterField::parse("text/plain; =x").unwrap_err();
        assert!(err.to_string().contains("invalid parameter name"));

        let err = ParameterField::parse("text/plain; charset").unwrap_err();
        assert!(err.to_string().contains("invalid parameter name"));

        let err = ParameterField::parse("text/plain; charset=;").unwrap_err();
        assert!(err.to_string().contains("invalid parameter value"));

        let err = ParameterField::parse("text/plain charset=x").unwrap_err();
        assert!(err.to_string().contains("extra data"));

        assert!(ParameterField::parse("text/plain; name=\"open").unwrap_err().is_malformed());
    }

    #[test]
    fn test_set_parameter() {
        let mut field = ParameterField::new("attachment");
        field.set_parameter("filename", "a.txt").unwrap();
        field.set_parameter("FILENAME", "b.txt").unwrap();
        assert_eq!(field.parameters().len(), 1);
        assert_eq!(field.parameter("filename"), Some("b.txt"));
    }

    #[test]
    fn test_read_only() {
        let mut field = ParameterField::parse_with("text/plain; charset=us-ascii", true).unwrap();
        assert!(field.set_value("text/html").unwrap_err().is_invalid_operation());
        assert!(field.set_parameter("charset", "utf-8").is_err());
        assert!(field.parameters_mut().push(Field::new("x", "y")).is_err());
        assert!(field.parameters_mut().get_mut("charset").unwrap().set_value("x").is_err());
        assert_eq!(field.to_string(), "text/plain; charset=\"us-ascii\"");
    }

    #[test]
    fn test_display_escapes() {
        let mut field = ParameterField::new("attachment");
        field.set_parameter("filename", "a \"b\".txt").unwrap();
        assert_eq!(field.to_string(), "attachment; filename=\"a \\\"b\\\".txt\"");
        assert_eq!(ParameterField::parse(&field.to_string()).unwrap(), field);
    }

    #[test]
    fn test_write_value() {
        let field = ParameterField::parse("text/plain; charset=us-ascii; format=flowed").unwrap();
        let mut writer = MimeWriter::new(Vec::new());
        writer.write_header_value("Content-Type", &field).unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "Content-Type: text/plain; charset=\"us-ascii\"; format=\"flowed\"\r\n"
        );
    }
}

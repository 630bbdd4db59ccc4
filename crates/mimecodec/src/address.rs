//! Mailbox addresses.
//!
//! Accepted forms:
//!
//! ```text
//! [phrase] "<" addr-spec ">" [comment]
//! addr-spec [comment]
//! phrase
//! ```

use std::fmt;
use std::io::Write;

use crate::encoding::decode_words;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::writer::{MimeWriter, WriteValue};

/// Mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    address: String,
    display_name: Option<String>,
    read_only: bool,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            read_only: false,
        }
    }

    /// Creates an address with a display name.
    ///
    /// An empty display name is treated as none.
    #[must_use]
    pub fn with_display_name(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            address: address.into(),
            display_name: (!display_name.is_empty()).then_some(display_name),
            read_only: false,
        }
    }

    /// Parses a single address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `text` is not exactly one address.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, false)
    }

    pub(crate) fn parse_with(text: &str, read_only: bool) -> Result<Self> {
        let mut lexer = Lexer::new(text);
        let address = Self::parse_next(&mut lexer, read_only)
            .and_then(|address| {
                if lexer.is_eof() {
                    Ok(address)
                } else {
                    Err(Error::malformed("data after address."))
                }
            })
            .map_err(|e| Error::malformed(format!("invalid address '{text}', {}", detail(&e))))?;
        Ok(address)
    }

    /// Parses one address at the lexer position.
    ///
    /// On return the lexer is positioned just before the first token that is
    /// not part of the address (whitespace and end of input excepted), so
    /// list parsing can continue with a separator.
    pub(crate) fn parse_next(lexer: &mut Lexer<'_>, read_only: bool) -> Result<Self> {
        let input = lexer.input();
        let mut address: Option<Token> = None;
        let mut display: Option<Token> = None;

        let mut cur = lexer.next_skip_whitespace()?;

        match cur.kind {
            TokenKind::Atom => {
                let first = cur;
                cur = lexer.next_token()?;

                if cur.is(TokenKind::At) {
                    let mut spec = Some(first);
                    Token::absorb_address(&mut spec, cur);

                    cur = lexer.next_token()?;
                    if !cur.is(TokenKind::Atom) {
                        return Err(Error::malformed("invalid address."));
                    }
                    Token::absorb_address(&mut spec, cur);
                    address = spec;

                    cur = lexer.next_skip_whitespace()?;
                } else {
                    let mut phrase = Some(first);
                    while matches!(cur.kind, TokenKind::Atom | TokenKind::Whitespace) {
                        Token::absorb_phrase(&mut phrase, cur);
                        cur = lexer.next_token()?;
                    }
                    if let Some(phrase) = phrase.as_mut() {
                        phrase.trim_trailing_whitespace(input);
                    }
                    display = phrase;
                }
            }
            TokenKind::QuotedString => {
                display = Some(cur);
                cur = lexer.next_skip_whitespace()?;
            }
            _ => {}
        }

        if cur.is(TokenKind::AngleOpen) {
            if address.is_some() {
                return Err(Error::malformed("double address."));
            }

            let mut spec = None;
            loop {
                cur = lexer.next_token()?;
                if !matches!(cur.kind, TokenKind::Atom | TokenKind::At) {
                    break;
                }
                Token::absorb_address(&mut spec, cur);
            }

            if cur.is(TokenKind::Whitespace) {
                cur = lexer.next_token()?;
            }
            if !cur.is(TokenKind::AngleClose) {
                return Err(Error::malformed("missing '>'."));
            }
            address = spec;

            cur = lexer.next_skip_whitespace()?;
            if cur.is(TokenKind::AngleOpen) {
                return Err(Error::malformed("double address."));
            }
        }

        if cur.is(TokenKind::Whitespace) {
            cur = lexer.next_token()?;
        }

        if cur.is(TokenKind::Comment) {
            if display.is_none() {
                display = Some(cur);
            }
            cur = lexer.next_skip_whitespace()?;
        }

        // A bare phrase is the address itself, e.g. `postmaster`.
        if address.is_none() && display.is_some_and(|t| matches!(t.kind, TokenKind::Atom | TokenKind::Phrase)) {
            address = display.take();
        }

        let Some(address) = address else {
            return Err(Error::malformed("missing address."));
        };

        if !matches!(cur.kind, TokenKind::End | TokenKind::Whitespace) {
            lexer.set_position(cur.begin);
        }

        let mut parsed = Self::with_display_name(
            address.text(input),
            display.map(|t| decode_words(&t.text(input))).unwrap_or_default(),
        );
        parsed.read_only = read_only;
        Ok(parsed)
    }

    /// Returns the mailbox address, e.g. `john@example.com`.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Replaces the mailbox address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the address is read-only.
    pub fn set_address(&mut self, address: impl Into<String>) -> Result<()> {
        self.check_writable("Address")?;
        self.address = address.into();
        Ok(())
    }

    /// Replaces the display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the address is read-only.
    pub fn set_display_name(&mut self, display_name: Option<String>) -> Result<()> {
        self.check_writable("DisplayName")?;
        self.display_name = display_name.filter(|name| !name.is_empty());
        Ok(())
    }

    /// Returns true if the address can no longer be changed.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the address.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::invalid(format!("not allowed to change {what}.")));
        }
        Ok(())
    }
}

impl WriteValue for Address {
    fn has_data(&self) -> bool {
        !self.address.is_empty()
    }

    fn write_value<W: Write>(&self, writer: &mut MimeWriter<W>) -> Result<()> {
        writer.write_address(&self.address, self.display_name.as_deref())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            let escaped = name.replace('"', "\\\"");
            write!(f, "\"{escaped}\" ")?;
        }
        write!(f, "<{}>", self.address)
    }
}

/// Strips the error prefix so nested failures read as one sentence.
pub(crate) fn detail(err: &Error) -> String {
    match err {
        Error::MalformedInput(message) | Error::InvalidOperation(message) => message.clone(),
        Error::Io(e) => e.to_string(),
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
    fn test_parse_display_name_and_angle() {
        let address = Address::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(address.display_name(), Some("John Doe"));
        assert_eq!(address.address(), "john@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let address = Address::parse("jane@example.com").unwrap();
        assert_eq!(address.display_name(), None);
        assert_eq!(address.address(), "jane@example.com");
    }

    #[test]
    fn test_parse_quoted_display_name() {
        let address = Address::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(address.display_name(), Some("Doe, John"));
        assert_eq!(address.address(), "john@example.com");
    }

    #[test]
    fn test_parse_encoded_display_name() {
        let address = Address::parse("=?utf-8?Q?Jos=C3=A9?= <jose@example.com>").unwrap();
        assert_eq!(address.display_name(), Some("Jos\u{e9}"));
        assert_eq!(address.address(), "jose@example.com");
    }

    #[test]
    fn test_parse_angle_only() {
        let address = Address::parse("<john@example.com>").unwrap();
        assert_eq!(address.display_name(), None);
        assert_eq!(address.address(), "john@example.com");
    }

    #[test]
    fn test_parse_trailing_comment_is_display_name() {
        let address = Address::parse("john@example.com (John Doe)").unwrap();
        assert_eq!(address.display_name(), Some("John Doe"));
        assert_eq!(address.address(), "john@example.com");
    }

    #[test]
    fn test_parse_comment_does_not_override_name() {
        let address = Address::parse("John <john@example.com> (work)").unwrap();
        assert_eq!(address.display_name(), Some("John"));
    }

    #[test]
    fn test_parse_bare_phrase() {
        let address = Address::parse("postmaster").unwrap();
        assert_eq!(address.address(), "postmaster");
        assert_eq!(address.display_name(), None);
    }

    #[test]
    fn test_parse_double_address() {
        let err = Address::parse("John <a@example.com> <b@example.com>").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("double address"));

        let err = Address::parse("a@example.com <b@example.com>").unwrap_err();
        assert!(err.to_string().contains("double address"));
    }

    #[test]
    fn test_parse_missing_close() {
        let err = Address::parse("John <john@example.com").unwrap_err();
        assert!(err.to_string().contains("missing '>'"));
    }

    #[test]
    fn test_parse_missing_address() {
        let err = Address::parse("\"John\"").unwrap_err();
        assert!(err.to_string().contains("missing address"));
        assert!(Address::parse("").unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_data_after_address() {
        let err = Address::parse("a@example.com, b@example.com").unwrap_err();
        assert!(err.to_string().contains("data after address"));
        assert!(err.to_string().contains("a@example.com, b@example.com"));
    }

    #[test]
    fn test_parse_next_rewinds_before_separator() {
        let mut lexer = Lexer::new("a@example.com , b@example.com");
        let address = Address::parse_next(&mut lexer, false).unwrap();
        assert_eq!(address.address(), "a@example.com");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Comma);
    }

    #[test]
    fn test_read_only() {
        let mut address = Address::parse_with("john@example.com", true).unwrap();
        assert!(address.is_read_only());
        assert!(address.set_address("x@example.com").unwrap_err().is_invalid_operation());
        assert!(address.set_display_name(Some("X".into())).is_err());
        assert_eq!(address.address(), "john@example.com");
    }

    #[test]
    fn test_mutation() {
        let mut address = Address::new("john@example.com");
        address.set_display_name(Some("John".into())).unwrap();
        address.set_address("jd@example.com").unwrap();
        assert_eq!(address.to_string(), "\"John\" <jd@example.com>");

        address.set_display_name(Some(String::new())).unwrap();
        assert_eq!(address.display_name(), None);
    }

    #[test]
    fn test_display_escapes_quotes() {
        let address = Address::with_display_name("a@example.com", "The \"A\" Team");
        assert_eq!(address.to_string(), "\"The \\\"A\\\" Team\" <a@example.com>");
    }

    #[test]
    fn test_display_roundtrip() {
        let address = Address::with_display_name("a@example.com", "Doe, \"J\"");
        let reparsed = Address::parse(&address.to_string()).unwrap();
        assert_eq!(reparsed.display_name(), Some("Doe, \"J\""));
        assert_eq!(reparsed.address(), "a@example.com");
    }
}

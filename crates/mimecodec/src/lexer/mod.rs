//! Lexer for structured header values.
//!
//! Breaks a header value (address lists, content types, dispositions) into
//! RFC 822 tokens. The lexer never looks behind its cursor; callers that need
//! to back out of a token rewind with [`Lexer::set_position`].

mod token;

pub use token::{Token, TokenKind};

use crate::{Error, Result};

/// Header-value lexer state.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the input being tokenized.
    #[must_use]
    pub const fn input(&self) -> &'a str {
        self.input
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor, e.g. to put back a token that was read too far.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Reads the next token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for an unterminated quoted string,
    /// comment or domain literal, or a stray `)` / `]`.
    pub fn next_token(&mut self) -> Result<Token> {
        scan(self.input, &mut self.pos)
    }

    /// Reads the next token that is neither whitespace nor a comment.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Lexer::next_token`].
    pub fn next_significant(&mut self) -> Result<Token> {
        loop {
            let token = self.next_token()?;
            if !matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment) {
                return Ok(token);
            }
        }
    }

    /// Reads the next token, skipping leading whitespace.
    ///
    /// Several whitespace tokens in a row only occur around a CR or LF.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Lexer::next_token`].
    pub fn next_skip_whitespace(&mut self) -> Result<Token> {
        loop {
            let token = self.next_token()?;
            if !token.is(TokenKind::Whitespace) {
                return Ok(token);
            }
        }
    }
}

/// Scans one token from `text` starting at `cursor` and advances the cursor
/// past it.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for an unterminated quoted string,
/// comment or domain literal, or a stray `)` / `]`.
pub fn scan(text: &str, cursor: &mut usize) -> Result<Token> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let begin = *cursor;

    let Some(&first) = bytes.get(begin) else {
        return Ok(Token::new(TokenKind::End, len, len));
    };

    let (kind, end) = match first {
        b' ' | b'\t' => (TokenKind::Whitespace, skip_linear_whitespace(bytes, begin)),
        // CR/LF never join a whitespace run, but one standing alone is
        // consumed so the cursor always moves.
        b'\r' | b'\n' => (TokenKind::Whitespace, skip_linear_whitespace(bytes, begin + 1)),
        b'<' => (TokenKind::AngleOpen, begin + 1),
        b'>' => (TokenKind::AngleClose, begin + 1),
        b'@' => (TokenKind::At, begin + 1),
        b',' => (TokenKind::Comma, begin + 1),
        b';' => (TokenKind::Semicolon, begin + 1),
        b':' => (TokenKind::Colon, begin + 1),
        b'=' => match scan_encoded_word(bytes, begin) {
            Some(end) => (TokenKind::Atom, end),
            None => (TokenKind::Assign, begin + 1),
        },
        b'"' => (
            TokenKind::QuotedString,
            scan_delimited(text, begin, b'"', "string")?,
        ),
        b'(' => (
            TokenKind::Comment,
            scan_delimited(text, begin, b')', "comment")?,
        ),
        b'[' => (
            TokenKind::DomainLiteral,
            scan_delimited(text, begin, b']', "domain-literal")?,
        ),
        b')' | b']' => {
            return Err(Error::malformed(format!("invalid character in '{text}'")));
        }
        _ => {
            let mut end = begin;
            while end < len && !is_special(bytes[end]) {
                if bytes[end] == b'\\' {
                    end += 1;
                }
                end += 1;
            }
            (TokenKind::Atom, end.min(len))
        }
    };

    *cursor = end;
    Ok(Token::new(kind, begin, end))
}

/// Scans from an opening delimiter at `begin` to the matching `close`,
/// honoring backslash escapes. Returns the offset past the terminator.
fn scan_delimited(text: &str, begin: usize, close: u8, what: &str) -> Result<usize> {
    let bytes = text.as_bytes();
    let mut end = begin + 1;

    loop {
        match bytes.get(end) {
            None => return Err(Error::malformed(format!("unterminated {what} in '{text}'"))),
            Some(&c) if c == close => return Ok(end + 1),
            Some(b'\\') => end += 2,
            Some(_) => end += 1,
        }
    }
}

/// Returns the offset past an RFC 2047 encoded-word (`=?cs?X?data?=`)
/// starting at `begin`, or `None` if there is none.
fn scan_encoded_word(bytes: &[u8], begin: usize) -> Option<usize> {
    if bytes.get(begin + 1) != Some(&b'?') {
        return None;
    }

    let mut marks = 0;
    let mut pos = begin + 2;
    while let Some(&b) = bytes.get(pos) {
        match b {
            b'?' => {
                marks += 1;
                if marks >= 3 && bytes.get(pos + 1) == Some(&b'=') {
                    return Some(pos + 2);
                }
            }
            b' ' | b'\t' | b'\r' | b'\n' => return None,
            _ => {}
        }
        pos += 1;
    }
    None
}

fn skip_linear_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while matches!(bytes.get(pos), Some(b' ' | b'\t')) {
        pos += 1;
    }
    pos
}

/// Returns true if the byte ends an atom.
#[must_use]
pub const fn is_special(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t'
            | b'\r'
            | b'\n'
            | b'('
            | b')'
            | b'<'
            | b'>'
            | b'['
            | b']'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'='
            | b'"'
    )
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

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            out.push(token.kind);
            if token.is(TokenKind::End) {
                return out;
            }
        }
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("<a@b>,;:="),
            vec![
                TokenKind::AngleOpen,
                TokenKind::Atom,
                TokenKind::At,
                TokenKind::Atom,
                TokenKind::AngleClose,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::Assign,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_atom_spans_dots_and_slashes() {
        let mut lexer = Lexer::new("text/plain x.y-z");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Atom);
        assert_eq!(token.slice(lexer.input()), "text/plain");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Whitespace);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.slice(lexer.input()), "x.y-z");
    }

    #[test]
    fn test_atom_escape() {
        let input = r"a\;b;c";
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.slice(input), r"a\;b");
        assert_eq!(token.text(input), "a;b");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_whitespace_run() {
        let mut lexer = Lexer::new(" \t x");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Whitespace);
        assert_eq!(token.end, 3);
    }

    #[test]
    fn test_whitespace_stops_at_crlf() {
        let mut lexer = Lexer::new("  \r\n x");
        let token = lexer.next_token().unwrap();
        assert_eq!((token.begin, token.end), (0, 2));
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Whitespace);
        assert_eq!((token.begin, token.end), (2, 3));
    }

    #[test]
    fn test_quoted_string() {
        let input = r#""John \"JD\" Doe" <x>"#;
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::QuotedString);
        assert_eq!(token.text(input), r#"John "JD" Doe"#);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"abc");
        let err = lexer.next_token().unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_unterminated_string_trailing_escape() {
        let mut lexer = Lexer::new("\"abc\\");
        assert!(lexer.next_token().unwrap_err().is_malformed());
    }

    #[test]
    fn test_comment() {
        let input = "(a comment) x";
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Comment);
        assert_eq!(token.text(input), "a comment");
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(Lexer::new("(abc").next_token().unwrap_err().is_malformed());
    }

    #[test]
    fn test_domain_literal_terminates_on_closing_bracket() {
        // The literal ends at `]`, not at `)`.
        let input = "[192.168.0.1] x";
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::DomainLiteral);
        assert_eq!(token.slice(input), "[192.168.0.1]");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Whitespace);
    }

    #[test]
    fn test_stray_close_is_error() {
        assert!(Lexer::new(")").next_token().unwrap_err().is_malformed());
        assert!(Lexer::new("]").next_token().unwrap_err().is_malformed());
    }

    #[test]
    fn test_next_significant_skips_comments() {
        let mut lexer = Lexer::new("  (x) ; y");
        assert_eq!(lexer.next_significant().unwrap().kind, TokenKind::Semicolon);
        assert_eq!(lexer.next_significant().unwrap().kind, TokenKind::Atom);
        assert_eq!(lexer.next_significant().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn test_scan_advances_cursor() {
        let mut cursor = 0;
        let token = scan("ab cd", &mut cursor).unwrap();
        assert_eq!(token.kind, TokenKind::Atom);
        assert_eq!(cursor, 2);
    }

    #[test]
    fn test_absorb_phrase() {
        let input = "John  Doe  <";
        let mut lexer = Lexer::new(input);
        let mut phrase = None;
        loop {
            let token = lexer.next_token().unwrap();
            if !matches!(token.kind, TokenKind::Atom | TokenKind::Whitespace) {
                break;
            }
            Token::absorb_phrase(&mut phrase, token);
        }
        let mut phrase = phrase.unwrap();
        assert_eq!(phrase.kind, TokenKind::Phrase);
        phrase.trim_trailing_whitespace(input);
        assert_eq!(phrase.text(input), "John  Doe");
    }

    #[test]
    fn test_absorb_first_keeps_kind() {
        let mut acc = None;
        Token::absorb_address(&mut acc, Token::new(TokenKind::Atom, 0, 4));
        assert_eq!(acc.unwrap().kind, TokenKind::Atom);
        Token::absorb_address(&mut acc, Token::new(TokenKind::At, 4, 5));
        assert_eq!(acc.unwrap().kind, TokenKind::Address);
        assert_eq!(acc.unwrap().end, 5);
    }

    #[test]
    fn test_is_special() {
        assert!(is_special(b'<'));
        assert!(is_special(b'"'));
        assert!(!is_special(b'.'));
        assert!(!is_special(b'/'));
        assert!(!is_special(b'\\'));
    }

    #[test]
    fn test_encoded_word_is_one_atom() {
        let input = "=?utf-8?Q?Jos=C3=A9?= <j@x>";
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Atom);
        assert_eq!(token.slice(input), "=?utf-8?Q?Jos=C3=A9?=");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Whitespace);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::AngleOpen);

        assert_eq!(kinds("=?x"), vec![TokenKind::Assign, TokenKind::Atom, TokenKind::End]);
    }
}

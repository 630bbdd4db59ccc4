//! Header-value token types.

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input.
    End,
    /// Run of linear whitespace.
    Whitespace,
    /// Atom (run of non-special characters).
    Atom,
    /// Quoted string, including the surrounding quotes.
    QuotedString,
    /// Parenthesized comment, including the parentheses.
    Comment,
    /// Several atoms and whitespace merged into a display phrase.
    Phrase,
    /// Atoms and `@` merged into a mailbox address.
    Address,
    /// `<`
    AngleOpen,
    /// `>`
    AngleClose,
    /// Bracketed domain literal, including the brackets.
    DomainLiteral,
    /// `@`
    At,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `=`
    Assign,
}

/// A token is a classified span over the original input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub begin: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Token {
    /// Creates a token.
    #[must_use]
    pub const fn new(kind: TokenKind, begin: usize, end: usize) -> Self {
        Self { kind, begin, end }
    }

    /// Returns true if this token kind is `kind`.
    #[must_use]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Returns the raw span of the token in `input`.
    #[must_use]
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.begin..self.end).unwrap_or_default()
    }

    /// Returns the token text with quote/comment delimiters stripped and
    /// backslash escapes resolved.
    #[must_use]
    pub fn text(&self, input: &str) -> String {
        let raw = self.slice(input);
        let inner = match self.kind {
            TokenKind::QuotedString | TokenKind::Comment if raw.len() >= 2 => {
                &raw[1..raw.len() - 1]
            }
            _ => raw,
        };

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Shrinks the span so it does not end in spaces or tabs.
    pub fn trim_trailing_whitespace(&mut self, input: &str) {
        let bytes = input.as_bytes();
        while self.end > self.begin && matches!(bytes.get(self.end - 1), Some(b' ' | b'\t')) {
            self.end -= 1;
        }
    }

    /// Widens `acc` to cover `next`, promoting it to a [`TokenKind::Phrase`].
    ///
    /// An empty accumulator simply takes over `next`.
    pub fn absorb_phrase(acc: &mut Option<Self>, next: Self) {
        Self::absorb(acc, next, TokenKind::Phrase);
    }

    /// Widens `acc` to cover `next`, promoting it to a [`TokenKind::Address`].
    ///
    /// An empty accumulator simply takes over `next`.
    pub fn absorb_address(acc: &mut Option<Self>, next: Self) {
        Self::absorb(acc, next, TokenKind::Address);
    }

    fn absorb(acc: &mut Option<Self>, next: Self, kind: TokenKind) {
        match acc {
            Some(token) => {
                token.end = next.end;
                token.kind = kind;
            }
            None => *acc = Some(next),
        }
    }
}

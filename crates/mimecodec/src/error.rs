//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a structurally valid MIME message.
    #[error("Mail message corrupt: {0}")]
    MalformedInput(String),

    /// The operation is not allowed on this value, e.g. mutating a
    /// read-only field or writing with an encoding that has no encoder.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Returns true if this is a [`Error::MalformedInput`] error.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedInput(_))
    }

    /// Returns true if this is an [`Error::InvalidOperation`] error.
    #[must_use]
    pub const fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
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
    fn test_malformed_display() {
        let err = Error::malformed("line too long");
        assert_eq!(err.to_string(), "Mail message corrupt: line too long");
        assert!(err.is_malformed());
        assert!(!err.is_invalid_operation());
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::other("boom").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
